use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT_MS: i64 = 5000;
const WAL_AUTOCHECKPOINT_PAGES: i64 = 100;

/// Apply connection PRAGMAs and create every table and index if missing.
/// Safe to call on every open.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;",
    )?;
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)?;
    conn.pragma_update(None, "wal_autocheckpoint", WAL_AUTOCHECKPOINT_PAGES)?;

    // In-memory databases have no WAL to truncate.
    match conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);") {
        Ok(()) => tracing::info!("truncated WAL on open"),
        Err(e) => tracing::debug!("WAL checkpoint skipped: {e}"),
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            gender      TEXT,
            birth_year  INTEGER,
            school_id   INTEGER,
            department  TEXT,
            grade       INTEGER
        );

        CREATE TABLE IF NOT EXISTS survey_answers (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            question_id      TEXT,
            question_type    INTEGER NOT NULL,
            option_order_no  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS quests (
            id             TEXT PRIMARY KEY,
            type           TEXT NOT NULL,
            title          TEXT NOT NULL DEFAULT '',
            category       TEXT NOT NULL,
            verify_method  TEXT NOT NULL,
            reward_exp     INTEGER NOT NULL DEFAULT 0,
            target_count   INTEGER NOT NULL DEFAULT 1,
            period_scope   TEXT NOT NULL DEFAULT 'ANY',
            active         INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS quest_recommendations (
            id                   TEXT PRIMARY KEY,
            user_id              TEXT NOT NULL,
            quest_id             TEXT NOT NULL,
            recommendation_date  TEXT NOT NULL,
            is_click             INTEGER NOT NULL DEFAULT 0,
            is_cleared           INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, quest_id, recommendation_date)
        );

        CREATE INDEX IF NOT EXISTS idx_survey_user ON survey_answers(user_id);
        CREATE INDEX IF NOT EXISTS idx_quest_catalog ON quests(active, type);
        CREATE INDEX IF NOT EXISTS idx_rec_user ON quest_recommendations(user_id);
        CREATE INDEX IF NOT EXISTS idx_rec_date ON quest_recommendations(recommendation_date);
        CREATE INDEX IF NOT EXISTS idx_rec_engaged ON quest_recommendations(is_click, is_cleared);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Stored schema version, `None` before the first `initialize`.
pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()))
}

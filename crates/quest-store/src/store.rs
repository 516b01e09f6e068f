use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use quest_core::{
    Date, Interaction, InteractionCounts, Quest, RecommendationRecord, SurveyAnswer, UserProfile,
};

use crate::error::{Result, StoreError};
use crate::schema;

const QUEST_COLUMNS: &str = "id, type, title, category, verify_method, reward_exp, target_count, \
                             period_scope, active";

const RECORD_COLUMNS: &str = "id, user_id, quest_id, recommendation_date, is_click, is_cleared";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        Ok(stmt.query_row([key], |row| row.get(0)).optional()?)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Users and survey ---

    pub fn upsert_user(&self, user: &UserProfile) -> Result<()> {
        upsert_user_on(&self.conn, user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, gender, birth_year, school_id, department, grade FROM users WHERE id = ?1",
        )?;
        Ok(stmt.query_row([user_id], user_from_row).optional()?)
    }

    pub fn all_users(&self) -> Result<Vec<UserProfile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, gender, birth_year, school_id, department, grade FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(users)
    }

    /// Replace every answer the user has given. Answers for other users in
    /// `answers` are rejected.
    pub fn replace_survey_answers(&self, user_id: &str, answers: &[SurveyAnswer]) -> Result<()> {
        if let Some(stray) = answers.iter().find(|a| a.user_id != user_id) {
            return Err(StoreError::InvalidData(format!(
                "answer for {} passed while replacing answers of {user_id}",
                stray.user_id
            )));
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM survey_answers WHERE user_id = ?1", [user_id])?;
        for answer in answers {
            insert_answer_on(&tx, answer)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_survey_answers(&self, user_id: &str) -> Result<Vec<SurveyAnswer>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, question_id, question_type, option_order_no
             FROM survey_answers WHERE user_id = ?1 ORDER BY question_type, id",
        )?;
        let answers = stmt
            .query_map([user_id], answer_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(answers)
    }

    pub fn all_survey_answers(&self) -> Result<Vec<SurveyAnswer>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, question_id, question_type, option_order_no
             FROM survey_answers ORDER BY user_id, question_type, id",
        )?;
        let answers = stmt
            .query_map([], answer_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(answers)
    }

    // --- Quest catalog ---

    pub fn upsert_quest(&self, quest: &Quest) -> Result<()> {
        upsert_quest_on(&self.conn, quest)
    }

    /// Active LIFE/GROWTH quests in insertion order. The type is matched
    /// case-insensitively, the same way rows are parsed.
    pub fn get_eligible_quests(&self) -> Result<Vec<Quest>> {
        let sql = format!(
            "SELECT {QUEST_COLUMNS} FROM quests
             WHERE active = 1 AND UPPER(TRIM(type)) IN ('LIFE', 'GROWTH')
             ORDER BY rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let quests = stmt
            .query_map([], quest_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(quests)
    }

    pub fn get_quests_by_ids(&self, ids: &[String]) -> Result<Vec<Quest>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {QUEST_COLUMNS} FROM quests WHERE id IN ({placeholders}) ORDER BY rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let quests = stmt
            .query_map(params_from_iter(ids.iter()), quest_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(quests)
    }

    pub fn all_quests(&self) -> Result<Vec<Quest>> {
        let sql = format!("SELECT {QUEST_COLUMNS} FROM quests ORDER BY rowid");
        let mut stmt = self.conn.prepare(&sql)?;
        let quests = stmt
            .query_map([], quest_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(quests)
    }

    // --- Recommendation log ---

    /// Insert one row per quest for `date`, skipping existing
    /// (user, quest, date) triples. Returns the number of rows inserted.
    pub fn record_recommendations(
        &self,
        user_id: &str,
        quest_ids: &[String],
        date: Date,
    ) -> Result<usize> {
        let date = date.to_string();
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO quest_recommendations
                 (id, user_id, quest_id, recommendation_date, is_click, is_cleared)
                 VALUES (?1, ?2, ?3, ?4, 0, 0)",
            )?;
            for quest_id in quest_ids {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    quest_id,
                    date
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Insert a full log row (flags included), as the click/clear tracking
    /// services would. Returns false if the triple already exists.
    pub fn insert_interaction(&self, record: &RecommendationRecord) -> Result<bool> {
        insert_record_on(&self.conn, record)
    }

    /// Flag the (user, quest, date) row as clicked. Returns false if no such
    /// row exists.
    pub fn mark_clicked(&self, user_id: &str, quest_id: &str, date: Date) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE quest_recommendations SET is_click = 1
             WHERE user_id = ?1 AND quest_id = ?2 AND recommendation_date = ?3",
            params![user_id, quest_id, date.to_string()],
        )?;
        Ok(rows > 0)
    }

    /// Flag the (user, quest, date) row as cleared.
    pub fn mark_cleared(&self, user_id: &str, quest_id: &str, date: Date) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE quest_recommendations SET is_cleared = 1
             WHERE user_id = ?1 AND quest_id = ?2 AND recommendation_date = ?3",
            params![user_id, quest_id, date.to_string()],
        )?;
        Ok(rows > 0)
    }

    pub fn get_recommendations(&self, user_id: &str) -> Result<Vec<RecommendationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM quest_recommendations
             WHERE user_id = ?1 ORDER BY recommendation_date, rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([user_id], record_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(records)
    }

    pub fn all_recommendations(&self) -> Result<Vec<RecommendationRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM quest_recommendations
             ORDER BY recommendation_date, user_id, rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(records)
    }

    /// Every log row dated on or after `since`.
    pub fn get_interactions_since(&self, since: Date) -> Result<Vec<Interaction>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM quest_recommendations
             WHERE recommendation_date >= ?1 ORDER BY user_id, rowid"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([since.to_string()], record_from_row)?
            .map(|r| r.map(Interaction::from))
            .collect::<std::result::Result<_, _>>()?;
        Ok(rows)
    }

    /// Aggregate engagement counts. Reads counts only, never rows.
    pub fn get_interaction_counts(&self) -> Result<InteractionCounts> {
        let (total, users, quests): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT user_id), COUNT(DISTINCT quest_id)
             FROM quest_recommendations WHERE is_click = 1 OR is_cleared = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(InteractionCounts {
            total_interactions: total as u64,
            active_users: users as u64,
            active_quests: quests as u64,
        })
    }

    pub fn table_count(&self, table: Table) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Tables whose sizes are reported by `table_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    SurveyAnswers,
    Quests,
    Recommendations,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::SurveyAnswers => "survey_answers",
            Table::Quests => "quests",
            Table::Recommendations => "quest_recommendations",
        }
    }
}

// --- Row-level helpers, shared with the dataset bridge ---

pub(crate) fn upsert_user_on(conn: &Connection, user: &UserProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, gender, birth_year, school_id, department, grade)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            gender = excluded.gender,
            birth_year = excluded.birth_year,
            school_id = excluded.school_id,
            department = excluded.department,
            grade = excluded.grade",
        params![
            user.id,
            user.gender.map(|g| g.as_str()),
            user.birth_year,
            user.school_id,
            user.department,
            user.grade
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_answer_on(conn: &Connection, answer: &SurveyAnswer) -> Result<()> {
    conn.execute(
        "INSERT INTO survey_answers (user_id, question_id, question_type, option_order_no)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            answer.user_id,
            answer.question_id,
            answer.question_type,
            answer.option_order_no
        ],
    )?;
    Ok(())
}

pub(crate) fn upsert_quest_on(conn: &Connection, quest: &Quest) -> Result<()> {
    conn.execute(
        "INSERT INTO quests
            (id, type, title, category, verify_method, reward_exp, target_count, period_scope, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            type = excluded.type,
            title = excluded.title,
            category = excluded.category,
            verify_method = excluded.verify_method,
            reward_exp = excluded.reward_exp,
            target_count = excluded.target_count,
            period_scope = excluded.period_scope,
            active = excluded.active",
        params![
            quest.id,
            quest.quest_type.as_str(),
            quest.title,
            quest.category.as_str(),
            quest.verify_method.as_str(),
            quest.reward_exp,
            quest.target_count,
            quest.period_scope.as_str(),
            quest.active
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_record_on(conn: &Connection, record: &RecommendationRecord) -> Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO quest_recommendations
            (id, user_id, quest_id, recommendation_date, is_click, is_cleared)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.id,
            record.user_id,
            record.quest_id,
            record.recommendation_date.to_string(),
            record.is_click,
            record.is_cleared
        ],
    )?;
    Ok(rows > 0)
}

/// Parse a TEXT column through `FromStr`, reporting failures as a column
/// conversion error.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        gender: parse_optional_column(row, 1)?,
        birth_year: row.get(2)?,
        school_id: row.get(3)?,
        department: row.get(4)?,
        grade: row.get(5)?,
    })
}

fn answer_from_row(row: &Row<'_>) -> rusqlite::Result<SurveyAnswer> {
    Ok(SurveyAnswer {
        user_id: row.get(0)?,
        question_id: row.get(1)?,
        question_type: row.get(2)?,
        option_order_no: row.get(3)?,
    })
}

fn quest_from_row(row: &Row<'_>) -> rusqlite::Result<Quest> {
    Ok(Quest {
        id: row.get(0)?,
        quest_type: parse_column(row, 1)?,
        title: row.get(2)?,
        category: parse_column(row, 3)?,
        verify_method: parse_column(row, 4)?,
        reward_exp: row.get(5)?,
        target_count: row.get(6)?,
        period_scope: parse_column(row, 7)?,
        active: row.get(8)?,
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<RecommendationRecord> {
    Ok(RecommendationRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        quest_id: row.get(2)?,
        recommendation_date: parse_column(row, 3)?,
        is_click: row.get(4)?,
        is_cleared: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::{Category, Gender, PeriodScope, QuestType, VerifyMethod};

    fn day(d: u32) -> Date {
        Date::from_ymd(2026, 3, d).unwrap()
    }

    fn quest(id: &str, quest_type: QuestType, active: bool) -> Quest {
        Quest {
            id: id.into(),
            quest_type,
            title: format!("Quest {id}"),
            category: Category::Health,
            verify_method: VerifyMethod::Steps,
            reward_exp: 40,
            target_count: 5000,
            period_scope: PeriodScope::Daily,
            active,
        }
    }

    fn record(
        user: &str,
        quest: &str,
        date: Date,
        click: bool,
        cleared: bool,
    ) -> RecommendationRecord {
        RecommendationRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.into(),
            quest_id: quest.into(),
            recommendation_date: date,
            is_click: click,
            is_cleared: cleared,
        }
    }

    #[test]
    fn test_user_roundtrip_and_update() {
        let store = Store::open_in_memory().unwrap();
        let mut user = UserProfile::new("u1");
        user.gender = Some(Gender::F);
        user.birth_year = Some(2003);
        user.department = Some("Economics".into());
        store.upsert_user(&user).unwrap();
        assert_eq!(store.get_user("u1").unwrap(), Some(user.clone()));

        user.grade = Some(3);
        store.upsert_user(&user).unwrap();
        assert_eq!(store.get_user("u1").unwrap().unwrap().grade, Some(3));
        assert_eq!(store.table_count(Table::Users).unwrap(), 1);
        assert!(store.get_user("ghost").unwrap().is_none());
    }

    #[test]
    fn test_replace_survey_answers() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_user(&UserProfile::new("u1")).unwrap();
        let answer = |qt, ord| SurveyAnswer {
            user_id: "u1".into(),
            question_id: Some(format!("q{qt}")),
            question_type: qt,
            option_order_no: ord,
        };

        store
            .replace_survey_answers("u1", &[answer(3, 1), answer(1, 2)])
            .unwrap();
        let stored = store.get_survey_answers("u1").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].question_type, 1, "ordered by question type");

        store.replace_survey_answers("u1", &[answer(5, 4)]).unwrap();
        assert_eq!(store.get_survey_answers("u1").unwrap(), vec![answer(5, 4)]);
    }

    #[test]
    fn test_replace_survey_answers_rejects_other_users() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_user(&UserProfile::new("u1")).unwrap();
        let stray = SurveyAnswer {
            user_id: "u2".into(),
            question_id: None,
            question_type: 1,
            option_order_no: 1,
        };
        let err = store.replace_survey_answers("u1", &[stray]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn test_eligible_quests_filter() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_quest(&quest("life", QuestType::Life, true)).unwrap();
        store.upsert_quest(&quest("surprise", QuestType::Surprise, true)).unwrap();
        store.upsert_quest(&quest("retired", QuestType::Growth, false)).unwrap();
        store.upsert_quest(&quest("growth", QuestType::Growth, true)).unwrap();

        let ids: Vec<String> = store
            .get_eligible_quests()
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec!["life", "growth"]);

        let by_id = store
            .get_quests_by_ids(&["surprise".into(), "retired".into(), "nope".into()])
            .unwrap();
        assert_eq!(by_id.len(), 2);
        assert!(store.get_quests_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_quest_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let q = quest("q1", QuestType::Growth, true);
        store.upsert_quest(&q).unwrap();
        assert_eq!(store.all_quests().unwrap(), vec![q]);
    }

    #[test]
    fn test_record_recommendations_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        assert_eq!(store.record_recommendations("u1", &ids, day(15)).unwrap(), 3);
        assert_eq!(store.record_recommendations("u1", &ids, day(15)).unwrap(), 0);
        // Overlapping set: only the new quest is inserted
        let next = vec!["c".to_string(), "d".to_string()];
        assert_eq!(store.record_recommendations("u1", &next, day(15)).unwrap(), 1);
        // A new day is a new triple
        assert_eq!(store.record_recommendations("u1", &ids, day(16)).unwrap(), 3);
        assert_eq!(store.table_count(Table::Recommendations).unwrap(), 7);

        let rows = store.get_recommendations("u1").unwrap();
        assert!(rows.iter().all(|r| !r.is_click && !r.is_cleared));
        assert!(rows.iter().all(|r| Uuid::parse_str(&r.id).is_ok()));
    }

    #[test]
    fn test_mark_flags() {
        let store = Store::open_in_memory().unwrap();
        store
            .record_recommendations("u1", &["a".to_string()], day(15))
            .unwrap();

        assert!(store.mark_clicked("u1", "a", day(15)).unwrap());
        assert!(store.mark_cleared("u1", "a", day(15)).unwrap());
        assert!(!store.mark_cleared("u1", "a", day(14)).unwrap());

        let row = &store.get_recommendations("u1").unwrap()[0];
        assert!(row.is_click && row.is_cleared);
    }

    #[test]
    fn test_interaction_counts() {
        let store = Store::open_in_memory().unwrap();
        let counts = store.get_interaction_counts().unwrap();
        assert_eq!(counts, InteractionCounts::default());

        for r in [
            record("u1", "a", day(1), true, false),
            record("u1", "b", day(2), false, true),
            record("u2", "a", day(2), true, true),
            record("u3", "c", day(2), false, false),
        ] {
            assert!(store.insert_interaction(&r).unwrap());
        }
        let counts = store.get_interaction_counts().unwrap();
        assert_eq!(counts.total_interactions, 3);
        assert_eq!(counts.active_users, 2);
        assert_eq!(counts.active_quests, 2);
    }

    #[test]
    fn test_interactions_since_window() {
        let store = Store::open_in_memory().unwrap();
        store.insert_interaction(&record("u1", "a", day(1), true, false)).unwrap();
        store.insert_interaction(&record("u1", "b", day(10), true, false)).unwrap();
        store.insert_interaction(&record("u2", "b", day(20), false, false)).unwrap();

        let rows = store.get_interactions_since(day(10)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.recommendation_date >= day(10)));
    }

    #[test]
    fn test_bad_enum_text_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO quests (id, type, category, verify_method) VALUES ('x', 'BONUS', 'STUDY', 'GPS')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.all_quests().unwrap_err(),
            StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(1, _, _))
        ));
    }

    #[test]
    fn test_eligible_quests_ignore_type_case() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "INSERT INTO quests (id, type, category, verify_method)
                     VALUES ('q_lower', 'life', 'econ', 'gps');
                 INSERT INTO quests (id, type, category, verify_method)
                     VALUES ('q_upper', 'LIFE', 'ECON', 'GPS');
                 INSERT INTO quests (id, type, category, verify_method)
                     VALUES ('q_growth', ' Growth ', 'STUDY', 'LINK');
                 INSERT INTO quests (id, type, category, verify_method)
                     VALUES ('q_surprise', 'surprise', 'ENT', 'GPS');",
            )
            .unwrap();

        let eligible = store.get_eligible_quests().unwrap();
        let ids: Vec<&str> = eligible.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q_lower", "q_upper", "q_growth"]);
        assert_eq!(eligible[0].quest_type, QuestType::Life);
        assert_eq!(eligible[2].quest_type, QuestType::Growth);
    }

    #[test]
    fn test_metadata() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.get_metadata("seeded_at").unwrap(), None);
        store.set_metadata("seeded_at", "2026-03-15").unwrap();
        assert_eq!(
            store.get_metadata("seeded_at").unwrap().as_deref(),
            Some("2026-03-15")
        );
    }
}

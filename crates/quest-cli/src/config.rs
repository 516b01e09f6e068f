//! TOML configuration and path resolution.
//!
//! Precedence for both the database and the config file: command-line flag,
//! then environment variable (`QUEST_DB`, `QUEST_CONFIG`), then default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use quest_core::{Recommender, RecommenderConfig, SurveyMapping};

pub const DB_ENV: &str = "QUEST_DB";
pub const CONFIG_ENV: &str = "QUEST_CONFIG";
pub const DEFAULT_DB: &str = "quest.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database path used when neither `--db` nor `QUEST_DB` is set.
    pub database: Option<PathBuf>,
    pub server: ServerConfig,
    pub recommender: RecommenderConfig,
    /// Replaces the built-in survey mapping table when present.
    pub survey: Option<SurveyMapping>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `flag`, else `QUEST_CONFIG`, else built-in defaults.
    pub fn load(flag: Option<&Path>) -> Result<Self> {
        match resolve(flag, CONFIG_ENV) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if let Some(survey) = &config.survey {
            let unmapped = survey.unmapped_keys();
            if !unmapped.is_empty() {
                tracing::warn!(
                    "survey options without categories: {}",
                    unmapped.join(", ")
                );
            }
        }
        Ok(config)
    }

    /// `flag`, else `QUEST_DB`, else the config file's `database`, else
    /// `quest.db` in the working directory.
    pub fn db_path(&self, flag: Option<&Path>) -> PathBuf {
        resolve(flag, DB_ENV)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }

    pub fn recommender(&self) -> Recommender {
        Recommender::new(
            self.recommender.clone(),
            self.survey.clone().unwrap_or_default(),
        )
    }
}

fn resolve(flag: Option<&Path>, env: &str) -> Option<PathBuf> {
    flag.map(Path::to_path_buf).or_else(|| {
        std::env::var(env)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

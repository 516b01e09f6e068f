//! JSON dataset bridge: move users, survey answers, the quest catalog, and
//! the recommendation log in and out of a store in one document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use quest_core::{Quest, RecommendationRecord, SurveyAnswer, UserProfile};

use crate::error::{Result, StoreError};
use crate::store::{Store, insert_answer_on, insert_record_on, upsert_quest_on, upsert_user_on};

pub const DATASET_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub users: Vec<UserProfile>,
    #[serde(default)]
    pub survey_answers: Vec<SurveyAnswer>,
    #[serde(default)]
    pub quests: Vec<Quest>,
    #[serde(default)]
    pub recommendations: Vec<RecommendationRecord>,
}

fn default_version() -> u32 {
    DATASET_VERSION
}

/// Rows written by an import. Log rows whose (user, quest, date) triple
/// already existed are counted as skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub users: usize,
    pub survey_answers: usize,
    pub quests: usize,
    pub recommendations: usize,
    pub skipped_recommendations: usize,
}

impl Store {
    /// Merge a dataset into this store in one transaction.
    ///
    /// Users and quests are upserted. Each user present in the dataset's
    /// answers has their answers replaced. Log rows are inserted unless
    /// their triple already exists.
    pub fn import_dataset(&self, dataset: &Dataset) -> Result<ImportSummary> {
        if dataset.version > DATASET_VERSION {
            return Err(StoreError::InvalidData(format!(
                "dataset version {} is newer than supported version {DATASET_VERSION}",
                dataset.version
            )));
        }

        let mut summary = ImportSummary::default();
        let tx = self.conn().unchecked_transaction()?;

        for user in &dataset.users {
            upsert_user_on(&tx, user)?;
            summary.users += 1;
        }

        let mut replaced: Vec<&str> = Vec::new();
        for answer in &dataset.survey_answers {
            if !replaced.contains(&answer.user_id.as_str()) {
                tx.execute(
                    "DELETE FROM survey_answers WHERE user_id = ?1",
                    [&answer.user_id],
                )?;
                replaced.push(&answer.user_id);
            }
            insert_answer_on(&tx, answer)?;
            summary.survey_answers += 1;
        }

        for quest in &dataset.quests {
            upsert_quest_on(&tx, quest)?;
            summary.quests += 1;
        }

        for record in &dataset.recommendations {
            if insert_record_on(&tx, record)? {
                summary.recommendations += 1;
            } else {
                summary.skipped_recommendations += 1;
            }
        }

        tx.commit()?;
        tracing::info!(
            "imported {} users, {} answers, {} quests, {} log rows ({} skipped)",
            summary.users,
            summary.survey_answers,
            summary.quests,
            summary.recommendations,
            summary.skipped_recommendations
        );
        Ok(summary)
    }

    pub fn export_dataset(&self) -> Result<Dataset> {
        Ok(Dataset {
            version: DATASET_VERSION,
            users: self.all_users()?,
            survey_answers: self.all_survey_answers()?,
            quests: self.all_quests()?,
            recommendations: self.all_recommendations()?,
        })
    }

    pub fn import_json_str(&self, json: &str) -> Result<ImportSummary> {
        let dataset: Dataset = serde_json::from_str(json)?;
        self.import_dataset(&dataset)
    }

    pub fn import_json_file(&self, path: &Path) -> Result<ImportSummary> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    pub fn export_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_dataset()?)?)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }
}

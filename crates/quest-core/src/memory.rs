//! In-memory `RecommendationSource`, for tests and demos.

use std::collections::{BTreeSet, HashSet};
use std::sync::Mutex;

use crate::gate::InteractionCounts;
use crate::model::{Interaction, Quest, RecommendationRecord, SurveyAnswer, UserProfile};
use crate::source::{RecommendError, RecommendationSource, Result};
use crate::time::Date;

/// Operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOp {
    Profile,
    Survey,
    Catalog,
    Counts,
    Interactions,
    Record,
}

#[derive(Debug, Default)]
pub struct MemorySource {
    pub users: Vec<UserProfile>,
    pub answers: Vec<SurveyAnswer>,
    pub quests: Vec<Quest>,
    log: Mutex<Vec<RecommendationRecord>>,
    failing: Mutex<HashSet<SourceOp>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_answer(mut self, user_id: &str, question_type: u8, option_order_no: u8) -> Self {
        self.answers.push(SurveyAnswer {
            user_id: user_id.to_string(),
            question_id: None,
            question_type,
            option_order_no,
        });
        self
    }

    pub fn with_quest(mut self, quest: Quest) -> Self {
        self.quests.push(quest);
        self
    }

    /// Append a log row as an external collaborator would (flags included).
    pub fn push_interaction(&self, interaction: Interaction) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let id = format!("mem-{}", log.len() + 1);
        log.push(RecommendationRecord {
            id,
            user_id: interaction.user_id,
            quest_id: interaction.quest_id,
            recommendation_date: interaction.recommendation_date,
            is_click: interaction.is_click,
            is_cleared: interaction.is_cleared,
        });
    }

    pub fn records(&self) -> Vec<RecommendationRecord> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Make every call of `op` fail with `DataAccess` from now on.
    pub fn fail(&self, op: SourceOp) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op);
    }

    fn check(&self, op: SourceOp) -> Result<()> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&op) {
            Err(RecommendError::DataAccess(format!("{op:?} unavailable")))
        } else {
            Ok(())
        }
    }

    fn interactions_where(&self, keep: impl Fn(&RecommendationRecord) -> bool) -> Vec<Interaction> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .map(Interaction::from)
            .collect()
    }
}

impl RecommendationSource for MemorySource {
    fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.check(SourceOp::Profile)?;
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }

    fn survey_answers(&self, user_id: &str) -> Result<Vec<SurveyAnswer>> {
        self.check(SourceOp::Survey)?;
        let mut answers: Vec<SurveyAnswer> = self
            .answers
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.question_type);
        Ok(answers)
    }

    fn eligible_quests(&self) -> Result<Vec<Quest>> {
        self.check(SourceOp::Catalog)?;
        Ok(self.quests.iter().filter(|q| q.is_eligible()).cloned().collect())
    }

    fn quests_by_ids(&self, ids: &[String]) -> Result<Vec<Quest>> {
        self.check(SourceOp::Catalog)?;
        Ok(self
            .quests
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    fn interaction_counts(&self) -> Result<InteractionCounts> {
        self.check(SourceOp::Counts)?;
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let engaged: Vec<&RecommendationRecord> =
            log.iter().filter(|r| r.is_click || r.is_cleared).collect();
        let users: BTreeSet<&str> = engaged.iter().map(|r| r.user_id.as_str()).collect();
        let quests: BTreeSet<&str> = engaged.iter().map(|r| r.quest_id.as_str()).collect();
        Ok(InteractionCounts {
            total_interactions: engaged.len() as u64,
            active_users: users.len() as u64,
            active_quests: quests.len() as u64,
        })
    }

    fn interactions_since(&self, since: Date) -> Result<Vec<Interaction>> {
        self.check(SourceOp::Interactions)?;
        Ok(self.interactions_where(|r| r.recommendation_date >= since))
    }

    fn user_interactions(&self, user_id: &str) -> Result<Vec<Interaction>> {
        self.check(SourceOp::Interactions)?;
        Ok(self.interactions_where(|r| r.user_id == user_id))
    }

    fn record_recommendations(
        &self,
        user_id: &str,
        quest_ids: &[String],
        date: Date,
    ) -> Result<usize> {
        self.check(SourceOp::Record)?;
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        let mut inserted = 0;
        for quest_id in quest_ids {
            let exists = log.iter().any(|r| {
                r.user_id == user_id && &r.quest_id == quest_id && r.recommendation_date == date
            });
            if exists {
                continue;
            }
            let id = format!("mem-{}", log.len() + 1);
            log.push(RecommendationRecord {
                id,
                user_id: user_id.to_string(),
                quest_id: quest_id.clone(),
                recommendation_date: date,
                is_click: false,
                is_cleared: false,
            });
            inserted += 1;
        }
        Ok(inserted)
    }
}

//! `RecommendationSource` over SQLite. Store failures surface to the engine
//! as `RecommendError::DataAccess`.

use quest_core::source::Result;
use quest_core::{
    Date, Interaction, InteractionCounts, Quest, RecommendationSource, SurveyAnswer, UserProfile,
};

use crate::store::Store;

impl RecommendationSource for Store {
    fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.get_user(user_id)?)
    }

    fn survey_answers(&self, user_id: &str) -> Result<Vec<SurveyAnswer>> {
        Ok(self.get_survey_answers(user_id)?)
    }

    fn eligible_quests(&self) -> Result<Vec<Quest>> {
        Ok(self.get_eligible_quests()?)
    }

    fn quests_by_ids(&self, ids: &[String]) -> Result<Vec<Quest>> {
        Ok(self.get_quests_by_ids(ids)?)
    }

    fn interaction_counts(&self) -> Result<InteractionCounts> {
        let counts = self.get_interaction_counts()?;
        tracing::debug!(
            "interaction counts: {} rows, {} users, {} quests",
            counts.total_interactions,
            counts.active_users,
            counts.active_quests
        );
        Ok(counts)
    }

    fn interactions_since(&self, since: Date) -> Result<Vec<Interaction>> {
        Ok(self.get_interactions_since(since)?)
    }

    fn user_interactions(&self, user_id: &str) -> Result<Vec<Interaction>> {
        let records = self.get_recommendations(user_id)?;
        Ok(records.into_iter().map(Interaction::from).collect())
    }

    fn record_recommendations(
        &self,
        user_id: &str,
        quest_ids: &[String],
        date: Date,
    ) -> Result<usize> {
        Ok(Store::record_recommendations(self, user_id, quest_ids, date)?)
    }
}

//! The collaborator seam: everything the engine reads from, and the one
//! thing it writes back to, the data store.

use std::fmt;

use crate::gate::InteractionCounts;
use crate::model::{Interaction, Quest, SurveyAnswer, UserProfile};
use crate::time::Date;

#[derive(Debug)]
pub enum RecommendError {
    /// The user has no profile. The only failure surfaced to callers of
    /// `recommend`.
    NotFound(String),
    /// The user never answered the survey (preference diagnostics only).
    NoSurvey(String),
    /// A read or write against the data store failed.
    DataAccess(String),
}

impl fmt::Display for RecommendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendError::NotFound(user) => write!(f, "user not found: {user}"),
            RecommendError::NoSurvey(user) => write!(f, "no survey answers for user: {user}"),
            RecommendError::DataAccess(msg) => write!(f, "data access failed: {msg}"),
        }
    }
}

impl std::error::Error for RecommendError {}

pub type Result<T> = std::result::Result<T, RecommendError>;

/// Read-only snapshots plus the idempotent recommendation-log write.
///
/// Implementations must not mutate balances, attempts, EXP, or the
/// click/clear flags of existing log rows.
pub trait RecommendationSource {
    /// `Ok(None)` when the user does not exist.
    fn user_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Answers ordered by question type.
    fn survey_answers(&self, user_id: &str) -> Result<Vec<SurveyAnswer>>;

    /// Active LIFE/GROWTH quests in stable catalog order.
    fn eligible_quests(&self) -> Result<Vec<Quest>>;

    /// Quests by id regardless of type or active flag. Unknown ids are skipped.
    fn quests_by_ids(&self, ids: &[String]) -> Result<Vec<Quest>>;

    /// Platform-wide engagement counts (clicked or cleared rows).
    fn interaction_counts(&self) -> Result<InteractionCounts>;

    /// Every log row dated on or after `since`, for all users.
    fn interactions_since(&self, since: Date) -> Result<Vec<Interaction>>;

    /// A single user's full log history.
    fn user_interactions(&self, user_id: &str) -> Result<Vec<Interaction>>;

    /// Append one row per quest for `date`, skipping (user, quest, date)
    /// triples that already exist. Returns the number of rows inserted.
    fn record_recommendations(&self, user_id: &str, quest_ids: &[String], date: Date)
    -> Result<usize>;
}

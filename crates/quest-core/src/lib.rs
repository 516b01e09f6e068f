//! Quest recommendation engine.
//!
//! Picks up to three quests per user per day. Users with a survey but a thin
//! platform get category scoring from their profile and answers; once the
//! platform clears the data-sufficiency gate, a hybrid of user-based
//! collaborative filtering and content matching takes over. Every result is
//! category-diverse where the catalog allows it.
//!
//! Zero I/O. Storage sits behind [`RecommendationSource`].

pub mod collaborative;
pub mod config;
pub mod constants;
pub mod content;
pub mod diversity;
pub mod gate;
pub mod hybrid;
pub mod mapping;
pub mod memory;
pub mod model;
pub mod preference;
pub mod recommender;
pub mod source;
pub mod time;

pub use collaborative::{InteractionMatrix, SimilarUser, cosine_similarity, find_similar_users};
pub use config::{GateThresholds, RecommenderConfig};
pub use diversity::select_diverse;
pub use gate::{InteractionCounts, SufficiencyReport};
pub use hybrid::HybridOutcome;
pub use mapping::SurveyMapping;
pub use memory::MemorySource;
pub use model::{
    Category, Gender, Interaction, PeriodScope, Quest, QuestType, RecommendationRecord,
    ScoredQuest, SurveyAnswer, UnknownVariant, UserProfile, VerifyMethod,
};
pub use preference::{CategoryScores, analyze_preferences, score_quests};
pub use recommender::{PreferenceReport, Recommendation, RecommendationPath, Recommender};
pub use source::{RecommendError, RecommendationSource};
pub use time::Date;

/// Quests returned per recommendation call.
pub const RESULT_SIZE: usize = 3;

/// Hybrid candidates kept before the diversity pass.
pub const HYBRID_POOL_SIZE: usize = 5;

/// Gate: minimum engaged (clicked or cleared) log rows platform-wide.
pub const MIN_TOTAL_INTERACTIONS: u64 = 10_000;

/// Gate: minimum distinct users with at least one engaged row.
pub const MIN_ACTIVE_USERS: u64 = 1_000;

/// Gate: minimum distinct quests with at least one engaged row.
pub const MIN_ACTIVE_QUESTS: u64 = 30;

/// Gate: minimum engaged rows per active user.
pub const MIN_AVG_INTERACTIONS_PER_USER: f64 = 5.0;

/// Rolling window for the user × quest interaction matrix.
pub const INTERACTION_WINDOW_DAYS: i64 = 90;

/// Quests recommended to a user within this many days are not re-recommended
/// by the hybrid path.
pub const RECENT_EXCLUSION_DAYS: i64 = 7;

/// Neighbours kept for collaborative scoring.
pub const MAX_SIMILAR_USERS: usize = 10;

/// Neighbours must be strictly more similar than this.
pub const MIN_SIMILARITY: f64 = 0.1;

pub const CLICK_WEIGHT: f64 = 0.3;
pub const CLEAR_WEIGHT: f64 = 0.7;

pub const COLLABORATIVE_WEIGHT: f64 = 0.6;
pub const CONTENT_WEIGHT: f64 = 0.4;

/// Category bonus per mapped survey answer.
pub const SURVEY_ANSWER_BONUS: u32 = 3;

/// `reward_exp` at or above this normalises to 1.0 in the content vector.
pub const REWARD_EXP_NORMALIZER: f64 = 100.0;

/// `target_count` at or above this normalises to 1.0 difficulty.
pub const DIFFICULTY_NORMALIZER: f64 = 30.0;

/// Low-barrier quests handed to users who skipped the survey.
pub const DEFAULT_QUEST_IDS: [&str; 3] =
    ["quest_growth_008", "quest_growth_012", "quest_daily_017"];

//! Tunables for the recommender. Every field has a production default so a
//! partial TOML table only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateThresholds {
    pub min_total_interactions: u64,
    pub min_active_users: u64,
    pub min_active_quests: u64,
    pub min_avg_interactions_per_user: f64,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            min_total_interactions: MIN_TOTAL_INTERACTIONS,
            min_active_users: MIN_ACTIVE_USERS,
            min_active_quests: MIN_ACTIVE_QUESTS,
            min_avg_interactions_per_user: MIN_AVG_INTERACTIONS_PER_USER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub result_size: usize,
    pub hybrid_pool_size: usize,
    pub gate: GateThresholds,
    pub interaction_window_days: i64,
    pub recent_exclusion_days: i64,
    pub max_similar_users: usize,
    pub min_similarity: f64,
    pub click_weight: f64,
    pub clear_weight: f64,
    pub collaborative_weight: f64,
    pub content_weight: f64,
    pub survey_answer_bonus: u32,
    pub reward_exp_normalizer: f64,
    pub difficulty_normalizer: f64,
    pub default_quest_ids: Vec<String>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            result_size: RESULT_SIZE,
            hybrid_pool_size: HYBRID_POOL_SIZE,
            gate: GateThresholds::default(),
            interaction_window_days: INTERACTION_WINDOW_DAYS,
            recent_exclusion_days: RECENT_EXCLUSION_DAYS,
            max_similar_users: MAX_SIMILAR_USERS,
            min_similarity: MIN_SIMILARITY,
            click_weight: CLICK_WEIGHT,
            clear_weight: CLEAR_WEIGHT,
            collaborative_weight: COLLABORATIVE_WEIGHT,
            content_weight: CONTENT_WEIGHT,
            survey_answer_bonus: SURVEY_ANSWER_BONUS,
            reward_exp_normalizer: REWARD_EXP_NORMALIZER,
            difficulty_normalizer: DIFFICULTY_NORMALIZER,
            default_quest_ids: DEFAULT_QUEST_IDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RecommenderConfig = toml::from_str(
            r#"
            result_size = 4
            [gate]
            min_active_users = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.result_size, 4);
        assert_eq!(config.gate.min_active_users, 10);
        assert_eq!(config.gate.min_total_interactions, MIN_TOTAL_INTERACTIONS);
        assert_eq!(config.hybrid_pool_size, HYBRID_POOL_SIZE);
        assert_eq!(config.default_quest_ids.len(), 3);
    }

    #[test]
    fn test_blend_weights_sum_to_one() {
        let config = RecommenderConfig::default();
        assert!((config.collaborative_weight + config.content_weight - 1.0).abs() < 1e-12);
        assert!((config.click_weight + config.clear_weight - 1.0).abs() < 1e-12);
    }
}

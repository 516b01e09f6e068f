//! Content-based scoring: match quest attributes against the user's own
//! engagement history.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Category, Interaction, Quest, QuestType, VerifyMethod};

/// Sparse feature vector keyed by dimension name (`category:STUDY`,
/// `verify:GPS`, `reward_exp`, ...).
pub type FeatureVector = BTreeMap<String, f64>;

fn category_key(c: Category) -> String {
    format!("category:{c}")
}

fn type_key(t: QuestType) -> String {
    format!("type:{t}")
}

fn verify_key(v: VerifyMethod) -> String {
    format!("verify:{v}")
}

/// One-hot category/type/verify/period tags plus normalised reward and,
/// when the quest has a target count, normalised difficulty.
pub fn quest_features(
    quest: &Quest,
    reward_normalizer: f64,
    difficulty_normalizer: f64,
) -> FeatureVector {
    let mut v = FeatureVector::new();
    v.insert(category_key(quest.category), 1.0);
    v.insert(type_key(quest.quest_type), 1.0);
    v.insert(verify_key(quest.verify_method), 1.0);
    v.insert(format!("period:{}", quest.period_scope), 1.0);
    v.insert(
        "reward_exp".to_string(),
        normalize(f64::from(quest.reward_exp), reward_normalizer),
    );
    if quest.target_count > 0 {
        v.insert(
            "difficulty".to_string(),
            normalize(f64::from(quest.target_count), difficulty_normalizer),
        );
    }
    v
}

fn normalize(value: f64, normalizer: f64) -> f64 {
    if normalizer <= 0.0 {
        return 1.0;
    }
    (value / normalizer).min(1.0)
}

#[derive(Debug, Default)]
struct GroupStats {
    count: u32,
    cleared: u32,
}

/// A user's historical affinity over the category/type/verify dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAffinity {
    weights: FeatureVector,
}

impl UserAffinity {
    /// Group the user's engaged rows by (category, type, verify method).
    /// Each group weighs `count * (0.5 + 0.5 * completion_rate)`, credited to
    /// all three of its dimensions. Rows for quests not in `quests` are skipped.
    pub fn from_history(history: &[Interaction], quests: &HashMap<String, Quest>) -> Self {
        let mut groups: BTreeMap<(Category, QuestType, VerifyMethod), GroupStats> =
            BTreeMap::new();

        for row in history.iter().filter(|r| r.is_engaged()) {
            let Some(quest) = quests.get(&row.quest_id) else {
                continue;
            };
            let stats = groups
                .entry((quest.category, quest.quest_type, quest.verify_method))
                .or_default();
            stats.count += 1;
            if row.is_cleared {
                stats.cleared += 1;
            }
        }

        let mut weights = FeatureVector::new();
        for ((category, quest_type, verify), stats) in groups {
            let completion_rate = f64::from(stats.cleared) / f64::from(stats.count);
            let weight = f64::from(stats.count) * (0.5 + 0.5 * completion_rate);
            for key in [category_key(category), type_key(quest_type), verify_key(verify)] {
                *weights.entry(key).or_insert(0.0) += weight;
            }
        }

        Self { weights }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weight(&self, dimension: &str) -> f64 {
        self.weights.get(dimension).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Matching-dimension dot product divided by total affinity, capped at 1.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let matched: f64 = self
            .weights
            .iter()
            .filter_map(|(dim, w)| features.get(dim).map(|f| w * f))
            .sum();
        (matched / total).min(1.0)
    }
}

/// Content score for every candidate quest.
pub fn content_scores(
    affinity: &UserAffinity,
    candidates: &[Quest],
    reward_normalizer: f64,
    difficulty_normalizer: f64,
) -> HashMap<String, f64> {
    candidates
        .iter()
        .map(|q| {
            let features = quest_features(q, reward_normalizer, difficulty_normalizer);
            (q.id.clone(), affinity.score(&features))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PeriodScope;
    use crate::time::Date;
    use approx::assert_relative_eq;

    fn quest(id: &str, category: Category, quest_type: QuestType, verify: VerifyMethod) -> Quest {
        Quest {
            id: id.into(),
            quest_type,
            title: String::new(),
            category,
            verify_method: verify,
            reward_exp: 50,
            target_count: 10,
            period_scope: PeriodScope::Weekly,
            active: true,
        }
    }

    fn row(quest: &str, click: bool, cleared: bool) -> Interaction {
        Interaction {
            user_id: "me".into(),
            quest_id: quest.into(),
            recommendation_date: Date::from_ymd(2026, 3, 1).unwrap(),
            is_click: click,
            is_cleared: cleared,
        }
    }

    fn catalog(quests: &[Quest]) -> HashMap<String, Quest> {
        quests.iter().map(|q| (q.id.clone(), q.clone())).collect()
    }

    #[test]
    fn test_quest_features() {
        let mut q = quest("q", Category::Study, QuestType::Growth, VerifyMethod::Link);
        q.reward_exp = 250;
        q.target_count = 15;
        let f = quest_features(&q, 100.0, 30.0);
        assert_eq!(f["category:STUDY"], 1.0);
        assert_eq!(f["type:GROWTH"], 1.0);
        assert_eq!(f["verify:LINK"], 1.0);
        assert_eq!(f["period:WEEKLY"], 1.0);
        assert_eq!(f["reward_exp"], 1.0);
        assert_relative_eq!(f["difficulty"], 0.5);

        q.target_count = 0;
        assert!(!quest_features(&q, 100.0, 30.0).contains_key("difficulty"));
    }

    #[test]
    fn test_affinity_weights_by_completion() {
        let quests = catalog(&[
            quest("s1", Category::Study, QuestType::Growth, VerifyMethod::Link),
            quest("s2", Category::Study, QuestType::Growth, VerifyMethod::Link),
            quest("h1", Category::Health, QuestType::Life, VerifyMethod::Steps),
        ]);
        let history = vec![
            row("s1", true, true),
            row("s2", true, false),
            row("h1", true, false),
            row("h1", false, false),
            row("missing", true, true),
        ];
        let affinity = UserAffinity::from_history(&history, &quests);

        // study group: 2 rows, 50% cleared → 2 * 0.75
        assert_relative_eq!(affinity.weight("category:STUDY"), 1.5);
        assert_relative_eq!(affinity.weight("verify:LINK"), 1.5);
        // health group: 1 engaged row, 0% cleared → 0.5
        assert_relative_eq!(affinity.weight("category:HEALTH"), 0.5);
        assert_relative_eq!(affinity.total(), 6.0);
    }

    #[test]
    fn test_score_normalised_and_capped() {
        let study = quest("s1", Category::Study, QuestType::Growth, VerifyMethod::Link);
        let health = quest("h1", Category::Health, QuestType::Life, VerifyMethod::Steps);
        let quests = catalog(&[study.clone(), health.clone()]);
        let affinity = UserAffinity::from_history(&[row("s1", true, true)], &quests);

        let scores = content_scores(&affinity, &[study, health], 100.0, 30.0);
        assert_relative_eq!(scores["s1"], 1.0);
        assert_eq!(scores["h1"], 0.0);
    }

    #[test]
    fn test_empty_history_scores_zero() {
        let affinity = UserAffinity::from_history(&[], &HashMap::new());
        assert!(affinity.is_empty());
        let q = quest("s1", Category::Study, QuestType::Growth, VerifyMethod::Link);
        assert_eq!(affinity.score(&quest_features(&q, 100.0, 30.0)), 0.0);
    }
}

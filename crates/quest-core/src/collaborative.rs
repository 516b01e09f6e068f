//! User-based collaborative filtering over the recommendation log.
//!
//! The matrix maps user → quest → interaction weight
//! (`click_weight * click + clear_weight * cleared`). Similarity is cosine
//! restricted to the quests both users have a row for; neighbours' engaged
//! history is then accumulated as `similarity * weight` per quest and
//! normalised by the maximum into [0, 1].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::Interaction;

pub type InteractionVector = HashMap<String, f64>;

#[derive(Debug, Clone, Default)]
pub struct InteractionMatrix {
    rows: BTreeMap<String, InteractionVector>,
}

impl InteractionMatrix {
    /// Build from log rows. A user may have several rows for the same quest
    /// (one per recommendation day); the strongest one is kept.
    pub fn build(interactions: &[Interaction], click_weight: f64, clear_weight: f64) -> Self {
        let mut rows: BTreeMap<String, InteractionVector> = BTreeMap::new();
        for i in interactions {
            let weight = i.weight(click_weight, clear_weight);
            let cell = rows
                .entry(i.user_id.clone())
                .or_default()
                .entry(i.quest_id.clone())
                .or_insert(weight);
            if weight > *cell {
                *cell = weight;
            }
        }
        Self { rows }
    }

    pub fn get(&self, user_id: &str) -> Option<&InteractionVector> {
        self.rows.get(user_id)
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InteractionVector)> {
        self.rows.iter().map(|(u, v)| (u.as_str(), v))
    }
}

/// Cosine similarity over the quests both vectors contain.
/// No overlap, or an all-zero overlap, yields 0.
pub fn cosine_similarity(a: &InteractionVector, b: &InteractionVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut dot = 0.0;
    let mut norm_small = 0.0;
    let mut norm_large = 0.0;
    let mut overlap = false;

    for (quest, &x) in small {
        if let Some(&y) = large.get(quest) {
            overlap = true;
            dot += x * y;
            norm_small += x * x;
            norm_large += y * y;
        }
    }

    if !overlap {
        return 0.0;
    }
    let denominator = norm_small.sqrt() * norm_large.sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        dot / denominator
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: String,
    pub similarity: f64,
}

/// Up to `limit` users most similar to `user_id`, each strictly above
/// `min_similarity`. A user absent from the matrix has no neighbours.
/// Equal similarities keep user-id order.
pub fn find_similar_users(
    matrix: &InteractionMatrix,
    user_id: &str,
    limit: usize,
    min_similarity: f64,
) -> Vec<SimilarUser> {
    let Some(target) = matrix.get(user_id) else {
        return Vec::new();
    };

    let mut similar: Vec<SimilarUser> = matrix
        .iter()
        .filter(|(other, _)| *other != user_id)
        .filter_map(|(other, vector)| {
            let similarity = cosine_similarity(target, vector);
            (similarity > min_similarity).then(|| SimilarUser {
                user_id: other.to_string(),
                similarity,
            })
        })
        .collect();

    similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    similar.truncate(limit);
    similar
}

/// Accumulate neighbours' engaged history into per-quest scores in [0, 1].
///
/// Each neighbour contributes `similarity * weight` for every clicked or
/// cleared row. Scores are divided by the maximum; if the maximum is 0 the
/// raw (all-zero) scores are returned.
pub fn collaborative_scores(
    neighbours: &[(SimilarUser, Vec<Interaction>)],
    click_weight: f64,
    clear_weight: f64,
) -> HashMap<String, f64> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for (neighbour, history) in neighbours {
        for row in history.iter().filter(|r| r.is_engaged()) {
            *scores.entry(row.quest_id.clone()).or_insert(0.0) +=
                neighbour.similarity * row.weight(click_weight, clear_weight);
        }
    }

    let max = scores.values().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        for score in scores.values_mut() {
            *score /= max;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Date;
    use approx::assert_relative_eq;

    fn row(user: &str, quest: &str, click: bool, cleared: bool) -> Interaction {
        Interaction {
            user_id: user.into(),
            quest_id: quest.into(),
            recommendation_date: Date::from_ymd(2026, 3, 1).unwrap(),
            is_click: click,
            is_cleared: cleared,
        }
    }

    fn vector(entries: &[(&str, f64)]) -> InteractionVector {
        entries.iter().map(|(q, w)| (q.to_string(), *w)).collect()
    }

    #[test]
    fn test_matrix_keeps_strongest_row_per_pair() {
        let matrix = InteractionMatrix::build(
            &[
                row("u1", "q1", true, false),
                row("u1", "q1", true, true),
                row("u1", "q1", false, false),
                row("u2", "q2", false, false),
            ],
            0.3,
            0.7,
        );
        assert_eq!(matrix.user_count(), 2);
        assert_relative_eq!(matrix.get("u1").unwrap()["q1"], 1.0);
        // Zero-weight rows still occupy a cell
        assert_eq!(matrix.get("u2").unwrap()["q2"], 0.0);
    }

    #[test]
    fn test_cosine_restricted_to_overlap() {
        let a = vector(&[("q1", 1.0), ("q2", 0.3), ("q9", 1.0)]);
        let b = vector(&[("q1", 1.0), ("q2", 0.3), ("q7", 0.7)]);
        // Only q1 and q2 overlap and they are identical
        assert_relative_eq!(cosine_similarity(&a, &b), 1.0, epsilon = 1e-12);

        let c = vector(&[("q1", 1.0), ("q2", 0.0)]);
        let d = vector(&[("q1", 0.0), ("q2", 1.0)]);
        assert_eq!(cosine_similarity(&c, &d), 0.0);
    }

    #[test]
    fn test_cosine_degenerate_cases() {
        let a = vector(&[("q1", 1.0)]);
        let b = vector(&[("q2", 1.0)]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        let zero = vector(&[("q1", 0.0)]);
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&InteractionVector::new(), &a), 0.0);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = vector(&[("q1", 1.0), ("q2", 0.3), ("q3", 0.7)]);
        let b = vector(&[("q1", 0.3), ("q2", 1.0), ("q3", 0.7), ("q4", 1.0)]);
        assert_relative_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_find_similar_users_threshold_and_limit() {
        let matrix = InteractionMatrix::build(
            &[
                row("me", "q1", true, true),
                row("me", "q2", true, false),
                row("twin", "q1", true, true),
                row("twin", "q2", true, false),
                row("close", "q1", true, true),
                row("close", "q2", false, true),
                row("stranger", "q3", true, true),
                row("opposite", "q1", false, false),
                row("opposite", "q2", true, false),
            ],
            0.3,
            0.7,
        );

        let similar = find_similar_users(&matrix, "me", 10, 0.1);
        let ids: Vec<&str> = similar.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(ids[0], "twin");
        assert!(ids.contains(&"close"));
        assert!(!ids.contains(&"stranger"), "no overlap means no similarity");
        assert!(!ids.contains(&"me"));

        let top1 = find_similar_users(&matrix, "me", 1, 0.1);
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].user_id, "twin");
    }

    #[test]
    fn test_unknown_user_has_no_neighbours() {
        let matrix = InteractionMatrix::build(&[row("u1", "q1", true, true)], 0.3, 0.7);
        assert!(find_similar_users(&matrix, "ghost", 10, 0.1).is_empty());
    }

    #[test]
    fn test_collaborative_scores_from_two_neighbours() {
        let neighbours = vec![
            (
                SimilarUser { user_id: "a".into(), similarity: 0.5 },
                vec![row("a", "qx", false, true), row("a", "qy", true, false)],
            ),
            (
                SimilarUser { user_id: "b".into(), similarity: 0.5 },
                vec![row("b", "qx", false, true), row("b", "qz", false, false)],
            ),
        ];
        let scores = collaborative_scores(&neighbours, 0.3, 0.7);

        assert_relative_eq!(scores["qx"], 1.0);
        // 0.5 * 0.3 / (0.5 * 0.7 * 2)
        assert_relative_eq!(scores["qy"], 0.15 / 0.7, epsilon = 1e-12);
        // Unengaged rows contribute nothing
        assert!(!scores.contains_key("qz"));
        assert!(scores["qx"] > scores.get("untouched").copied().unwrap_or(0.0));
    }

    #[test]
    fn test_collaborative_scores_empty() {
        assert!(collaborative_scores(&[], 0.3, 0.7).is_empty());
    }
}

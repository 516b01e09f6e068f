//! Hybrid path: collaborative and content scores blended, recent and
//! completed quests excluded, then the diversity pass.

use std::collections::{HashMap, HashSet};

use crate::collaborative::{InteractionMatrix, collaborative_scores, find_similar_users};
use crate::config::RecommenderConfig;
use crate::content::{UserAffinity, content_scores};
use crate::diversity::select_diverse;
use crate::model::{Interaction, Quest, ScoredQuest};
use crate::source::{RecommendError, RecommendationSource, Result};
use crate::time::Date;

/// What the hybrid path produced for one request.
#[derive(Debug)]
pub enum HybridOutcome {
    /// A full result list.
    Selected(Vec<ScoredQuest>),
    /// Fewer candidates than the result size survived; the caller falls back.
    Insufficient(Vec<ScoredQuest>),
    /// A data read failed; the caller falls back.
    Failed(RecommendError),
}

/// `collaborative_weight * cf + content_weight * cbf` for every candidate
/// scored by either model. Missing scores count as 0. Output follows
/// candidate order, so a stable sort keeps catalog order on ties.
pub fn blend(
    candidates: &[Quest],
    collaborative: &HashMap<String, f64>,
    content: &HashMap<String, f64>,
    collaborative_weight: f64,
    content_weight: f64,
) -> Vec<ScoredQuest> {
    candidates
        .iter()
        .filter(|q| collaborative.contains_key(&q.id) || content.contains_key(&q.id))
        .map(|q| {
            let cf = collaborative.get(&q.id).copied().unwrap_or(0.0);
            let cbf = content.get(&q.id).copied().unwrap_or(0.0);
            ScoredQuest::new(q.clone(), collaborative_weight * cf + content_weight * cbf)
        })
        .collect()
}

/// Quests the user ever cleared, plus quests recommended to them on or
/// after `today - recent_days`.
pub fn excluded_quests(history: &[Interaction], today: Date, recent_days: i64) -> HashSet<String> {
    let cutoff = today.minus_days(recent_days);
    history
        .iter()
        .filter(|r| r.is_cleared || r.recommendation_date >= cutoff)
        .map(|r| r.quest_id.clone())
        .collect()
}

/// Drop excluded quests, sort by score, keep the top `pool_size`, then pick
/// `result_size` category-diverse quests from that pool.
pub fn rank_and_select(
    mut blended: Vec<ScoredQuest>,
    excluded: &HashSet<String>,
    pool_size: usize,
    result_size: usize,
) -> Vec<ScoredQuest> {
    blended.retain(|s| !excluded.contains(&s.quest.id));
    blended.sort_by(|a, b| b.recommendation_score.total_cmp(&a.recommendation_score));
    blended.truncate(pool_size);
    select_diverse(&blended, result_size)
}

/// Run the full hybrid pipeline for one user against `source`.
pub fn run<S: RecommendationSource + ?Sized>(
    source: &S,
    user_id: &str,
    today: Date,
    config: &RecommenderConfig,
) -> HybridOutcome {
    match score(source, user_id, today, config) {
        Ok(selected) if selected.len() >= config.result_size => HybridOutcome::Selected(selected),
        Ok(selected) => HybridOutcome::Insufficient(selected),
        Err(e) => HybridOutcome::Failed(e),
    }
}

fn score<S: RecommendationSource + ?Sized>(
    source: &S,
    user_id: &str,
    today: Date,
    config: &RecommenderConfig,
) -> Result<Vec<ScoredQuest>> {
    let candidates: Vec<Quest> = source
        .eligible_quests()?
        .into_iter()
        .filter(Quest::is_eligible)
        .collect();

    let window = source.interactions_since(today.minus_days(config.interaction_window_days))?;
    let matrix = InteractionMatrix::build(&window, config.click_weight, config.clear_weight);
    let similar = find_similar_users(
        &matrix,
        user_id,
        config.max_similar_users,
        config.min_similarity,
    );

    let mut neighbours = Vec::with_capacity(similar.len());
    for neighbour in similar {
        let history = source.user_interactions(&neighbour.user_id)?;
        neighbours.push((neighbour, history));
    }
    let cf = collaborative_scores(&neighbours, config.click_weight, config.clear_weight);

    let own_history = source.user_interactions(user_id)?;
    let history_ids: Vec<String> = own_history
        .iter()
        .map(|r| r.quest_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let history_quests: HashMap<String, Quest> = source
        .quests_by_ids(&history_ids)?
        .into_iter()
        .map(|q| (q.id.clone(), q))
        .collect();
    let affinity = UserAffinity::from_history(&own_history, &history_quests);
    let cbf = content_scores(
        &affinity,
        &candidates,
        config.reward_exp_normalizer,
        config.difficulty_normalizer,
    );

    tracing::debug!(
        "hybrid for {user_id}: {} neighbours, {} cf scores, {} candidates",
        neighbours.len(),
        cf.len(),
        candidates.len()
    );

    let blended = blend(
        &candidates,
        &cf,
        &cbf,
        config.collaborative_weight,
        config.content_weight,
    );
    let excluded = excluded_quests(&own_history, today, config.recent_exclusion_days);
    Ok(rank_and_select(
        blended,
        &excluded,
        config.hybrid_pool_size,
        config.result_size,
    ))
}

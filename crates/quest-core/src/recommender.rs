//! Request orchestration: profile lookup, gate, hybrid path, cold start,
//! default set, and persistence of what was served.
//!
//! Only a missing user is an error. Every other failure degrades to the
//! next path down and is logged.

use serde::{Deserialize, Serialize};

use crate::config::RecommenderConfig;
use crate::diversity::select_diverse;
use crate::gate::{self, SufficiencyReport};
use crate::hybrid::{self, HybridOutcome};
use crate::mapping::SurveyMapping;
use crate::model::{Category, Quest, ScoredQuest, UserProfile};
use crate::preference::{CategoryScores, analyze_preferences, score_quests};
use crate::source::{RecommendError, RecommendationSource, Result};
use crate::time::Date;

/// Which branch produced a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPath {
    /// Collaborative + content blend.
    Hybrid,
    /// Survey/profile category scoring.
    ColdStart,
    /// The user skipped the survey; curated low-barrier quests.
    DefaultSet,
    /// Data access failed; curated quests on a best-effort basis.
    Fallback,
}

impl RecommendationPath {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationPath::Hybrid => "hybrid",
            RecommendationPath::ColdStart => "cold_start",
            RecommendationPath::DefaultSet => "default_set",
            RecommendationPath::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for RecommendationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: String,
    pub path: RecommendationPath,
    pub quests: Vec<ScoredQuest>,
    /// `None` when the gate could not be evaluated.
    pub gate: Option<SufficiencyReport>,
    /// Log rows inserted by this call (0 on repeat calls the same day).
    pub recorded: usize,
}

impl Recommendation {
    pub fn quest_ids(&self) -> Vec<String> {
        self.quests.iter().map(|s| s.quest.id.clone()).collect()
    }
}

/// Preference diagnostics for a user who answered the survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceReport {
    pub user_id: String,
    pub user_info: UserProfile,
    pub survey_answers_count: usize,
    pub category_scores: CategoryScores,
    pub top_categories: Vec<(Category, u32)>,
}

#[derive(Debug, Clone, Default)]
pub struct Recommender {
    config: RecommenderConfig,
    mapping: SurveyMapping,
}

impl Recommender {
    pub fn new(config: RecommenderConfig, mapping: SurveyMapping) -> Self {
        Self { config, mapping }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn mapping(&self) -> &SurveyMapping {
        &self.mapping
    }

    /// Up to `result_size` quest ids for `user_id`, in presentation order.
    pub fn recommend<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
        user_id: &str,
        today: Date,
    ) -> Result<Vec<String>> {
        Ok(self.recommend_detailed(source, user_id, today)?.quest_ids())
    }

    /// Same selection as [`recommend`](Self::recommend), with full quest
    /// records, scores, the path taken, and the gate report.
    pub fn recommend_detailed<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
        user_id: &str,
        today: Date,
    ) -> Result<Recommendation> {
        let profile = match source.user_profile(user_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => return Err(RecommendError::NotFound(user_id.to_string())),
            Err(e) => {
                tracing::error!("profile lookup failed for {user_id}: {e}");
                let quests = self.fallback(source);
                let path = RecommendationPath::Fallback;
                return Ok(self.finish(source, user_id, today, path, None, quests));
            }
        };

        let gate = match self.data_sufficiency(source) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("gate unavailable, skipping hybrid: {e}");
                None
            }
        };

        if gate.as_ref().is_some_and(|g| g.is_sufficient) {
            match hybrid::run(source, user_id, today, &self.config) {
                HybridOutcome::Selected(quests) => {
                    let path = RecommendationPath::Hybrid;
                    return Ok(self.finish(source, user_id, today, path, gate, quests));
                }
                HybridOutcome::Insufficient(quests) => {
                    tracing::info!(
                        "hybrid produced {} of {} for {user_id}, using cold start",
                        quests.len(),
                        self.config.result_size
                    );
                }
                HybridOutcome::Failed(e) => {
                    tracing::warn!("hybrid failed for {user_id}, using cold start: {e}");
                }
            }
        }

        match self.cold_start(source, &profile, today) {
            Ok((path, quests)) => Ok(self.finish(source, user_id, today, path, gate, quests)),
            Err(e) => {
                tracing::warn!("cold start failed for {user_id}: {e}");
                let quests = self.fallback(source);
                let path = RecommendationPath::Fallback;
                Ok(self.finish(source, user_id, today, path, gate, quests))
            }
        }
    }

    /// Evaluate the platform-wide gate.
    pub fn data_sufficiency<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<SufficiencyReport> {
        let counts = source.interaction_counts()?;
        Ok(gate::evaluate(counts, &self.config.gate))
    }

    /// Category scores and the top three categories. Fails with `NotFound`
    /// for unknown users and `NoSurvey` for users without answers.
    pub fn user_preferences<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
        user_id: &str,
        today: Date,
    ) -> Result<PreferenceReport> {
        let profile = source
            .user_profile(user_id)?
            .ok_or_else(|| RecommendError::NotFound(user_id.to_string()))?;
        let answers = source.survey_answers(user_id)?;
        if answers.is_empty() {
            return Err(RecommendError::NoSurvey(user_id.to_string()));
        }
        let scores = analyze_preferences(
            &profile,
            &answers,
            &self.mapping,
            today,
            self.config.survey_answer_bonus,
        );
        Ok(PreferenceReport {
            user_id: user_id.to_string(),
            top_categories: scores.top(3),
            survey_answers_count: answers.len(),
            category_scores: scores,
            user_info: profile,
        })
    }

    fn cold_start<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
        profile: &UserProfile,
        today: Date,
    ) -> Result<(RecommendationPath, Vec<ScoredQuest>)> {
        let answers = source.survey_answers(&profile.id)?;
        let catalog = eligible(source)?;
        if answers.is_empty() {
            return Ok((RecommendationPath::DefaultSet, self.default_set(&catalog)));
        }
        let scores = analyze_preferences(
            profile,
            &answers,
            &self.mapping,
            today,
            self.config.survey_answer_bonus,
        );
        let ranked = score_quests(&catalog, &scores);
        Ok((
            RecommendationPath::ColdStart,
            select_diverse(&ranked, self.config.result_size),
        ))
    }

    /// Curated ids in configured order, restricted to eligible quests.
    fn default_set(&self, catalog: &[Quest]) -> Vec<ScoredQuest> {
        self.config
            .default_quest_ids
            .iter()
            .filter_map(|id| catalog.iter().find(|q| &q.id == id))
            .take(self.config.result_size)
            .map(|q| ScoredQuest::new(q.clone(), 0.0))
            .collect()
    }

    fn fallback<S: RecommendationSource + ?Sized>(&self, source: &S) -> Vec<ScoredQuest> {
        match eligible(source) {
            Ok(catalog) => self.default_set(&catalog),
            Err(e) => {
                tracing::error!("quest catalog unavailable, returning nothing: {e}");
                Vec::new()
            }
        }
    }

    fn finish<S: RecommendationSource + ?Sized>(
        &self,
        source: &S,
        user_id: &str,
        today: Date,
        path: RecommendationPath,
        gate: Option<SufficiencyReport>,
        quests: Vec<ScoredQuest>,
    ) -> Recommendation {
        let mut recommendation = Recommendation {
            user_id: user_id.to_string(),
            path,
            quests,
            gate,
            recorded: 0,
        };
        if recommendation.quests.is_empty() {
            tracing::warn!("no quests to recommend for {user_id} ({path})");
            return recommendation;
        }

        let ids = recommendation.quest_ids();
        match source.record_recommendations(user_id, &ids, today) {
            Ok(inserted) => recommendation.recorded = inserted,
            Err(e) => tracing::error!("failed to record recommendations for {user_id}: {e}"),
        }
        tracing::info!(
            "recommended {} quests to {user_id} via {path} ({} new log rows)",
            ids.len(),
            recommendation.recorded
        );
        recommendation
    }
}

/// The source's eligible catalog, re-checked so a lax source cannot leak
/// SURPRISE or inactive quests into results.
fn eligible<S: RecommendationSource + ?Sized>(source: &S) -> Result<Vec<Quest>> {
    Ok(source
        .eligible_quests()?
        .into_iter()
        .filter(Quest::is_eligible)
        .collect())
}

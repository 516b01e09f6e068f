//! Demographic + survey preference analysis for the cold-start path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mapping::SurveyMapping;
use crate::model::{Category, Quest, ScoredQuest, SurveyAnswer, UserProfile};
use crate::time::Date;

/// Order in which equally-scored categories are reported by
/// [`CategoryScores::top`].
pub const TIE_ORDER: [Category; 6] = [
    Category::Study,
    Category::Saving,
    Category::Econ,
    Category::Life,
    Category::Health,
    Category::Ent,
];

/// Per-category affinity. Every category is always present, starting at 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryScores(BTreeMap<Category, u32>);

impl CategoryScores {
    pub fn zero() -> Self {
        Self(Category::ALL.iter().map(|&c| (c, 0)).collect())
    }

    pub fn get(&self, category: Category) -> u32 {
        self.0.get(&category).copied().unwrap_or(0)
    }

    pub fn add(&mut self, category: Category, points: u32) {
        *self.0.entry(category).or_insert(0) += points;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.0.iter().map(|(&c, &s)| (c, s))
    }

    /// Highest-scoring categories. Ties follow [`TIE_ORDER`].
    pub fn top(&self, n: usize) -> Vec<(Category, u32)> {
        let mut ranked: Vec<(Category, u32)> =
            TIE_ORDER.iter().map(|&c| (c, self.get(c))).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl Default for CategoryScores {
    fn default() -> Self {
        Self::zero()
    }
}

/// Build the category score vector from age, grade, and survey answers.
///
/// Age ≤ 22 favours STUDY/ENT, 23–26 favours SAVING/STUDY/ECON, older users
/// get no age bonus. Grade 1–2 favours LIFE/ENT, higher grades
/// STUDY/SAVING/ECON. Each mapped survey answer adds `survey_bonus` to every
/// category it maps to.
pub fn analyze_preferences(
    profile: &UserProfile,
    answers: &[SurveyAnswer],
    mapping: &SurveyMapping,
    today: Date,
    survey_bonus: u32,
) -> CategoryScores {
    let mut scores = CategoryScores::zero();

    if let Some(age) = profile.age(today) {
        if age <= 22 {
            scores.add(Category::Study, 2);
            scores.add(Category::Ent, 1);
        } else if age <= 26 {
            scores.add(Category::Study, 1);
            scores.add(Category::Saving, 2);
            scores.add(Category::Econ, 1);
        }
    }

    // Grade 0 means the grade was never filled in.
    if let Some(grade) = profile.grade.filter(|&g| g != 0) {
        if grade <= 2 {
            scores.add(Category::Life, 1);
            scores.add(Category::Ent, 1);
        } else {
            scores.add(Category::Study, 1);
            scores.add(Category::Saving, 1);
            scores.add(Category::Econ, 1);
        }
    }

    for answer in answers {
        for &category in mapping.categories_for(answer.question_type, answer.option_order_no) {
            scores.add(category, survey_bonus);
        }
    }

    scores
}

/// Score each quest by its category's affinity and sort descending.
/// The sort is stable: equal scores keep catalog order.
pub fn score_quests(quests: &[Quest], scores: &CategoryScores) -> Vec<ScoredQuest> {
    let mut scored: Vec<ScoredQuest> = quests
        .iter()
        .map(|q| ScoredQuest::new(q.clone(), f64::from(scores.get(q.category))))
        .collect();
    scored.sort_by(|a, b| b.recommendation_score.total_cmp(&a.recommendation_score));
    scored
}

//! Survey answer → category mapping table.
//!
//! Two levels: a question's option ordinal resolves to an option key
//! (`campus`, `low_income`, ...), and `q{question_type}_{key}` resolves to
//! the categories that answer favours. Both levels are plain data so the
//! table can be replaced from configuration or synthesised in tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Category;
use crate::model::Category::{Econ, Ent, Health, Life, Saving, Study};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOptions {
    pub question_type: u8,
    /// Option keys in ordinal order; ordinal 1 is `options[0]`.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyMapping {
    pub questions: Vec<QuestionOptions>,
    pub categories: BTreeMap<String, Vec<Category>>,
}

impl SurveyMapping {
    pub fn empty() -> Self {
        Self {
            questions: Vec::new(),
            categories: BTreeMap::new(),
        }
    }

    /// Option key for `(question_type, ordinal)`, if the question and ordinal exist.
    pub fn option_key(&self, question_type: u8, ordinal: u8) -> Option<&str> {
        let index = usize::from(ordinal).checked_sub(1)?;
        self.questions
            .iter()
            .find(|q| q.question_type == question_type)
            .and_then(|q| q.options.get(index))
            .map(String::as_str)
    }

    /// Categories favoured by an answer. Unmapped answers favour nothing.
    pub fn categories_for(&self, question_type: u8, ordinal: u8) -> &[Category] {
        self.option_key(question_type, ordinal)
            .and_then(|key| self.categories.get(&format!("q{question_type}_{key}")))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Option keys that have no category entry. Such answers silently score
    /// nothing, which is usually a typo in an override table.
    pub fn unmapped_keys(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .questions
            .iter()
            .flat_map(|q| {
                q.options
                    .iter()
                    .map(move |key| format!("q{}_{key}", q.question_type))
            })
            .filter(|key| !self.categories.contains_key(key))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl Default for SurveyMapping {
    /// The production table for the twelve onboarding questions.
    fn default() -> Self {
        fn question(question_type: u8, options: &[&str]) -> QuestionOptions {
            QuestionOptions {
                question_type,
                options: options.iter().map(|s| s.to_string()).collect(),
            }
        }

        let questions = vec![
            // weekday activity pattern
            question(1, &["campus", "certification", "work", "irregular"]),
            // monthly income, two ordinals per bracket
            question(
                2,
                &[
                    "low_income",
                    "low_income",
                    "mid_income",
                    "mid_income",
                    "high_income",
                    "high_income",
                ],
            ),
            // spending habit
            question(3, &["planned", "discount", "minimal", "spontaneous", "tracking"]),
            // free time
            question(
                4,
                &["weekday_day", "weekday_evening", "weekend_day", "weekend_evening"],
            ),
            // information interest
            question(5, &["benefits", "convenience", "finance", "occasional"]),
            // goal style
            question(6, &["routine", "deadline", "flexible", "tracking"]),
            // exploration taste
            question(7, &["local", "events", "travel", "health"]),
            // content interest
            question(8, &["challenge", "community", "fortune", "insight"]),
            // saving goal
            question(9, &["emergency", "period_goal", "long_term", "habit"]),
            // deposit style
            question(10, &["auto", "flexible", "payday", "roundup", "adjustable"]),
            // likelihood of needing cash
            question(11, &["low", "medium", "high"]),
            // notification preference
            question(12, &["benefits", "ranking", "coaching", "minimal"]),
        ];

        let table: &[(&str, &[Category])] = &[
            ("q1_campus", &[Study, Ent]),
            ("q1_certification", &[Study]),
            ("q1_work", &[Econ, Saving]),
            ("q1_irregular", &[Life, Ent]),
            ("q2_low_income", &[Saving, Econ]),
            ("q2_mid_income", &[Saving, Study]),
            ("q2_high_income", &[Study, Health]),
            ("q3_planned", &[Saving, Econ]),
            ("q3_discount", &[Econ, Life]),
            ("q3_minimal", &[Saving]),
            ("q3_spontaneous", &[Life, Ent]),
            ("q3_tracking", &[Saving, Econ]),
            ("q4_weekday_day", &[Study, Health]),
            ("q4_weekday_evening", &[Life, Ent]),
            ("q4_weekend_day", &[Health, Life]),
            ("q4_weekend_evening", &[Ent, Life]),
            ("q5_benefits", &[Life, Econ]),
            ("q5_convenience", &[Econ, Life]),
            ("q5_finance", &[Saving, Econ]),
            ("q5_occasional", &[Ent, Life]),
            ("q6_routine", &[Health, Saving]),
            ("q6_deadline", &[Study]),
            ("q6_flexible", &[Life, Ent]),
            ("q6_tracking", &[Saving, Study]),
            ("q7_local", &[Life]),
            ("q7_events", &[Ent]),
            ("q7_travel", &[Life]),
            ("q7_health", &[Health]),
            ("q8_challenge", &[Study, Health]),
            ("q8_community", &[Ent, Life]),
            ("q8_fortune", &[Ent]),
            ("q8_insight", &[Study, Econ]),
            ("q9_emergency", &[Saving]),
            ("q9_period_goal", &[Saving, Study]),
            ("q9_long_term", &[Saving]),
            ("q9_habit", &[Saving]),
            ("q10_auto", &[Saving]),
            ("q10_flexible", &[Saving]),
            ("q10_payday", &[Saving]),
            ("q10_roundup", &[Saving]),
            ("q10_adjustable", &[Saving]),
            ("q11_low", &[Saving]),
            ("q11_medium", &[Saving, Econ]),
            ("q11_high", &[Econ, Life]),
            ("q12_benefits", &[Life, Econ]),
            ("q12_ranking", &[Study, Health]),
            ("q12_coaching", &[Saving, Econ]),
            ("q12_minimal", &[Life]),
        ];

        let categories = table
            .iter()
            .map(|(key, cats)| (key.to_string(), cats.to_vec()))
            .collect();

        Self {
            questions,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_complete() {
        let mapping = SurveyMapping::default();
        assert_eq!(mapping.questions.len(), 12);
        assert!(mapping.unmapped_keys().is_empty(), "{:?}", mapping.unmapped_keys());
    }

    #[test]
    fn test_categories_for_known_answer() {
        let mapping = SurveyMapping::default();
        assert_eq!(mapping.categories_for(1, 1), &[Study, Ent]);
        // Q2 ordinals 3 and 4 share a bracket
        assert_eq!(mapping.categories_for(2, 3), mapping.categories_for(2, 4));
        assert_eq!(mapping.categories_for(2, 4), &[Saving, Study]);
    }

    #[test]
    fn test_unmapped_answers_favour_nothing() {
        let mapping = SurveyMapping::default();
        assert!(mapping.categories_for(1, 0).is_empty());
        assert!(mapping.categories_for(1, 9).is_empty());
        assert!(mapping.categories_for(13, 1).is_empty());
        assert!(mapping.categories_for(0, 1).is_empty());
    }

    #[test]
    fn test_unmapped_keys_reports_missing_entries() {
        let mut mapping = SurveyMapping::empty();
        mapping.questions.push(QuestionOptions {
            question_type: 1,
            options: vec!["a".into(), "b".into()],
        });
        mapping.categories.insert("q1_a".into(), vec![Study]);
        assert_eq!(mapping.unmapped_keys(), vec!["q1_b".to_string()]);
        assert!(mapping.categories_for(1, 2).is_empty());
    }

    #[test]
    fn test_table_loads_from_toml() {
        let src = r#"
            [[questions]]
            question_type = 1
            options = ["gym", "library"]

            [categories]
            q1_gym = ["HEALTH"]
            q1_library = ["STUDY", "ENT"]
        "#;
        let mapping: SurveyMapping = toml::from_str(src).unwrap();
        assert_eq!(mapping.categories_for(1, 1), &[Health]);
        assert_eq!(mapping.categories_for(1, 2), &[Study, Ent]);
    }
}

//! Synthetic data for local runs: a quest catalog, users with and without
//! survey answers, and a recommendation log with click/clear flags shaped
//! by each user's favourite category.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use quest_core::{
    Category, Date, Gender, PeriodScope, Quest, QuestType, RecommendationRecord, SurveyAnswer,
    SurveyMapping, UserProfile, VerifyMethod,
};
use quest_store::Dataset;
use quest_store::dataset::DATASET_VERSION;

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub users: usize,
    pub quests: usize,
    pub days: i64,
    /// Quests shown per active user per day.
    pub per_day: usize,
    pub seed: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            users: 200,
            quests: 40,
            days: 30,
            per_day: 3,
            seed: 42,
        }
    }
}

const SURVEY_RATE: f64 = 0.7;
const DAILY_ACTIVITY: f64 = 0.5;
const FAVOURITE_BIAS: f64 = 0.6;
const CLICK_RATE: f64 = 0.35;
const CLEAR_RATE: f64 = 0.6;

/// Catalog entry `i`. Every tenth quest is SURPRISE, the rest alternate
/// GROWTH/LIFE, so the curated defaults (`quest_growth_008`,
/// `quest_growth_012`, `quest_daily_017`) exist once 18 quests are generated.
pub fn catalog_quest(i: usize) -> Quest {
    let quest_type = if i % 10 == 9 {
        QuestType::Surprise
    } else if i % 2 == 0 {
        QuestType::Growth
    } else {
        QuestType::Life
    };
    let prefix = match quest_type {
        QuestType::Growth => "growth",
        QuestType::Life => "daily",
        QuestType::Surprise => "surprise",
    };
    let category = Category::ALL[i % Category::ALL.len()];
    Quest {
        id: format!("quest_{prefix}_{i:03}"),
        quest_type,
        title: format!("{} {} #{i}", category.as_str().to_lowercase(), prefix),
        category,
        verify_method: VerifyMethod::ALL[i % VerifyMethod::ALL.len()],
        reward_exp: 10 + (i as u32 * 7) % 90,
        target_count: 1 + (i as u32 * 3) % 30,
        period_scope: PeriodScope::ALL[i % PeriodScope::ALL.len()],
        active: i % 13 != 11,
    }
}

pub fn generate(options: &SeedOptions, mapping: &SurveyMapping, today: Date) -> Dataset {
    let mut rng = SmallRng::seed_from_u64(options.seed);
    let quests: Vec<Quest> = (0..options.quests).map(catalog_quest).collect();
    let eligible: Vec<&Quest> = quests.iter().filter(|q| q.is_eligible()).collect();

    let mut users = Vec::with_capacity(options.users);
    let mut survey_answers = Vec::new();
    let mut recommendations = Vec::new();

    for n in 0..options.users {
        let user = random_user(&mut rng, n, today);

        if rng.random_bool(SURVEY_RATE) {
            for question in &mapping.questions {
                if question.options.is_empty() {
                    continue;
                }
                let ordinal = rng.random_range(1..=question.options.len()) as u8;
                survey_answers.push(SurveyAnswer {
                    user_id: user.id.clone(),
                    question_id: Some(format!("q{}", question.question_type)),
                    question_type: question.question_type,
                    option_order_no: ordinal,
                });
            }
        }

        if !eligible.is_empty() {
            let favourite = Category::ALL[rng.random_range(0..Category::ALL.len())];
            let preferred: Vec<&Quest> = eligible
                .iter()
                .copied()
                .filter(|q| q.category == favourite)
                .collect();

            for back in (1..=options.days).rev() {
                if !rng.random_bool(DAILY_ACTIVITY) {
                    continue;
                }
                let date = today.minus_days(back);
                let mut shown: Vec<&str> = Vec::with_capacity(options.per_day);
                for _ in 0..options.per_day {
                    let pool = if !preferred.is_empty() && rng.random_bool(FAVOURITE_BIAS) {
                        &preferred
                    } else {
                        &eligible
                    };
                    let quest = pool[rng.random_range(0..pool.len())];
                    if shown.contains(&quest.id.as_str()) {
                        continue;
                    }
                    shown.push(&quest.id);

                    let liked = quest.category == favourite;
                    let click_rate = if liked { CLICK_RATE * 2.0 } else { CLICK_RATE };
                    let is_click = rng.random_bool(click_rate.min(1.0));
                    let is_cleared = is_click && rng.random_bool(CLEAR_RATE);
                    recommendations.push(RecommendationRecord {
                        id: format!("seed-{}-{}-{date}", user.id, quest.id),
                        user_id: user.id.clone(),
                        quest_id: quest.id.clone(),
                        recommendation_date: date,
                        is_click,
                        is_cleared,
                    });
                }
            }
        }

        users.push(user);
    }

    Dataset {
        version: DATASET_VERSION,
        users,
        survey_answers,
        quests,
        recommendations,
    }
}

fn random_user(rng: &mut SmallRng, n: usize, today: Date) -> UserProfile {
    let mut user = UserProfile::new(format!("user_{n:04}"));
    user.gender = Some(Gender::ALL[rng.random_range(0..Gender::ALL.len())]);
    user.birth_year = Some((today.year() - rng.random_range(19..=30)) as i32);
    user.grade = Some(rng.random_range(1..=4));
    user.school_id = Some(rng.random_range(1..=20));
    user
}

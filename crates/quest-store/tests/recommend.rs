//! The engine running against a real SQLite store.

use quest_core::{
    Category, Date, GateThresholds, PeriodScope, Quest, QuestType, RecommendError,
    RecommendationPath, RecommendationRecord, Recommender, RecommenderConfig, SurveyAnswer,
    SurveyMapping, UserProfile, VerifyMethod,
};
use quest_store::Store;
use quest_store::store::Table;

fn today() -> Date {
    Date::from_ymd(2026, 3, 15).unwrap()
}

fn quest(id: &str, category: Category, quest_type: QuestType) -> Quest {
    Quest {
        id: id.into(),
        quest_type,
        title: id.replace('_', " "),
        category,
        verify_method: VerifyMethod::Attendance,
        reward_exp: 60,
        target_count: 3,
        period_scope: PeriodScope::Weekly,
        active: true,
    }
}

fn seeded_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    for q in [
        quest("quest_growth_008", Category::Study, QuestType::Growth),
        quest("quest_growth_012", Category::Health, QuestType::Growth),
        quest("quest_daily_017", Category::Life, QuestType::Life),
        quest("budget", Category::Econ, QuestType::Life),
        quest("piggy", Category::Saving, QuestType::Growth),
        quest("festival", Category::Ent, QuestType::Surprise),
    ] {
        store.upsert_quest(&q).unwrap();
    }
    store
}

#[test]
fn unknown_user_is_reported() {
    let store = seeded_store();
    let err = Recommender::default()
        .recommend(&store, "ghost", today())
        .unwrap_err();
    assert!(matches!(err, RecommendError::NotFound(_)));
    assert_eq!(store.table_count(Table::Recommendations).unwrap(), 0);
}

#[test]
fn survey_user_gets_diverse_cold_start_and_log_rows() {
    let store = seeded_store();
    store.upsert_user(&UserProfile::new("u1")).unwrap();
    store
        .replace_survey_answers(
            "u1",
            &[SurveyAnswer {
                user_id: "u1".into(),
                question_id: None,
                question_type: 9,
                option_order_no: 1,
            }],
        )
        .unwrap();

    let recommender = Recommender::default();
    let rec = recommender.recommend_detailed(&store, "u1", today()).unwrap();
    assert_eq!(rec.path, RecommendationPath::ColdStart);
    assert_eq!(rec.quests.len(), 3);
    assert_eq!(rec.recorded, 3);
    assert!(!rec.quest_ids().contains(&"festival".to_string()));

    let again = recommender.recommend_detailed(&store, "u1", today()).unwrap();
    assert_eq!(again.recorded, 0);
    assert_eq!(store.table_count(Table::Recommendations).unwrap(), 3);
}

#[test]
fn no_survey_user_gets_default_set() {
    let store = seeded_store();
    store.upsert_user(&UserProfile::new("u1")).unwrap();
    let ids = Recommender::default()
        .recommend(&store, "u1", today())
        .unwrap();
    assert_eq!(
        ids,
        vec!["quest_growth_008", "quest_growth_012", "quest_daily_017"]
    );
}

#[test]
fn hybrid_runs_once_the_gate_opens() {
    let store = seeded_store();
    for user in ["me", "n1", "n2"] {
        store.upsert_user(&UserProfile::new(user)).unwrap();
    }
    let day = today().minus_days(10);
    let mut n = 0;
    let mut log = |user: &str, quest: &str, click: bool, cleared: bool| {
        n += 1;
        store
            .insert_interaction(&RecommendationRecord {
                id: format!("seed-{n}"),
                user_id: user.into(),
                quest_id: quest.into(),
                recommendation_date: day,
                is_click: click,
                is_cleared: cleared,
            })
            .unwrap();
    };
    log("me", "budget", true, false);
    log("n1", "budget", true, false);
    log("n2", "budget", true, false);
    log("n1", "piggy", true, true);
    log("n2", "piggy", true, true);

    let config = RecommenderConfig {
        gate: GateThresholds {
            min_total_interactions: 5,
            min_active_users: 3,
            min_active_quests: 2,
            min_avg_interactions_per_user: 1.5,
        },
        ..RecommenderConfig::default()
    };
    let recommender = Recommender::new(config, SurveyMapping::default());
    let report = recommender.data_sufficiency(&store).unwrap();
    assert!(report.is_sufficient);
    assert_eq!(report.requirements_label(), "4/4");

    let rec = recommender.recommend_detailed(&store, "me", today()).unwrap();
    assert_eq!(rec.path, RecommendationPath::Hybrid);
    assert_eq!(rec.quest_ids()[0], "piggy");
    assert_eq!(rec.quests.len(), 3);
}

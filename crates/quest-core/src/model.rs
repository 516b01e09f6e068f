//! Typed snapshots of the collaborator data the engine reads.
//!
//! Everything here is validated at the collaborator boundary: enum values are
//! parsed once when a row is loaded, optional profile fields are `Option`s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::time::Date;

/// Returned when a stored enum value is not one the engine knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a closed string enum: upper-case canonical names, case-insensitive
/// parsing, serde through the canonical name.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, [$($variant:ident => $text:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == upper)
                    .ok_or_else(|| UnknownVariant { kind: $kind, value: s.to_string() })
            }
        }
    };
}

string_enum!(
    /// SURPRISE quests are delivered outside the recommender and never recommended.
    QuestType,
    "quest type",
    [Life => "LIFE", Growth => "GROWTH", Surprise => "SURPRISE"]
);

string_enum!(
    Category,
    "quest category",
    [
        Study => "STUDY",
        Health => "HEALTH",
        Econ => "ECON",
        Life => "LIFE",
        Ent => "ENT",
        Saving => "SAVING",
    ]
);

string_enum!(
    VerifyMethod,
    "verify method",
    [
        Gps => "GPS",
        Steps => "STEPS",
        Link => "LINK",
        Upload => "UPLOAD",
        Payment => "PAYMENT",
        Attendance => "ATTENDANCE",
        Certification => "CERTIFICATION",
        Contest => "CONTEST",
    ]
);

string_enum!(
    PeriodScope,
    "period scope",
    [Any => "ANY", Daily => "DAILY", Weekly => "WEEKLY", Monthly => "MONTHLY"]
);

string_enum!(Gender, "gender", [M => "M", F => "F", X => "X"]);

impl QuestType {
    pub fn is_recommendable(self) -> bool {
        matches!(self, QuestType::Life | QuestType::Growth)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub school_id: Option<i64>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub grade: Option<i32>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            gender: None,
            birth_year: None,
            school_id: None,
            department: None,
            grade: None,
        }
    }

    /// Age in whole years as of `today`, if a birth year is recorded.
    pub fn age(&self, today: Date) -> Option<i64> {
        self.birth_year.map(|y| today.year() - i64::from(y))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswer {
    pub user_id: String,
    #[serde(default)]
    pub question_id: Option<String>,
    /// 1..=12
    pub question_type: u8,
    /// 1-based option position within the question.
    pub option_order_no: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    #[serde(rename = "type")]
    pub quest_type: QuestType,
    #[serde(default)]
    pub title: String,
    pub category: Category,
    pub verify_method: VerifyMethod,
    pub reward_exp: u32,
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    pub period_scope: PeriodScope,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_target_count() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl Quest {
    /// Active LIFE or GROWTH quest.
    pub fn is_eligible(&self) -> bool {
        self.active && self.quest_type.is_recommendable()
    }
}

/// One row of the append-only recommendation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub user_id: String,
    pub quest_id: String,
    pub recommendation_date: Date,
    pub is_click: bool,
    pub is_cleared: bool,
}

/// The interaction-relevant projection of a `RecommendationRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub quest_id: String,
    pub recommendation_date: Date,
    pub is_click: bool,
    pub is_cleared: bool,
}

impl Interaction {
    /// True when the user clicked or cleared the recommended quest.
    pub fn is_engaged(&self) -> bool {
        self.is_click || self.is_cleared
    }

    /// `click_weight * click + clear_weight * cleared`.
    pub fn weight(&self, click_weight: f64, clear_weight: f64) -> f64 {
        let click = if self.is_click { click_weight } else { 0.0 };
        let clear = if self.is_cleared { clear_weight } else { 0.0 };
        click + clear
    }
}

impl From<RecommendationRecord> for Interaction {
    fn from(r: RecommendationRecord) -> Self {
        Self {
            user_id: r.user_id,
            quest_id: r.quest_id,
            recommendation_date: r.recommendation_date,
            is_click: r.is_click,
            is_cleared: r.is_cleared,
        }
    }
}

/// A candidate quest with the score the active path assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuest {
    #[serde(flatten)]
    pub quest: Quest,
    pub recommendation_score: f64,
}

impl ScoredQuest {
    pub fn new(quest: Quest, recommendation_score: f64) -> Self {
        Self {
            quest,
            recommendation_score,
        }
    }
}

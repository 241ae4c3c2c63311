use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scores strictly below this value fail the subject.
pub const PASS_MARK: i32 = 33;

/// Lowest and highest score a subject can carry.
pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// A subject that can appear on a result sheet.
///
/// Declaration order is the canonical subject order: it drives the order of
/// `failed_subjects` and the column order of exports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Bangla,
    English,
    Mathematics,
    Science,
    #[serde(rename = "BGS")]
    Bgs,
    #[serde(rename = "ICT")]
    Ict,
    Religion,
    ArtsAndCrafts,
    PhysicalEdu,
    HomeScience,
    AgriculturalStudies,
    HigherMath,
    Physics,
    Chemistry,
    Biology,
    Accounting,
    FinanceBanking,
    BusinessStudies,
    Civics,
    History,
    Geography,
    Economics,
}

impl Subject {
    pub const COUNT: usize = 22;

    /// Every subject in canonical order.
    pub const ALL: [Subject; Self::COUNT] = [
        Self::Bangla,
        Self::English,
        Self::Mathematics,
        Self::Science,
        Self::Bgs,
        Self::Ict,
        Self::Religion,
        Self::ArtsAndCrafts,
        Self::PhysicalEdu,
        Self::HomeScience,
        Self::AgriculturalStudies,
        Self::HigherMath,
        Self::Physics,
        Self::Chemistry,
        Self::Biology,
        Self::Accounting,
        Self::FinanceBanking,
        Self::BusinessStudies,
        Self::Civics,
        Self::History,
        Self::Geography,
        Self::Economics,
    ];

    /// Position of this subject in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Field name used in JSON bodies and spreadsheet headers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bangla => "Bangla",
            Self::English => "English",
            Self::Mathematics => "Mathematics",
            Self::Science => "Science",
            Self::Bgs => "BGS",
            Self::Ict => "ICT",
            Self::Religion => "Religion",
            Self::ArtsAndCrafts => "ArtsAndCrafts",
            Self::PhysicalEdu => "PhysicalEdu",
            Self::HomeScience => "HomeScience",
            Self::AgriculturalStudies => "AgriculturalStudies",
            Self::HigherMath => "HigherMath",
            Self::Physics => "Physics",
            Self::Chemistry => "Chemistry",
            Self::Biology => "Biology",
            Self::Accounting => "Accounting",
            Self::FinanceBanking => "FinanceBanking",
            Self::BusinessStudies => "BusinessStudies",
            Self::Civics => "Civics",
            Self::History => "History",
            Self::Geography => "Geography",
            Self::Economics => "Economics",
        }
    }

    /// Case-insensitive lookup by field name, ignoring surrounding whitespace.
    pub fn from_field_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unknown subject name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown subject '{0}'")]
pub struct UnknownSubject(pub String);

impl FromStr for Subject {
    type Err = UnknownSubject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_field_name(s).ok_or_else(|| UnknownSubject(s.to_string()))
    }
}

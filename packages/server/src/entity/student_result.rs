use common::{Subject, SubjectScores};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A published result sheet for one student in one class, section and year.
///
/// `(roll, class, section, year)` identifies the student but is not unique:
/// re-importing a sheet creates new rows.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_result")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub student_name: String,
    pub roll: String,
    #[sea_orm(column_name = "class")]
    #[serde(rename = "class")]
    pub class_name: String,
    pub section: String,
    pub year: String,

    pub bangla: Option<i32>,
    pub english: Option<i32>,
    pub mathematics: Option<i32>,
    pub science: Option<i32>,
    pub bgs: Option<i32>,
    pub ict: Option<i32>,
    pub religion: Option<i32>,
    pub arts_and_crafts: Option<i32>,
    pub physical_edu: Option<i32>,
    pub home_science: Option<i32>,
    pub agricultural_studies: Option<i32>,
    pub higher_math: Option<i32>,
    pub physics: Option<i32>,
    pub chemistry: Option<i32>,
    pub biology: Option<i32>,
    pub accounting: Option<i32>,
    pub finance_banking: Option<i32>,
    pub business_studies: Option<i32>,
    pub civics: Option<i32>,
    pub history: Option<i32>,
    pub geography: Option<i32>,
    pub economics: Option<i32>,

    pub total_marks: i32,
    pub merit_position: Option<i32>,
    /// Comma-joined subject names in canonical order.
    pub failed_subjects: String,
    pub publish_date: Date,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Subject scores in canonical order.
    pub fn scores(&self) -> SubjectScores {
        let mut scores = SubjectScores::new();
        for subject in Subject::ALL {
            if let sea_orm::Value::Int(score) = self.get(score_column(subject)) {
                scores.set(subject, score);
            }
        }
        scores
    }
}

/// Column holding the score for `subject`.
pub fn score_column(subject: Subject) -> Column {
    match subject {
        Subject::Bangla => Column::Bangla,
        Subject::English => Column::English,
        Subject::Mathematics => Column::Mathematics,
        Subject::Science => Column::Science,
        Subject::Bgs => Column::Bgs,
        Subject::Ict => Column::Ict,
        Subject::Religion => Column::Religion,
        Subject::ArtsAndCrafts => Column::ArtsAndCrafts,
        Subject::PhysicalEdu => Column::PhysicalEdu,
        Subject::HomeScience => Column::HomeScience,
        Subject::AgriculturalStudies => Column::AgriculturalStudies,
        Subject::HigherMath => Column::HigherMath,
        Subject::Physics => Column::Physics,
        Subject::Chemistry => Column::Chemistry,
        Subject::Biology => Column::Biology,
        Subject::Accounting => Column::Accounting,
        Subject::FinanceBanking => Column::FinanceBanking,
        Subject::BusinessStudies => Column::BusinessStudies,
        Subject::Civics => Column::Civics,
        Subject::History => Column::History,
        Subject::Geography => Column::Geography,
        Subject::Economics => Column::Economics,
    }
}

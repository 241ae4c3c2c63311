use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use common::{DerivedResult, Subject, SubjectScores};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Value};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::student_result;

/// A stored result record.
///
/// Subject scores use their canonical names and are `null` when not taken.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Nusrat Jahan")]
    pub student_name: String,
    #[schema(example = "12")]
    pub roll: String,
    #[schema(example = "10")]
    pub class: String,
    #[schema(example = "A")]
    pub section: String,
    #[schema(example = "2024")]
    pub year: String,
    /// Every subject by canonical name, `null` when not taken.
    #[serde(flatten)]
    #[schema(value_type = BTreeMap<String, Option<i32>>)]
    pub scores: SubjectScores,
    /// Sum of every present subject score.
    #[schema(example = 90)]
    pub total_marks: i32,
    /// Externally assigned rank, never computed here.
    pub merit_position: Option<i32>,
    /// Comma-joined names of subjects scored below 33.
    #[schema(example = "Bangla")]
    pub failed_subjects: String,
    pub publish_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<student_result::Model> for ResultResponse {
    fn from(m: student_result::Model) -> Self {
        Self {
            scores: m.scores(),
            id: m.id,
            student_name: m.student_name,
            roll: m.roll,
            class: m.class_name,
            section: m.section,
            year: m.year,
            total_marks: m.total_marks,
            merit_position: m.merit_position,
            failed_subjects: m.failed_subjects,
            publish_date: m.publish_date,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Copy a derived result into an active model, every column included.
pub fn apply_derived(active: &mut student_result::ActiveModel, d: DerivedResult) {
    active.student_name = Set(d.student_name);
    active.roll = Set(d.roll);
    active.class_name = Set(d.class);
    active.section = Set(d.section);
    active.year = Set(d.year);
    for subject in Subject::ALL {
        active.set(
            student_result::score_column(subject),
            Value::Int(d.scores.get(subject)),
        );
    }
    active.total_marks = Set(d.total_marks);
    active.merit_position = Set(d.merit_position);
    active.failed_subjects = Set(d.failed_subjects);
    active.publish_date = Set(d.publish_date);
}

/// Active model for a new record created at `now`.
pub fn new_result(d: DerivedResult, now: DateTime<Utc>) -> student_result::ActiveModel {
    let mut active = student_result::ActiveModel {
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    apply_derived(&mut active, d);
    active
}

/// Outcome of a bulk insert or spreadsheet import.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResponse {
    /// Rows stored.
    #[schema(example = 48)]
    pub inserted_count: usize,
    /// Rows that could not be stored.
    pub failed_rows: Vec<FailedRow>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedRow {
    /// Zero-based index into the submitted rows.
    #[schema(example = 3)]
    pub row: usize,
    #[schema(example = "Missing required field 'roll'")]
    pub message: String,
}

/// Query for the exact-identifier lookup. All four fields are required.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdentifierQuery {
    pub roll: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
    pub year: Option<String>,
}

/// Query for the flexible search. Any subset of fields may be given.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the student name.
    pub student_name: Option<String>,
    pub roll: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassYearQuery {
    pub class: Option<String>,
    pub year: Option<String>,
}

/// Body for the strict search. Every field must match exactly.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StrictSearchRequest {
    #[schema(example = "Nusrat Jahan")]
    pub student_name: Option<String>,
    #[schema(example = "12")]
    pub roll: Option<String>,
    #[schema(example = "10")]
    pub class: Option<String>,
    #[schema(example = "A")]
    pub section: Option<String>,
    #[schema(example = "2024")]
    pub year: Option<String>,
    #[schema(example = "2024-06-30")]
    pub publish_date: Option<String>,
}

/// Every record nested as `class -> section -> year -> [records]`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<ResultResponse>>>>)]
pub struct GroupedSummaryResponse(
    pub common::grouping::ClassSectionYear<ResultResponse>,
);

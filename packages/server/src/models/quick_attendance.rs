use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

/// Head counts for a section on one day.
///
/// Fields are optional so that missing values surface as validation errors
/// rather than deserialization failures.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuickAttendanceRequest {
    #[schema(example = 5)]
    pub section_id: Option<i32>,
    #[schema(example = 18)]
    pub male_count: Option<i32>,
    #[schema(example = 21)]
    pub female_count: Option<i32>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp; only the calendar day is kept.
    /// Defaults to today.
    #[schema(example = "2024-05-01")]
    pub attendance_date: Option<String>,
    /// Defaults to the authenticated caller.
    pub recorded_by: Option<i32>,
}

/// Validated head counts.
pub struct QuickCounts {
    pub section_id: i32,
    pub male_count: i32,
    pub female_count: i32,
}

pub fn validate_quick_attendance(req: &QuickAttendanceRequest) -> Result<QuickCounts, AppError> {
    let section_id = req
        .section_id
        .ok_or_else(|| AppError::Validation("Section ID is required".into()))?;
    let (Some(male_count), Some(female_count)) = (req.male_count, req.female_count) else {
        return Err(AppError::Validation(
            "Both male count and female count are required".into(),
        ));
    };
    if male_count < 0 || female_count < 0 {
        return Err(AppError::Validation("Counts must not be negative".into()));
    }
    if male_count == 0 && female_count == 0 {
        return Err(AppError::Validation(
            "At least one of male count and female count must be positive".into(),
        ));
    }
    Ok(QuickCounts {
        section_id,
        male_count,
        female_count,
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuickAttendanceResponse {
    pub id: i32,
    pub section_id: i32,
    pub attendance_date: NaiveDate,
    pub male_count: i32,
    pub female_count: i32,
    pub recorded_by: i32,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::quick_attendance::Model> for QuickAttendanceResponse {
    fn from(m: crate::entity::quick_attendance::Model) -> Self {
        Self {
            id: m.id,
            section_id: m.section_id,
            attendance_date: m.attendance_date,
            male_count: m.male_count,
            female_count: m.female_count,
            recorded_by: m.recorded_by,
            created_at: m.created_at,
        }
    }
}

/// Report filters. Every filter is optional and they combine with AND.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct QuickReportQuery {
    /// Exact day, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    pub section_id: Option<i32>,
    pub class_id: Option<i32>,
    /// User who recorded the entry.
    pub teacher_id: Option<i32>,
}

/// A report row with section, class and teacher names resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuickReportRow {
    pub id: i32,
    pub section_id: i32,
    pub section_name: String,
    pub class_id: i32,
    pub class_name: String,
    pub attendance_date: NaiveDate,
    pub male_count: i32,
    pub female_count: i32,
    pub recorded_by: i32,
    /// Full name of the recorder, falling back to the username.
    pub teacher_name: String,
}

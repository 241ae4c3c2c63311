use chrono::{DateTime, NaiveDate, Utc};
use common::{AttendanceStatus, AttendanceTally};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::AppError;

/// One student's attendance for one day.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordAttendanceRequest {
    #[schema(example = 17)]
    pub student_id: i32,
    /// `YYYY-MM-DD`; defaults to today.
    #[schema(example = "2024-05-01")]
    pub attendance_date: Option<String>,
    /// One of `present`, `absent`, `late`, `excused`.
    #[schema(example = "present")]
    pub status: String,
    /// Defaults to the authenticated caller.
    pub recorded_by: Option<i32>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkRecordRequest {
    pub attendance_data: Vec<RecordAttendanceRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkRecordResponse {
    /// Rows inserted or overwritten.
    #[schema(example = 32)]
    pub affected: u64,
}

/// Full replacement of an entry's status and remarks.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceRequest {
    #[schema(example = "late")]
    pub status: String,
    pub remarks: Option<String>,
}

/// An attendance entry with the student and section it belongs to.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceResponse {
    pub id: i32,
    pub student_id: i32,
    pub student_name: String,
    pub section_id: i32,
    pub section_name: String,
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub recorded_by: i32,
    pub recorded_by_name: Option<String>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SectionDayQuery {
    /// Restrict to one day, `YYYY-MM-DD`.
    pub date: Option<String>,
}

/// One student's counts in a section report.
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentTallyRow {
    pub student_id: i32,
    pub student_name: String,
    pub roll: Option<String>,
    #[serde(flatten)]
    pub tally: AttendanceTally,
}

pub fn parse_status(status: &str) -> Result<AttendanceStatus, AppError> {
    status
        .parse::<AttendanceStatus>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

pub fn validate_remarks(remarks: Option<&str>) -> Result<(), AppError> {
    if let Some(r) = remarks
        && r.chars().count() > 500
    {
        return Err(AppError::Validation(
            "Remarks must be at most 500 characters".into(),
        ));
    }
    Ok(())
}

use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::dates::parse_calendar_date;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{class, quick_attendance, section, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::user::ensure_users_exist;
use crate::models::quick_attendance::*;
use crate::models::shared::parse_optional_date;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/quick",
    tag = "Quick Attendance",
    operation_id = "recordQuickAttendance",
    summary = "Record head counts for a section",
    description = "Stores male and female head counts for one section on one day. A second record for the same section and day is rejected with `DUPLICATE_ATTENDANCE` and leaves the first untouched. `attendanceDate` defaults to today and `recordedBy` to the caller; an unknown `recordedBy` is a validation error. Requires `attendance:record` permission.",
    request_body = QuickAttendanceRequest,
    responses(
        (status = 201, description = "Entry stored", body = QuickAttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR) or already recorded (DUPLICATE_ATTENDANCE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(section_id = ?payload.section_id))]
pub async fn record_quick_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<QuickAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("attendance:record")?;

    let counts = validate_quick_attendance(&payload)?;
    let date = match payload.attendance_date.as_deref().map(str::trim) {
        None | Some("") => Utc::now().date_naive(),
        Some(text) => parse_calendar_date(text).ok_or_else(|| {
            AppError::Validation("attendanceDate must be YYYY-MM-DD or an RFC 3339 timestamp".into())
        })?,
    };

    section::Entity::find_by_id(counts.section_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Section not found".into()))?;
    let recorder = payload.recorded_by.filter(|&id| id != auth_user.user_id);
    ensure_users_exist(&state.db, recorder.into_iter().collect(), "recorder").await?;

    let model = quick_attendance::ActiveModel {
        section_id: Set(counts.section_id),
        attendance_date: Set(date),
        male_count: Set(counts.male_count),
        female_count: Set(counts.female_count),
        recorded_by: Set(payload.recorded_by.unwrap_or(auth_user.user_id)),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    // The unique (section_id, attendance_date) index makes this insert-if-absent atomic.
    let result = quick_attendance::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                quick_attendance::Column::SectionId,
                quick_attendance::Column::AttendanceDate,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {
            tracing::info!(%date, "Quick attendance already recorded");
            return Err(AppError::DuplicateAttendance);
        }
        Ok(_) => {}
        Err(e) => return Err(e.into()),
    }

    let stored = quick_attendance::Entity::find()
        .filter(quick_attendance::Column::SectionId.eq(counts.section_id))
        .filter(quick_attendance::Column::AttendanceDate.eq(date))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Inserted quick attendance row not found".into()))?;

    Ok((StatusCode::CREATED, Json(QuickAttendanceResponse::from(stored))))
}

#[utoipa::path(
    get,
    path = "/quick",
    tag = "Quick Attendance",
    operation_id = "listQuickAttendance",
    summary = "Every quick attendance entry",
    description = "Entries newest day first. Requires `attendance:view` or `attendance:record` permission.",
    responses(
        (status = 200, description = "Entries", body = Vec<QuickAttendanceResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_quick_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuickAttendanceResponse>>, AppError> {
    auth_user.require_any_permission(&["attendance:view", "attendance:record"])?;

    let entries = quick_attendance::Entity::find()
        .order_by_desc(quick_attendance::Column::AttendanceDate)
        .order_by_desc(quick_attendance::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/report",
    tag = "Quick Attendance",
    operation_id = "quickAttendanceReport",
    summary = "Filtered quick attendance report",
    description = "Filters combine with AND; none returns every entry. A lone `startDate` or `endDate` is an open-ended bound. `teacherId` matches the recorder. Rows carry section, class and teacher names and are ordered newest day first. Requires `attendance:view` or `attendance:record` permission.",
    params(QuickReportQuery),
    responses(
        (status = 200, description = "Report rows, possibly empty", body = Vec<QuickReportRow>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn quick_report(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<QuickReportQuery>,
) -> Result<Json<Vec<QuickReportRow>>, AppError> {
    auth_user.require_any_permission(&["attendance:view", "attendance:record"])?;

    let date = parse_optional_date(query.date.as_deref(), "date")?;
    let start = parse_optional_date(query.start_date.as_deref(), "startDate")?;
    let end = parse_optional_date(query.end_date.as_deref(), "endDate")?;

    let mut select = quick_attendance::Entity::find();
    if let Some(date) = date {
        select = select.filter(quick_attendance::Column::AttendanceDate.eq(date));
    }
    if let Some(start) = start {
        select = select.filter(quick_attendance::Column::AttendanceDate.gte(start));
    }
    if let Some(end) = end {
        select = select.filter(quick_attendance::Column::AttendanceDate.lte(end));
    }
    if let Some(section_id) = query.section_id {
        select = select.filter(quick_attendance::Column::SectionId.eq(section_id));
    }
    if let Some(class_id) = query.class_id {
        let section_ids: Vec<i32> = section::Entity::find()
            .filter(section::Column::ClassId.eq(class_id))
            .select_only()
            .column(section::Column::Id)
            .into_tuple::<i32>()
            .all(&state.db)
            .await?;
        select = select.filter(quick_attendance::Column::SectionId.is_in(section_ids));
    }
    if let Some(teacher_id) = query.teacher_id {
        select = select.filter(quick_attendance::Column::RecordedBy.eq(teacher_id));
    }

    let entries = select
        .order_by_desc(quick_attendance::Column::AttendanceDate)
        .order_by_desc(quick_attendance::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(report_rows(&state.db, entries).await?))
}

/// Attach section, class and teacher names to each entry.
async fn report_rows<C: ConnectionTrait>(
    db: &C,
    entries: Vec<quick_attendance::Model>,
) -> Result<Vec<QuickReportRow>, AppError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let section_ids: HashSet<i32> = entries.iter().map(|e| e.section_id).collect();
    let sections: HashMap<i32, section::Model> = section::Entity::find()
        .filter(section::Column::Id.is_in(section_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let class_ids: HashSet<i32> = sections.values().map(|s| s.class_id).collect();
    let classes: HashMap<i32, String> = class::Entity::find()
        .filter(class::Column::Id.is_in(class_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let teacher_ids: HashSet<i32> = entries.iter().map(|e| e.recorded_by).collect();
    let teachers: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(teacher_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name.unwrap_or(u.username)))
        .collect();

    let rows = entries
        .into_iter()
        .filter_map(|e| {
            let section = sections.get(&e.section_id)?;
            Some(QuickReportRow {
                id: e.id,
                section_id: e.section_id,
                section_name: section.name.clone(),
                class_id: section.class_id,
                class_name: classes.get(&section.class_id).cloned().unwrap_or_default(),
                attendance_date: e.attendance_date,
                male_count: e.male_count,
                female_count: e.female_count,
                recorded_by: e.recorded_by,
                teacher_name: teachers.get(&e.recorded_by).cloned().unwrap_or_default(),
            })
        })
        .collect();
    Ok(rows)
}

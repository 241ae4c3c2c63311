use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{NaiveDate, Utc};
use common::tally::tally_roster;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{attendance, section, student, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::user::ensure_users_exist;
use crate::models::attendance::*;
use crate::models::shared::{parse_optional_date, parse_required_date, trim_optional};
use crate::state::AppState;

const READ_PERMISSIONS: &[&str] = &["attendance:view", "attendance:record"];

/// Rows per upsert statement. Each row binds 7 parameters and Postgres
/// allows at most 65535 per statement.
const UPSERT_CHUNK: usize = 1000;

/// Ids per `IN (...)` lookup.
const LOOKUP_CHUNK: usize = 10_000;

/// Upsert target: one entry per student per day.
fn upsert_on_conflict() -> OnConflict {
    OnConflict::columns([
        attendance::Column::StudentId,
        attendance::Column::AttendanceDate,
    ])
    .update_columns([
        attendance::Column::Status,
        attendance::Column::RecordedBy,
        attendance::Column::Remarks,
        attendance::Column::UpdatedAt,
    ])
    .to_owned()
}

#[utoipa::path(
    post,
    path = "/record",
    tag = "Attendance",
    operation_id = "recordAttendance",
    summary = "Record one student's attendance",
    description = "Inserts the entry, or overwrites status, recorder and remarks when the student already has one for that day. `attendanceDate` defaults to today and `recordedBy` to the caller; an unknown `recordedBy` is a validation error. Requires `attendance:record` permission.",
    request_body = RecordAttendanceRequest,
    responses(
        (status = 201, description = "Entry stored", body = AttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = payload.student_id))]
pub async fn record_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RecordAttendanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("attendance:record")?;

    let today = Utc::now().date_naive();
    let recorder = payload.recorded_by.filter(|&id| id != auth_user.user_id);
    let (student_id, date, model) = entry_model(payload, auth_user.user_id, today)?;
    find_student(&state.db, student_id).await?;
    ensure_users_exist(&state.db, recorder.into_iter().collect(), "recorder").await?;

    attendance::Entity::insert(model)
        .on_conflict(upsert_on_conflict())
        .exec_without_returning(&state.db)
        .await?;

    let stored = attendance::Entity::find()
        .filter(attendance::Column::StudentId.eq(student_id))
        .filter(attendance::Column::AttendanceDate.eq(date))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Upserted attendance row not found".into()))?;

    let response = describe_one(&state.db, stored).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/bulk-record",
    tag = "Attendance",
    operation_id = "bulkRecordAttendance",
    summary = "Record attendance for many students",
    description = "Upserts every entry inside one transaction, in statements of up to 1000 rows. When the same student and day appear twice, the later entry wins. Requires `attendance:record` permission.",
    request_body = BulkRecordRequest,
    responses(
        (status = 200, description = "Entries stored", body = BulkRecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(count = payload.attendance_data.len()))]
pub async fn bulk_record_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<BulkRecordRequest>,
) -> Result<Json<BulkRecordResponse>, AppError> {
    auth_user.require_permission("attendance:record")?;

    if payload.attendance_data.is_empty() {
        return Err(AppError::Validation("attendanceData must not be empty".into()));
    }

    let today = Utc::now().date_naive();
    let mut slots: HashMap<(i32, NaiveDate), usize> = HashMap::new();
    let mut models: Vec<attendance::ActiveModel> = Vec::new();
    let mut recorders: HashSet<i32> = HashSet::new();
    for (index, entry) in payload.attendance_data.into_iter().enumerate() {
        if let Some(recorder) = entry.recorded_by.filter(|&id| id != auth_user.user_id) {
            recorders.insert(recorder);
        }
        let (student_id, date, model) = entry_model(entry, auth_user.user_id, today)
            .map_err(|e| match e {
                AppError::Validation(msg) => AppError::Validation(format!("Entry {index}: {msg}")),
                other => other,
            })?;
        match slots.get(&(student_id, date)) {
            Some(&slot) => models[slot] = model,
            None => {
                slots.insert((student_id, date), models.len());
                models.push(model);
            }
        }
    }

    let student_ids: HashSet<i32> = slots.keys().map(|(id, _)| *id).collect();
    let ids: Vec<i32> = student_ids.iter().copied().collect();
    let mut known: HashSet<i32> = HashSet::with_capacity(ids.len());
    for chunk in ids.chunks(LOOKUP_CHUNK) {
        let found: Vec<i32> = student::Entity::find()
            .filter(student::Column::Id.is_in(chunk.iter().copied()))
            .select_only()
            .column(student::Column::Id)
            .into_tuple::<i32>()
            .all(&state.db)
            .await?;
        known.extend(found);
    }
    let mut unknown: Vec<i32> = student_ids.difference(&known).copied().collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        return Err(AppError::Validation(format!(
            "Unknown student IDs: {unknown:?}"
        )));
    }
    ensure_users_exist(&state.db, recorders, "recorder").await?;

    let txn = state.db.begin().await?;
    let mut affected = 0;
    let mut models = models.into_iter().peekable();
    while models.peek().is_some() {
        let chunk: Vec<attendance::ActiveModel> = models.by_ref().take(UPSERT_CHUNK).collect();
        affected += attendance::Entity::insert_many(chunk)
            .on_conflict(upsert_on_conflict())
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;
    tracing::info!(affected, "Bulk attendance stored");

    Ok(Json(BulkRecordResponse { affected }))
}

#[utoipa::path(
    get,
    path = "/student/{studentId}",
    tag = "Attendance",
    operation_id = "getStudentAttendance",
    summary = "A student's attendance history",
    description = "Entries newest first, optionally limited to an inclusive date range. Requires `attendance:view` or `attendance:record` permission.",
    params(("studentId" = i32, Path, description = "Student ID"), DateRangeQuery),
    responses(
        (status = 200, description = "Entries", body = Vec<AttendanceResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(student_id))]
pub async fn get_student_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    auth_user.require_any_permission(READ_PERMISSIONS)?;

    let start = parse_optional_date(query.start_date.as_deref(), "startDate")?;
    let end = parse_optional_date(query.end_date.as_deref(), "endDate")?;
    find_student(&state.db, student_id).await?;

    let mut select = attendance::Entity::find().filter(attendance::Column::StudentId.eq(student_id));
    if let Some(start) = start {
        select = select.filter(attendance::Column::AttendanceDate.gte(start));
    }
    if let Some(end) = end {
        select = select.filter(attendance::Column::AttendanceDate.lte(end));
    }

    let entries = select
        .order_by_desc(attendance::Column::AttendanceDate)
        .order_by_desc(attendance::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(describe(&state.db, entries).await?))
}

#[utoipa::path(
    get,
    path = "/sections/{sectionId}/attendance",
    tag = "Attendance",
    operation_id = "getSectionAttendance",
    summary = "Attendance entries of a section",
    description = "Entries for every student of the section, optionally for one day, newest first. Requires `attendance:view` or `attendance:record` permission.",
    params(("sectionId" = i32, Path, description = "Section ID"), SectionDayQuery),
    responses(
        (status = 200, description = "Entries", body = Vec<AttendanceResponse>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(section_id))]
pub async fn get_section_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<i32>,
    Query(query): Query<SectionDayQuery>,
) -> Result<Json<Vec<AttendanceResponse>>, AppError> {
    auth_user.require_any_permission(READ_PERMISSIONS)?;

    let date = parse_optional_date(query.date.as_deref(), "date")?;
    find_section(&state.db, section_id).await?;

    let student_ids = section_student_ids(&state.db, section_id).await?;
    let mut select =
        attendance::Entity::find().filter(attendance::Column::StudentId.is_in(student_ids));
    if let Some(date) = date {
        select = select.filter(attendance::Column::AttendanceDate.eq(date));
    }

    let entries = select
        .order_by_desc(attendance::Column::AttendanceDate)
        .order_by_asc(attendance::Column::StudentId)
        .all(&state.db)
        .await?;

    Ok(Json(describe(&state.db, entries).await?))
}

#[utoipa::path(
    get,
    path = "/report/{sectionId}",
    tag = "Attendance",
    operation_id = "sectionAttendanceReport",
    summary = "Per-student attendance counts for a section",
    description = "For every student of the section, counts of each status between `startDate` and `endDate` inclusive. Students without entries appear with zeros. `total_days` is the number of entries counted. Rows are ordered by student name. Requires `attendance:view` or `attendance:record` permission.",
    params(("sectionId" = i32, Path, description = "Section ID"), DateRangeQuery),
    responses(
        (status = 200, description = "Report rows", body = Vec<StudentTallyRow>),
        (status = 400, description = "Missing or inverted date range (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(section_id))]
pub async fn section_report(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(section_id): Path<i32>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<StudentTallyRow>>, AppError> {
    auth_user.require_any_permission(READ_PERMISSIONS)?;

    let start = parse_required_date(query.start_date.as_deref(), "startDate")?;
    let end = parse_required_date(query.end_date.as_deref(), "endDate")?;
    if start > end {
        return Err(AppError::Validation(
            "startDate must not be after endDate".into(),
        ));
    }
    find_section(&state.db, section_id).await?;

    let students = student::Entity::find()
        .filter(student::Column::SectionId.eq(section_id))
        .order_by_asc(student::Column::Name)
        .order_by_asc(student::Column::Id)
        .all(&state.db)
        .await?;

    let entries = attendance::Entity::find()
        .filter(attendance::Column::StudentId.is_in(students.iter().map(|s| s.id)))
        .filter(attendance::Column::AttendanceDate.between(start, end))
        .all(&state.db)
        .await?;

    let tallies = tally_roster(
        students.iter().map(|s| s.id),
        entries.into_iter().map(|e| (e.student_id, e.status)),
    );

    let rows = students
        .into_iter()
        .zip(tallies)
        .map(|(s, (_, tally))| StudentTallyRow {
            student_id: s.id,
            student_name: s.name,
            roll: s.roll,
            tally,
        })
        .collect();

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "getAttendance",
    summary = "Get an attendance entry",
    description = "Requires `attendance:view` or `attendance:record` permission.",
    params(("id" = i32, Path, description = "Attendance entry ID")),
    responses(
        (status = 200, description = "Entry", body = AttendanceResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AttendanceResponse>, AppError> {
    auth_user.require_any_permission(READ_PERMISSIONS)?;

    let entry = find_entry(&state.db, id).await?;
    describe_one(&state.db, entry).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "updateAttendance",
    summary = "Replace an entry's status and remarks",
    description = "The caller becomes the recorder. Requires `attendance:record` permission.",
    params(("id" = i32, Path, description = "Attendance entry ID")),
    request_body = UpdateAttendanceRequest,
    responses(
        (status = 200, description = "Entry updated", body = AttendanceResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateAttendanceRequest>,
) -> Result<Json<AttendanceResponse>, AppError> {
    auth_user.require_permission("attendance:record")?;

    let status = parse_status(&payload.status)?;
    let remarks = trim_optional(payload.remarks);
    validate_remarks(remarks.as_deref())?;

    let entry = find_entry(&state.db, id).await?;
    let mut active: attendance::ActiveModel = entry.into();
    active.status = Set(status);
    active.remarks = Set(remarks);
    active.recorded_by = Set(auth_user.user_id);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    describe_one(&state.db, updated).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Attendance",
    operation_id = "deleteAttendance",
    summary = "Delete an attendance entry",
    description = "Requires `attendance:record` permission.",
    params(("id" = i32, Path, description = "Attendance entry ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Entry not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_attendance(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("attendance:record")?;

    let result = attendance::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Attendance entry not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Validate a request entry and build its insert model.
fn entry_model(
    req: RecordAttendanceRequest,
    caller_id: i32,
    today: NaiveDate,
) -> Result<(i32, NaiveDate, attendance::ActiveModel), AppError> {
    let status = parse_status(&req.status)?;
    let date = parse_optional_date(req.attendance_date.as_deref(), "attendanceDate")?.unwrap_or(today);
    let remarks = trim_optional(req.remarks);
    validate_remarks(remarks.as_deref())?;

    let now = Utc::now();
    let model = attendance::ActiveModel {
        student_id: Set(req.student_id),
        attendance_date: Set(date),
        status: Set(status),
        recorded_by: Set(req.recorded_by.unwrap_or(caller_id)),
        remarks: Set(remarks),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok((req.student_id, date, model))
}

/// Resolve student, section and recorder names for a batch of entries.
async fn describe<C: ConnectionTrait>(
    db: &C,
    entries: Vec<attendance::Model>,
) -> Result<Vec<AttendanceResponse>, AppError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let student_ids: HashSet<i32> = entries.iter().map(|e| e.student_id).collect();
    let students: HashMap<i32, student::Model> = student::Entity::find()
        .filter(student::Column::Id.is_in(student_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let section_ids: HashSet<i32> = students.values().map(|s| s.section_id).collect();
    let sections: HashMap<i32, String> = section::Entity::find()
        .filter(section::Column::Id.is_in(section_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let recorder_ids: HashSet<i32> = entries.iter().map(|e| e.recorded_by).collect();
    let recorders: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(recorder_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name.unwrap_or(u.username)))
        .collect();

    let rows = entries
        .into_iter()
        .filter_map(|e| {
            let student = students.get(&e.student_id)?;
            Some(AttendanceResponse {
                id: e.id,
                student_id: e.student_id,
                student_name: student.name.clone(),
                section_id: student.section_id,
                section_name: sections.get(&student.section_id).cloned().unwrap_or_default(),
                attendance_date: e.attendance_date,
                status: e.status,
                recorded_by: e.recorded_by,
                recorded_by_name: recorders.get(&e.recorded_by).cloned(),
                remarks: e.remarks,
                created_at: e.created_at,
                updated_at: e.updated_at,
            })
        })
        .collect();
    Ok(rows)
}

async fn describe_one<C: ConnectionTrait>(
    db: &C,
    entry: attendance::Model,
) -> Result<AttendanceResponse, AppError> {
    describe(db, vec![entry])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Attendance row lost its student".into()))
}

async fn section_student_ids<C: ConnectionTrait>(db: &C, section_id: i32) -> Result<Vec<i32>, AppError> {
    Ok(student::Entity::find()
        .filter(student::Column::SectionId.eq(section_id))
        .select_only()
        .column(student::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?)
}

async fn find_entry<C: ConnectionTrait>(db: &C, id: i32) -> Result<attendance::Model, AppError> {
    attendance::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance entry not found".into()))
}

async fn find_student<C: ConnectionTrait>(db: &C, id: i32) -> Result<student::Model, AppError> {
    student::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".into()))
}

async fn find_section<C: ConnectionTrait>(db: &C, id: i32) -> Result<section::Model, AppError> {
    section::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Section not found".into()))
}

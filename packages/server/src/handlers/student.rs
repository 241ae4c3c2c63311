use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::section::find_section;
use crate::entity::{attendance, student, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::academic::*;
use crate::models::shared::trim_optional;
use crate::state::AppState;

/// Check the referenced section and login account exist.
async fn check_references<C: ConnectionTrait>(db: &C, req: &StudentRequest) -> Result<(), AppError> {
    find_section(db, req.section_id).await?;
    if let Some(user_id) = req.user_id {
        user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Students",
    operation_id = "listStudents",
    summary = "List students",
    description = "All students ordered by section, roll and name. Requires authentication.",
    responses(
        (status = 200, description = "Students", body = Vec<StudentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_students(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentResponse>>, AppError> {
    let students = student::Entity::find()
        .order_by_asc(student::Column::SectionId)
        .order_by_asc(student::Column::Roll)
        .order_by_asc(student::Column::Name)
        .order_by_asc(student::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Students",
    operation_id = "createStudent",
    summary = "Enrol a student",
    description = "Requires `academic:manage` permission.",
    request_body = StudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section or user not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(section_id = payload.section_id))]
pub async fn create_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<StudentRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("academic:manage")?;
    validate_student(&payload)?;
    check_references(&state.db, &payload).await?;

    let now = Utc::now();
    let model = student::ActiveModel {
        section_id: Set(payload.section_id),
        name: Set(payload.name.trim().to_string()),
        roll: Set(trim_optional(payload.roll)),
        gender: Set(trim_optional(payload.gender)),
        phone: Set(trim_optional(payload.phone)),
        email: Set(trim_optional(payload.email)),
        address: Set(trim_optional(payload.address)),
        user_id: Set(payload.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = model.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(StudentResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Students",
    operation_id = "getStudent",
    summary = "Get a student",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = StudentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(student_id = id))]
pub async fn get_student(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<StudentResponse>, AppError> {
    Ok(Json(find_student(&state.db, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Students",
    operation_id = "updateStudent",
    summary = "Replace a student",
    description = "Overwrites every field; omitted optional fields are cleared. Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Student ID")),
    request_body = StudentRequest,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student, section or user not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(student_id = id))]
pub async fn update_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<StudentRequest>,
) -> Result<Json<StudentResponse>, AppError> {
    auth_user.require_permission("academic:manage")?;
    validate_student(&payload)?;

    let existing = find_student(&state.db, id).await?;
    check_references(&state.db, &payload).await?;

    let mut active: student::ActiveModel = existing.into();
    active.section_id = Set(payload.section_id);
    active.name = Set(payload.name.trim().to_string());
    active.roll = Set(trim_optional(payload.roll));
    active.gender = Set(trim_optional(payload.gender));
    active.phone = Set(trim_optional(payload.phone));
    active.email = Set(trim_optional(payload.email));
    active.address = Set(trim_optional(payload.address));
    active.user_id = Set(payload.user_id);
    active.updated_at = Set(Utc::now());
    let model = active.update(&state.db).await?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Students",
    operation_id = "deleteStudent",
    summary = "Delete a student",
    description = "Also removes the student's attendance history. Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 204, description = "Student deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Student not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(student_id = id))]
pub async fn delete_student(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("academic:manage")?;

    let txn = state.db.begin().await?;
    find_student(&txn, id).await?;

    let removed = attendance::Entity::delete_many()
        .filter(attendance::Column::StudentId.eq(id))
        .exec(&txn)
        .await?;
    student::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(attendance_rows = removed.rows_affected, "Student deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_student<C: ConnectionTrait>(db: &C, id: i32) -> Result<student::Model, AppError> {
    student::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Student not found".into()))
}

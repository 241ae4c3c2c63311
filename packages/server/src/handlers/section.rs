use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::class::find_class;
use crate::entity::{quick_attendance, section, student, teacher_section};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::academic::*;
use crate::state::AppState;

fn name_taken(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Section name already exists in this class".into())
        }
        _ => AppError::from(e),
    }
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Sections",
    operation_id = "listSections",
    summary = "List sections",
    description = "Sections ordered by class then name, optionally limited to one class. Requires authentication.",
    params(SectionListQuery),
    responses(
        (status = 200, description = "Sections", body = Vec<SectionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_sections(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SectionListQuery>,
) -> Result<Json<Vec<SectionResponse>>, AppError> {
    let mut select = section::Entity::find();
    if let Some(class_id) = query.class_id {
        select = select.filter(section::Column::ClassId.eq(class_id));
    }
    let sections = select
        .order_by_asc(section::Column::ClassId)
        .order_by_asc(section::Column::Name)
        .order_by_asc(section::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(sections.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Sections",
    operation_id = "createSection",
    summary = "Create a section",
    description = "Requires `academic:manage` permission.",
    request_body = SectionRequest,
    responses(
        (status = 201, description = "Section created", body = SectionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Class not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already exists in the class (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(class_id = payload.class_id))]
pub async fn create_section(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("academic:manage")?;
    validate_section(&payload)?;
    find_class(&state.db, payload.class_id).await?;

    let now = Utc::now();
    let model = section::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        class_id: Set(payload.class_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = model.insert(&state.db).await.map_err(name_taken)?;

    Ok((StatusCode::CREATED, Json(SectionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Sections",
    operation_id = "getSection",
    summary = "Get a section",
    params(("id" = i32, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Section", body = SectionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(section_id = id))]
pub async fn get_section(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SectionResponse>, AppError> {
    Ok(Json(find_section(&state.db, id).await?.into()))
}

#[utoipa::path(
    get,
    path = "/{id}/students",
    tag = "Sections",
    operation_id = "listSectionStudents",
    summary = "Students of a section",
    description = "Students ordered by roll then name. Requires authentication.",
    params(("id" = i32, Path, description = "Section ID")),
    responses(
        (status = 200, description = "Students", body = Vec<StudentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(section_id = id))]
pub async fn list_section_students(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<StudentResponse>>, AppError> {
    find_section(&state.db, id).await?;
    let students = student::Entity::find()
        .filter(student::Column::SectionId.eq(id))
        .order_by_asc(student::Column::Roll)
        .order_by_asc(student::Column::Name)
        .order_by_asc(student::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Sections",
    operation_id = "updateSection",
    summary = "Replace a section",
    description = "Sets name and class. Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Section ID")),
    request_body = SectionRequest,
    responses(
        (status = 200, description = "Section updated", body = SectionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section or class not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name already exists in the class (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(section_id = id))]
pub async fn update_section(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SectionRequest>,
) -> Result<Json<SectionResponse>, AppError> {
    auth_user.require_permission("academic:manage")?;
    validate_section(&payload)?;

    let existing = find_section(&state.db, id).await?;
    if existing.class_id != payload.class_id {
        find_class(&state.db, payload.class_id).await?;
    }

    let mut active: section::ActiveModel = existing.into();
    active.name = Set(payload.name.trim().to_string());
    active.class_id = Set(payload.class_id);
    active.updated_at = Set(Utc::now());
    let model = active.update(&state.db).await.map_err(name_taken)?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Sections",
    operation_id = "deleteSection",
    summary = "Delete a section",
    description = "Only sections without students or quick attendance entries can be deleted. Teacher assignments to the section are removed with it. Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Section not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Section still in use (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(section_id = id))]
pub async fn delete_section(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("academic:manage")?;

    let txn = state.db.begin().await?;
    find_section(&txn, id).await?;

    let student_count = student::Entity::find()
        .filter(student::Column::SectionId.eq(id))
        .count(&txn)
        .await?;
    if student_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete section with enrolled students".into(),
        ));
    }

    let quick_count = quick_attendance::Entity::find()
        .filter(quick_attendance::Column::SectionId.eq(id))
        .count(&txn)
        .await?;
    if quick_count > 0 {
        return Err(AppError::Conflict(
            "Cannot delete section with quick attendance entries".into(),
        ));
    }

    teacher_section::Entity::delete_many()
        .filter(teacher_section::Column::SectionId.eq(id))
        .exec(&txn)
        .await?;
    section::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_section<C: ConnectionTrait>(db: &C, id: i32) -> Result<section::Model, AppError> {
    section::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Section not found".into()))
}

use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::*;
use tracing::instrument;

use super::section::find_section;
use super::user::find_user;
use crate::entity::{class, role, section, teacher_section, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::teacher_section::*;
use crate::state::AppState;

fn already_assigned(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Teacher is already assigned to this section".into())
        }
        _ => AppError::from(e),
    }
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Teacher Sections",
    operation_id = "assignSection",
    summary = "Assign a teacher to a section",
    description = "Guest accounts cannot be assigned. Requires `academic:manage` permission.",
    request_body = AssignSectionRequest,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentResponse),
        (status = 400, description = "Guest account (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User or section not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already assigned (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = payload.user_id, section_id = payload.section_id))]
pub async fn assign_section(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AssignSectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("academic:manage")?;

    let teacher = find_user(&state.db, payload.user_id).await?;
    if teacher.role == role::DEFAULT_ROLE {
        return Err(AppError::Validation(
            "Guest accounts cannot be assigned to sections".into(),
        ));
    }
    find_section(&state.db, payload.section_id).await?;

    let now = Utc::now();
    let model = teacher_section::ActiveModel {
        user_id: Set(payload.user_id),
        section_id: Set(payload.section_id),
        is_primary: Set(payload.is_primary),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = model.insert(&state.db).await.map_err(already_assigned)?;

    let response = describe_one(&state.db, model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/teacher/{userId}",
    tag = "Teacher Sections",
    operation_id = "listTeacherSections",
    summary = "Sections assigned to a teacher",
    description = "Primary assignments first, then by class and section name. Requires authentication.",
    params(("userId" = i32, Path, description = "Teacher's user ID")),
    responses(
        (status = 200, description = "Assignments, possibly empty", body = Vec<AssignmentResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(user_id))]
pub async fn list_teacher_sections(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    find_user(&state.db, user_id).await?;

    let assignments = teacher_section::Entity::find()
        .filter(teacher_section::Column::UserId.eq(user_id))
        .all(&state.db)
        .await?;

    let mut rows = describe(&state.db, assignments).await?;
    rows.sort_by(|a, b| {
        b.is_primary
            .cmp(&a.is_primary)
            .then_with(|| a.class_name.cmp(&b.class_name))
            .then_with(|| a.section_name.cmp(&b.section_name))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Teacher Sections",
    operation_id = "getAssignment",
    summary = "Get an assignment",
    params(("id" = i32, Path, description = "Assignment ID")),
    responses(
        (status = 200, description = "Assignment", body = AssignmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Assignment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_assignment(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let model = find_assignment(&state.db, id).await?;
    describe_one(&state.db, model).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Teacher Sections",
    operation_id = "updateAssignment",
    summary = "Move an assignment or change its primary flag",
    description = "Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Assignment ID")),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Assignment or section not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already assigned to the target section (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentResponse>, AppError> {
    auth_user.require_permission("academic:manage")?;

    let existing = find_assignment(&state.db, id).await?;
    let mut active: teacher_section::ActiveModel = existing.into();
    if let Some(section_id) = payload.section_id {
        find_section(&state.db, section_id).await?;
        active.section_id = Set(section_id);
    }
    if let Some(is_primary) = payload.is_primary {
        active.is_primary = Set(is_primary);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(already_assigned)?;

    describe_one(&state.db, updated).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Teacher Sections",
    operation_id = "deleteAssignment",
    summary = "Remove an assignment",
    description = "Requires `academic:manage` permission.",
    params(("id" = i32, Path, description = "Assignment ID")),
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Assignment not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("academic:manage")?;

    let result = teacher_section::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Assignment not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn find_assignment<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<teacher_section::Model, AppError> {
    teacher_section::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".into()))
}

/// Resolve section, class and teacher names for a batch of assignments.
async fn describe<C: ConnectionTrait>(
    db: &C,
    assignments: Vec<teacher_section::Model>,
) -> Result<Vec<AssignmentResponse>, AppError> {
    if assignments.is_empty() {
        return Ok(Vec::new());
    }

    let section_ids: HashSet<i32> = assignments.iter().map(|a| a.section_id).collect();
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

    let teacher_ids: HashSet<i32> = assignments.iter().map(|a| a.user_id).collect();
    let teachers: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(teacher_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.full_name.unwrap_or(u.username)))
        .collect();

    let rows = assignments
        .into_iter()
        .filter_map(|a| {
            let section = sections.get(&a.section_id)?;
            Some(AssignmentResponse {
                id: a.id,
                user_id: a.user_id,
                teacher_name: teachers.get(&a.user_id).cloned().unwrap_or_default(),
                section_id: a.section_id,
                section_name: section.name.clone(),
                class_id: section.class_id,
                class_name: classes.get(&section.class_id).cloned().unwrap_or_default(),
                is_primary: a.is_primary,
                created_at: a.created_at,
                updated_at: a.updated_at,
            })
        })
        .collect();
    Ok(rows)
}

async fn describe_one<C: ConnectionTrait>(
    db: &C,
    assignment: teacher_section::Model,
) -> Result<AssignmentResponse, AppError> {
    describe(db, vec![assignment])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Assignment lost its section".into()))
}

use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{role, student, teacher_section, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{Pagination, page_bounds, trim_optional};
use crate::models::user::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List accounts",
    description = "Accounts ordered by username, optionally limited to one role. Requires `user:manage` permission.",
    params(UserListQuery),
    responses(
        (status = 200, description = "One page of accounts", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission("user:manage")?;

    let (page, per_page) = page_bounds(query.page, query.per_page, 20);

    let mut select = user::Entity::find();
    if let Some(role) = trim_optional(query.role) {
        select = select.filter(user::Column::Role.eq(role));
    }

    let total = select.clone().count(&state.db).await?;
    let users = select
        .order_by_asc(user::Column::Username)
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(UserListResponse {
        data: users.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Users",
    operation_id = "getUser",
    summary = "Get an account",
    description = "Any user may read their own account. Other accounts need `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, AppError> {
    if auth_user.user_id != id {
        auth_user.require_permission("user:manage")?;
    }
    Ok(Json(find_user(&state.db, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Users",
    operation_id = "updateUser",
    summary = "Update an account",
    description = "Users may change their own display name. Changing another account or any role needs `user:manage` permission, and nobody can change their own role. A new role takes effect at the account's next login.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Validation error or unknown role (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let is_self = auth_user.user_id == id;
    if !is_self || payload.role.is_some() {
        auth_user.require_permission("user:manage")?;
    }
    validate_update_user(&payload)?;

    let existing = find_user(&state.db, id).await?;
    let mut active: user::ActiveModel = existing.into();

    if let Some(full_name) = payload.full_name {
        active.full_name = Set(trim_optional(Some(full_name)));
    }
    if let Some(role_name) = payload.role {
        if is_self {
            return Err(AppError::Validation(
                "You cannot change your own role".into(),
            ));
        }
        let role_name = role_name.trim().to_string();
        role::Entity::find_by_id(role_name.clone())
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown role '{role_name}'")))?;
        active.role = Set(role_name);
    }

    let updated = active.update(&state.db).await?;
    tracing::info!(role = %updated.role, "User updated");
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete an account",
    description = "Removes the account and its section assignments and unlinks any student record. Accounts that recorded attendance cannot be deleted. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "Own account (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Account still referenced by attendance (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("user:manage")?;
    if auth_user.user_id == id {
        return Err(AppError::Validation(
            "You cannot delete your own account".into(),
        ));
    }

    let txn = state.db.begin().await?;
    find_user(&txn, id).await?;

    teacher_section::Entity::delete_many()
        .filter(teacher_section::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    student::Entity::update_many()
        .col_expr(student::Column::UserId, Expr::value(Option::<i32>::None))
        .filter(student::Column::UserId.eq(id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(id)
        .exec(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::Conflict(
                "Cannot delete a user who has recorded attendance".into(),
            ),
            _ => AppError::from(e),
        })?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Fail with a validation error naming every id in `ids` without an account.
pub(crate) async fn ensure_users_exist<C: ConnectionTrait>(
    db: &C,
    ids: HashSet<i32>,
    field: &str,
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    let known: HashSet<i32> = user::Entity::find()
        .filter(user::Column::Id.is_in(ids.iter().copied()))
        .select_only()
        .column(user::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    let mut unknown: Vec<i32> = ids.difference(&known).copied().collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(AppError::Validation(format!("Unknown {field} IDs: {unknown:?}")))
}

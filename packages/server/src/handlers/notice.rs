use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::notice;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::notice::*;
use crate::models::shared::{Pagination, escape_like, page_bounds, parse_optional_date, trim_optional};
use crate::state::AppState;

/// Newest notice day first.
fn newest_first(select: Select<notice::Entity>) -> Select<notice::Entity> {
    select
        .order_by_desc(notice::Column::Date)
        .order_by_desc(notice::Column::Id)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Notices",
    operation_id = "listNotices",
    summary = "Every notice",
    description = "Public. Newest notice day first.",
    responses(
        (status = 200, description = "Notices", body = Vec<NoticeResponse>),
    ),
)]
#[instrument(skip(state))]
pub async fn list_notices(
    State(state): State<AppState>,
) -> Result<Json<Vec<NoticeResponse>>, AppError> {
    let notices = newest_first(notice::Entity::find()).all(&state.db).await?;
    Ok(Json(notices.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/page",
    tag = "Notices",
    operation_id = "listNoticesByPage",
    summary = "One page of notices",
    description = "Public. Same order as the full listing. A page past the end is empty.",
    params(NoticePageQuery),
    responses(
        (status = 200, description = "One page of notices", body = NoticePageResponse),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_notices_by_page(
    State(state): State<AppState>,
    Query(query): Query<NoticePageQuery>,
) -> Result<Json<NoticePageResponse>, AppError> {
    let (page, per_page) = page_bounds(query.page, query.limit, 10);

    let total = notice::Entity::find().count(&state.db).await?;
    let notices = newest_first(notice::Entity::find())
        .offset(Some((page - 1) * per_page))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(NoticePageResponse {
        data: notices.into_iter().map(Into::into).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Notices",
    operation_id = "searchNotices",
    summary = "Search notices",
    description = "Public. Case-insensitive substring match on title or content.",
    params(NoticeSearchQuery),
    responses(
        (status = 200, description = "Matching notices, possibly empty", body = Vec<NoticeResponse>),
        (status = 400, description = "Missing search term (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn search_notices(
    State(state): State<AppState>,
    Query(query): Query<NoticeSearchQuery>,
) -> Result<Json<Vec<NoticeResponse>>, AppError> {
    let term = trim_optional(query.search)
        .ok_or_else(|| AppError::Validation("search is required".into()))?;
    let pattern = format!("%{}%", escape_like(&term).to_lowercase());

    let matches = Condition::any()
        .add(
            Expr::expr(Func::lower(Expr::col(notice::Column::Title)))
                .like(LikeExpr::new(pattern.clone()).escape('\\')),
        )
        .add(
            Expr::expr(Func::lower(Expr::col(notice::Column::Content)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );

    let notices = newest_first(notice::Entity::find().filter(matches))
        .all(&state.db)
        .await?;
    Ok(Json(notices.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Notices",
    operation_id = "getNotice",
    summary = "Get a notice",
    description = "Public.",
    params(("id" = i32, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Notice", body = NoticeResponse),
        (status = 404, description = "Notice not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_notice(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<NoticeResponse>, AppError> {
    Ok(Json(find_notice(&state.db, id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Notices",
    operation_id = "createNotice",
    summary = "Publish a notice",
    description = "Requires `notice:manage` permission.",
    request_body = NoticeRequest,
    responses(
        (status = 201, description = "Notice published", body = NoticeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_notice(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<NoticeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("notice:manage")?;
    validate_notice(&payload)?;
    let date = parse_optional_date(payload.date.as_deref(), "date")?
        .unwrap_or_else(|| Utc::now().date_naive());

    let now = Utc::now();
    let model = notice::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        date: Set(date),
        content: Set(payload.content.trim().to_string()),
        badge: Set(trim_optional(payload.badge)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = model.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(NoticeResponse::from(model))))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Notices",
    operation_id = "updateNotice",
    summary = "Replace a notice",
    description = "Requires `notice:manage` permission.",
    params(("id" = i32, Path, description = "Notice ID")),
    request_body = NoticeRequest,
    responses(
        (status = 200, description = "Notice updated", body = NoticeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Notice not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_notice(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<NoticeRequest>,
) -> Result<Json<NoticeResponse>, AppError> {
    auth_user.require_permission("notice:manage")?;
    validate_notice(&payload)?;
    let date = parse_optional_date(payload.date.as_deref(), "date")?;

    let existing = find_notice(&state.db, id).await?;
    let mut active: notice::ActiveModel = existing.into();
    active.title = Set(payload.title.trim().to_string());
    if let Some(date) = date {
        active.date = Set(date);
    }
    active.content = Set(payload.content.trim().to_string());
    active.badge = Set(trim_optional(payload.badge));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Notices",
    operation_id = "deleteNotice",
    summary = "Delete a notice",
    description = "Requires `notice:manage` permission.",
    params(("id" = i32, Path, description = "Notice ID")),
    responses(
        (status = 204, description = "Notice deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Notice not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_notice(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("notice:manage")?;

    let result = notice::Entity::delete_by_id(id).exec(&state.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Notice not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn find_notice<C: ConnectionTrait>(db: &C, id: i32) -> Result<notice::Model, AppError> {
    notice::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notice not found".into()))
}

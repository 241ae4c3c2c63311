use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::grouping::group_by_class_section_year;
use common::spreadsheet::{SheetFormat, read_rows};
use common::{ResultRow, RowError, derive};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use serde_json::Value;
use tracing::instrument;

use crate::entity::student_result;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::result::*;
use crate::models::shared::{escape_like, parse_optional_date, trim_optional};
use crate::state::AppState;

const NOT_FOUND: &str = "Result not found";

#[utoipa::path(
    get,
    path = "/",
    tag = "Results",
    operation_id = "listResults",
    summary = "List every result",
    description = "Returns all results ordered by year (newest first), then class, section and roll. Requires `result:manage` permission.",
    responses(
        (status = 200, description = "All results", body = Vec<ResultResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    auth_user.require_permission("result:manage")?;

    let models = student_result::Entity::find()
        .order_by_desc(student_result::Column::Year)
        .order_by_asc(student_result::Column::ClassName)
        .order_by_asc(student_result::Column::Section)
        .order_by_asc(student_result::Column::Roll)
        .order_by_asc(student_result::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(models.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Results",
    operation_id = "createResult",
    summary = "Insert one result",
    description = "Stores one result row. `roll`, `class`, `section` and `year` are required. Subject keys use their canonical names (matched case-insensitively). `total_marks` and `failed_subjects` are derived when omitted and `publish_date` defaults to today. Requires `result:manage` permission.",
    request_body(content_type = "application/json", description = "Result row object, e.g. `{\"roll\":\"12\",\"class\":\"10\",\"section\":\"A\",\"year\":\"2024\",\"Bangla\":30}`"),
    responses(
        (status = 201, description = "Result stored", body = ResultResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("result:manage")?;

    let row = ResultRow::from_value(&payload).map_err(row_error)?;
    let now = chrono::Utc::now();
    let model = new_result(derive(row, now.date_naive()), now)
        .insert(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(ResultResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/bulk",
    tag = "Results",
    operation_id = "bulkCreateResults",
    summary = "Insert many results",
    description = "Stores each row of a non-empty JSON array independently. Rows that fail to parse or store are reported in `failedRows` by zero-based index; earlier inserts are kept. Requires `result:manage` permission.",
    request_body(content_type = "application/json", description = "Array of result row objects"),
    responses(
        (status = 201, description = "Import finished", body = BulkImportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn bulk_create_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<Value>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("result:manage")?;

    let rows = match payload {
        Value::Array(rows) if !rows.is_empty() => rows,
        _ => {
            return Err(AppError::Validation(
                "Body must be a non-empty array of result rows".into(),
            ));
        }
    };

    let report = import_rows(&state.db, rows.iter().map(ResultRow::from_value)).await;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    post,
    path = "/upload",
    tag = "Results",
    operation_id = "uploadResults",
    summary = "Import results from a spreadsheet",
    description = "Imports the first worksheet of the file in the `excel` multipart field (xlsx, xls, ods or csv). The header row names the fields. Each data row is stored independently, as in the bulk insert. Requires `result:manage` permission.",
    request_body(content_type = "multipart/form-data", description = "Spreadsheet in the `excel` field"),
    responses(
        (status = 201, description = "Import finished", body = BulkImportResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload_results(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("result:manage")?;

    let mut upload: Option<(SheetFormat, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("excel") {
            let format = SheetFormat::detect(field.file_name(), field.content_type());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
            upload = Some((format, data.to_vec()));
            break;
        }
    }

    let (format, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'excel' field".into()))?;

    let rows = read_rows(&bytes, format).map_err(|e| AppError::Validation(e.to_string()))?;
    if rows.is_empty() {
        return Err(AppError::Validation(
            "No data found in the uploaded file".into(),
        ));
    }
    tracing::info!(rows = rows.len(), ?format, "Importing uploaded results");

    let report = import_rows(&state.db, rows.iter().map(ResultRow::from_map)).await;
    Ok((StatusCode::CREATED, Json(report)))
}

#[utoipa::path(
    get,
    path = "/by-identifier",
    tag = "Results",
    operation_id = "getResultByIdentifier",
    summary = "Look up a result by roll, class, section and year",
    description = "Public. All four fields are required and must match exactly. Returns the earliest stored match.",
    params(IdentifierQuery),
    responses(
        (status = 200, description = "Matching result", body = ResultResponse),
        (status = 404, description = "No match or missing field (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_by_identifier(
    State(state): State<AppState>,
    Query(query): Query<IdentifierQuery>,
) -> Result<Json<ResultResponse>, AppError> {
    let (Some(roll), Some(class), Some(section), Some(year)) = (
        trim_optional(query.roll),
        trim_optional(query.class),
        trim_optional(query.section),
        trim_optional(query.year),
    ) else {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    };

    let model = student_result::Entity::find()
        .filter(student_result::Column::Roll.eq(roll))
        .filter(student_result::Column::ClassName.eq(class))
        .filter(student_result::Column::Section.eq(section))
        .filter(student_result::Column::Year.eq(year))
        .order_by_asc(student_result::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    post,
    path = "/strict-search",
    tag = "Results",
    operation_id = "strictSearchResults",
    summary = "Find a result matching every field",
    description = "Public. `student_name`, `roll`, `class`, `section`, `year` and `publish_date` must all be given and match exactly. Returns the earliest stored match.",
    request_body = StrictSearchRequest,
    responses(
        (status = 200, description = "Matching result", body = ResultResponse),
        (status = 400, description = "Malformed publish_date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No match or missing field (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn strict_search(
    State(state): State<AppState>,
    AppJson(payload): AppJson<StrictSearchRequest>,
) -> Result<Json<ResultResponse>, AppError> {
    let publish_date = parse_optional_date(payload.publish_date.as_deref(), "publish_date")?;
    let (Some(student_name), Some(roll), Some(class), Some(section), Some(year), Some(publish_date)) = (
        trim_optional(payload.student_name),
        trim_optional(payload.roll),
        trim_optional(payload.class),
        trim_optional(payload.section),
        trim_optional(payload.year),
        publish_date,
    ) else {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    };

    let model = student_result::Entity::find()
        .filter(student_result::Column::StudentName.eq(student_name))
        .filter(student_result::Column::Roll.eq(roll))
        .filter(student_result::Column::ClassName.eq(class))
        .filter(student_result::Column::Section.eq(section))
        .filter(student_result::Column::Year.eq(year))
        .filter(student_result::Column::PublishDate.eq(publish_date))
        .order_by_asc(student_result::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Results",
    operation_id = "searchResults",
    summary = "Most recently published result matching the filters",
    description = "Public. Any subset of filters: `student_name` is a case-insensitive substring match, `roll` and `year` are exact. Only the most recently published match is returned (ties go to the newest record). With no filters, returns the most recently published record overall.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Most recent match", body = ResultResponse),
        (status = 404, description = "No match (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn search_results(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ResultResponse>, AppError> {
    let mut select = student_result::Entity::find();

    if let Some(name) = trim_optional(query.student_name) {
        let term = escape_like(&name);
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(student_result::Column::StudentName)))
                .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
        );
    }
    if let Some(roll) = trim_optional(query.roll) {
        select = select.filter(student_result::Column::Roll.eq(roll));
    }
    if let Some(year) = trim_optional(query.year) {
        select = select.filter(student_result::Column::Year.eq(year));
    }

    let model = select
        .order_by_desc(student_result::Column::PublishDate)
        .order_by_desc(student_result::Column::Id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))?;

    Ok(Json(model.into()))
}

#[utoipa::path(
    get,
    path = "/by-class-year",
    tag = "Results",
    operation_id = "listResultsByClassYear",
    summary = "Results of one class in one year",
    description = "Public. Both `class` and `year` are required. Results are ordered by section, then roll.",
    params(ClassYearQuery),
    responses(
        (status = 200, description = "Matching results", body = Vec<ResultResponse>),
        (status = 400, description = "Missing class or year (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_by_class_year(
    State(state): State<AppState>,
    Query(query): Query<ClassYearQuery>,
) -> Result<Json<Vec<ResultResponse>>, AppError> {
    let (Some(class), Some(year)) = (trim_optional(query.class), trim_optional(query.year)) else {
        return Err(AppError::Validation("class and year are required".into()));
    };

    let models = student_result::Entity::find()
        .filter(student_result::Column::ClassName.eq(class))
        .filter(student_result::Column::Year.eq(year))
        .order_by_asc(student_result::Column::Section)
        .order_by_asc(student_result::Column::Roll)
        .order_by_asc(student_result::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(models.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/grouped-summary",
    tag = "Results",
    operation_id = "groupedResultSummary",
    summary = "Every result grouped by class, section and year",
    description = "Returns `class -> section -> year -> [results]`. Each result appears in exactly one bucket. Requires `result:manage` permission.",
    responses(
        (status = 200, description = "Grouped results", body = GroupedSummaryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn grouped_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<GroupedSummaryResponse>, AppError> {
    auth_user.require_permission("result:manage")?;

    let models = student_result::Entity::find()
        .order_by_asc(student_result::Column::Roll)
        .order_by_asc(student_result::Column::Id)
        .all(&state.db)
        .await?;

    let grouped = group_by_class_section_year(
        models.into_iter().map(ResultResponse::from),
        |r| (r.class.as_str(), r.section.as_str(), r.year.as_str()),
    );
    Ok(Json(GroupedSummaryResponse(grouped)))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Results",
    operation_id = "updateResult",
    summary = "Replace a result",
    description = "Replaces every field of a result with the submitted row. Subjects left out become empty and derived fields are recomputed unless supplied. Requires `result:manage` permission.",
    params(("id" = i32, Path, description = "Result ID")),
    request_body(content_type = "application/json", description = "Result row object"),
    responses(
        (status = 200, description = "Result replaced", body = ResultResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Result not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<Value>,
) -> Result<Json<ResultResponse>, AppError> {
    auth_user.require_permission("result:manage")?;

    let row = ResultRow::from_value(&payload).map_err(row_error)?;
    let existing = find_result(&state.db, id).await?;

    let now = chrono::Utc::now();
    let mut active: student_result::ActiveModel = existing.into();
    apply_derived(&mut active, derive(row, now.date_naive()));
    active.updated_at = Set(now);

    let model = active.update(&state.db).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Results",
    operation_id = "deleteResult",
    summary = "Delete a result",
    description = "Requires `result:manage` permission.",
    params(("id" = i32, Path, description = "Result ID")),
    responses(
        (status = 204, description = "Result deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Result not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_result(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("result:manage")?;

    let result = student_result::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(NOT_FOUND.into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Body limit layer for the spreadsheet upload route.
pub fn upload_body_limit(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}

/// Store each parsed row on its own. Failures are collected, never fatal.
async fn import_rows<C, I>(db: &C, rows: I) -> BulkImportResponse
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Result<ResultRow, RowError>>,
{
    let mut inserted_count = 0;
    let mut failed_rows = Vec::new();

    for (index, parsed) in rows.into_iter().enumerate() {
        let outcome = match parsed {
            Ok(row) => {
                let now = chrono::Utc::now();
                new_result(derive(row, now.date_naive()), now)
                    .insert(db)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            }
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => inserted_count += 1,
            Err(message) => {
                tracing::warn!(row = index, %message, "Skipping result row");
                failed_rows.push(FailedRow {
                    row: index,
                    message,
                });
            }
        }
    }

    if !failed_rows.is_empty() {
        tracing::warn!(
            inserted = inserted_count,
            failed = failed_rows.len(),
            "Result import finished with failures"
        );
    }

    BulkImportResponse {
        inserted_count,
        failed_rows,
    }
}

async fn find_result<C: ConnectionTrait>(db: &C, id: i32) -> Result<student_result::Model, AppError> {
    student_result::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.into()))
}

fn row_error(e: RowError) -> AppError {
    AppError::Validation(e.to_string())
}

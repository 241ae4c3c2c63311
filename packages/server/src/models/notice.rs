use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::notice;
use crate::error::AppError;
use crate::models::shared::{Pagination, validate_name};

/// Full set of notice fields, used for both create and replace.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NoticeRequest {
    /// 1-200 characters.
    #[schema(example = "Half-yearly exam routine")]
    pub title: String,
    /// `YYYY-MM-DD`. Defaults to today.
    #[schema(example = "2024-06-01")]
    pub date: Option<String>,
    #[schema(example = "The half-yearly exams start on 10 June.")]
    pub content: String,
    /// Up to 32 characters.
    #[schema(example = "Exam")]
    pub badge: Option<String>,
}

pub fn validate_notice(req: &NoticeRequest) -> Result<(), AppError> {
    validate_name(&req.title, "Title", 200)?;
    if req.content.trim().is_empty() {
        return Err(AppError::Validation("Content must not be empty".into()));
    }
    if let Some(ref badge) = req.badge
        && badge.trim().chars().count() > 32
    {
        return Err(AppError::Validation(
            "Badge must be at most 32 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticeResponse {
    pub id: i32,
    pub title: String,
    pub date: NaiveDate,
    pub content: String,
    pub badge: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<notice::Model> for NoticeResponse {
    fn from(m: notice::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            date: m.date,
            content: m.content,
            badge: m.badge,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NoticePageQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 10).
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoticePageResponse {
    pub data: Vec<NoticeResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NoticeSearchQuery {
    /// Case-insensitive substring of the title or content.
    pub search: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::user;
use crate::error::AppError;
use crate::models::shared::Pagination;

/// Account as shown to administrators. Never includes the password hash.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ayesha_r")]
    pub username: String,
    #[schema(example = "Ayesha Rahman")]
    pub full_name: Option<String>,
    #[schema(example = "teacher")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            full_name: m.full_name,
            role: m.role,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    /// Page number (1-based, default 1).
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    pub per_page: Option<u64>,
    /// Only accounts with this role.
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: Pagination,
}

/// Partial account update. Absent fields are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    /// New display name. An empty string clears it.
    #[schema(example = "Ayesha Rahman")]
    pub full_name: Option<String>,
    /// New role name. Needs `user:manage`.
    #[schema(example = "teacher")]
    pub role: Option<String>,
}

pub fn validate_update_user(req: &UpdateUserRequest) -> Result<(), AppError> {
    if req.full_name.is_none() && req.role.is_none() {
        return Err(AppError::Validation(
            "At least one of full_name and role is required".into(),
        ));
    }
    if let Some(ref full_name) = req.full_name
        && full_name.trim().chars().count() > 128
    {
        return Err(AppError::Validation(
            "Full name must be at most 128 characters".into(),
        ));
    }
    if let Some(ref role) = req.role
        && role.trim().is_empty()
    {
        return Err(AppError::Validation("Role must not be empty".into()));
    }
    Ok(())
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entity::{class, section, student};
use crate::error::AppError;
use crate::models::shared::validate_name;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassRequest {
    /// Unique class name (1-64 characters).
    #[schema(example = "Class 10")]
    pub name: String,
}

pub fn validate_class(req: &ClassRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Class name", 64)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassResponse {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<class::Model> for ClassResponse {
    fn from(m: class::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionRequest {
    /// Section name, unique within its class (1-64 characters).
    #[schema(example = "A")]
    pub name: String,
    #[schema(example = 1)]
    pub class_id: i32,
}

pub fn validate_section(req: &SectionRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Section name", 64)
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SectionListQuery {
    /// Only sections of this class.
    pub class_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionResponse {
    pub id: i32,
    pub name: String,
    pub class_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<section::Model> for SectionResponse {
    fn from(m: section::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            class_id: m.class_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Full set of student fields, used for both create and replace.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StudentRequest {
    #[schema(example = 3)]
    pub section_id: i32,
    #[schema(example = "Tanvir Hasan")]
    pub name: String,
    #[schema(example = "12")]
    pub roll: Option<String>,
    #[schema(example = "male")]
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Login account linked to the student.
    pub user_id: Option<i32>,
}

pub fn validate_student(req: &StudentRequest) -> Result<(), AppError> {
    validate_name(&req.name, "Student name", 128)?;
    if let Some(ref roll) = req.roll
        && roll.trim().chars().count() > 32
    {
        return Err(AppError::Validation(
            "Roll must be at most 32 characters".into(),
        ));
    }
    if let Some(ref email) = req.email
        && !email.trim().is_empty()
        && !email.contains('@')
    {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    Ok(())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentResponse {
    pub id: i32,
    pub section_id: i32,
    pub name: String,
    pub roll: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<student::Model> for StudentResponse {
    fn from(m: student::Model) -> Self {
        Self {
            id: m.id,
            section_id: m.section_id,
            name: m.name,
            roll: m.roll,
            gender: m.gender,
            phone: m.phone,
            email: m.email,
            address: m.address,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

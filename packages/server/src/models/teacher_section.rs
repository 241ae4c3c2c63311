use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignSectionRequest {
    /// Teacher's user ID.
    #[schema(example = 7)]
    pub user_id: i32,
    #[schema(example = 3)]
    pub section_id: i32,
    /// Whether this teacher is the section's class teacher.
    #[serde(default)]
    pub is_primary: bool,
}

/// Partial update of an assignment. Absent fields are left unchanged.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAssignmentRequest {
    #[schema(example = 4)]
    pub section_id: Option<i32>,
    pub is_primary: Option<bool>,
}

/// An assignment with its section, class and teacher names resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub id: i32,
    pub user_id: i32,
    /// Full name of the teacher, falling back to the username.
    #[schema(example = "Ayesha Rahman")]
    pub teacher_name: String,
    pub section_id: i32,
    #[schema(example = "A")]
    pub section_name: String,
    pub class_id: i32,
    #[schema(example = "Class 10")]
    pub class_name: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Head-count attendance for a whole section on one day.
/// `(section_id, attendance_date)` is unique.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quick_attendance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub section_id: i32,
    #[sea_orm(belongs_to, from = "section_id", to = "id")]
    pub section: HasOne<super::section::Entity>,

    pub attendance_date: Date,
    pub male_count: i32,
    pub female_count: i32,

    pub recorded_by: i32,
    #[sea_orm(belongs_to, from = "recorded_by", to = "id")]
    pub recorder: HasOne<super::user::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

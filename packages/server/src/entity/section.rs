use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A division of a class. `(class_id, name)` is unique, see `seed::ensure_indexes`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "section")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub class_id: i32,
    #[sea_orm(belongs_to, from = "class_id", to = "id")]
    pub class: HasOne<super::class::Entity>,

    #[sea_orm(has_many)]
    pub students: HasMany<super::student::Entity>,

    #[sea_orm(has_many)]
    pub quick_attendances: HasMany<super::quick_attendance::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A school notice shown on the public notice board.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notice")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,
    /// Day the notice refers to.
    pub date: Date,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    /// Short label such as "Exam" or "Holiday".
    pub badge: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

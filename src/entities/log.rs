//! Log entity - Append-only record of tracked user actions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Log database model. Rows are only ever inserted, never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Platform identity of the acting user, when known
    pub telegram_id: Option<String>,
    /// Short action tag, e.g. `command_start` or `payment_submitted`
    pub action: String,
    pub timestamp: DateTimeUtc,
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

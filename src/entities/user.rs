//! User entity - Represents a buyer known to the storefront.
//!
//! Users are created on first interaction with the bot and never deleted.
//! The `telegram_id` is the platform identity and is unique across the system;
//! banning only flips `is_banned` and records a reason.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user row
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Platform identity, unique across the system
    #[sea_orm(unique)]
    pub telegram_id: String,
    /// Platform username, if the user has one
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// When the user first interacted with the bot
    pub joined_date: DateTimeUtc,
    /// Soft ban flag, enforced only by the back-office
    pub is_banned: bool,
    pub ban_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each user can have many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

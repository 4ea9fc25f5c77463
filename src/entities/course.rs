//! Course entity - A sellable (or free) course in the catalog.
//!
//! `file_link` is the deliverable sent to buyers after approval. Courses are
//! soft-disabled via `is_active` and can only be hard-deleted while no
//! payments reference them. `payment_options` is a comma-separated allow-list
//! of payment methods that, when set, overrides the globally configured ones.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Price in the store currency; must be > 0 unless `is_free` is set
    pub price: f64,
    /// Deliverable access link sent to the buyer
    pub file_link: String,
    /// Owning category, nulled out when the category is deleted
    pub category_id: Option<i32>,
    /// Promotional image shown on the course detail view
    pub image_link: Option<String>,
    /// Filename of the UPI QR code image, if one was uploaded
    pub qr_code_image: Option<String>,
    pub is_free: bool,
    pub demo_video_link: Option<String>,
    pub created_date: DateTimeUtc,
    pub updated_date: DateTimeUtc,
    /// Soft-disable flag; inactive courses are hidden from buyers
    pub is_active: bool,
    /// Comma-separated payment-method allow-list overriding the global config
    pub payment_options: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Payment entity - Proof-of-payment submissions and their review status.
//!
//! A payment is created when a buyer submits proof (a screenshot or a gift
//! card code) and is mutated only by the approval workflow. Status moves one
//! way: `pending` to `approved` or `rejected`; both outcomes are terminal.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How the buyer claims to have paid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "upi")]
    Upi,
    #[sea_orm(string_value = "crypto")]
    Crypto,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "cod")]
    Cod,
    #[sea_orm(string_value = "gift")]
    Gift,
}

impl PaymentMethod {
    /// Wire/config name for this method (`upi`, `crypto`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::Crypto => "crypto",
            Self::Paypal => "paypal",
            Self::Cod => "cod",
            Self::Gift => "gift",
        }
    }

    /// Parses the wire/config name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "upi" => Some(Self::Upi),
            "crypto" => Some(Self::Crypto),
            "paypal" => Some(Self::Paypal),
            "cod" => Some(Self::Cod),
            "gift" | "gift_card" => Some(Self::Gift),
            _ => None,
        }
    }

    /// Human-readable label used on payment buttons.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upi => "UPI Payment",
            Self::Crypto => "Cryptocurrency",
            Self::Paypal => "PayPal",
            Self::Cod => "Cash on Delivery",
            Self::Gift => "Gift Card",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review status of a payment. Transitions are one-directional:
/// `Pending` to `Approved` or `Rejected`, nothing else.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, DeriveActiveEnum, EnumIter)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl PaymentStatus {
    /// Whether the status is terminal (no further transitions allowed).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub payment_method: PaymentMethod,
    /// Filename of the stored proof image; None for gift card submissions
    pub payment_proof: Option<String>,
    /// MD5 hex digest of the proof image, used for duplicate detection
    pub proof_hash: Option<String>,
    pub amount: f64,
    pub status: PaymentStatus,
    pub submission_date: DateTimeUtc,
    /// Stamped exactly once, when the payment is approved
    pub approval_date: Option<DateTimeUtc>,
    /// Free-text details, e.g. `Gift Card Code: ABC123` plus redemption marker
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
}

impl Model {
    /// Extracts the gift card code from `details`, stripping the redemption
    /// marker if present. Returns None for non-gift payments.
    #[must_use]
    pub fn gift_card_code(&self) -> Option<String> {
        if self.payment_method != PaymentMethod::Gift {
            return None;
        }
        let details = self.details.as_deref()?;
        let code = details.strip_prefix("Gift Card Code:")?.trim();
        Some(code.replace("[REDEEMED]", "").trim().to_string())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

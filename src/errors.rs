//! Unified error types and result handling.
//!
//! Every failure the storefront can recover from has a variant here. Handlers
//! catch these at the chat boundary and turn them into a guidance message;
//! nothing in this enum is allowed to crash the process.

use thiserror::Error;

/// All errors produced by the storefront core and its adapters.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Course {id} not found")]
    CourseNotFound { id: i32 },

    #[error("Category {id} not found")]
    CategoryNotFound { id: i32 },

    #[error("Payment {id} not found")]
    PaymentNotFound { id: i32 },

    #[error("User {telegram_id} not found")]
    UserNotFound { telegram_id: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid price: {price}")]
    InvalidPrice { price: f64 },

    #[error("Course has {count} associated payments and cannot be deleted")]
    CourseHasPayments { count: u64 },

    #[error("Duplicate payment proof submission")]
    DuplicateSubmission,

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Chat delivery error: {0}")]
    Delivery(Box<teloxide::RequestError>),

    #[error("File download error: {0}")]
    Download(Box<teloxide::DownloadError>),
}

impl From<teloxide::RequestError> for Error {
    fn from(value: teloxide::RequestError) -> Self {
        Error::Delivery(Box::new(value))
    }
}

impl From<teloxide::DownloadError> for Error {
    fn from(value: teloxide::DownloadError) -> Self {
        Error::Download(Box::new(value))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

//! Core business logic - framework-agnostic storefront operations.
//!
//! Everything in here works against a plain `DatabaseConnection` and knows
//! nothing about the chat transport, which keeps the catalog, user, and
//! approval logic directly testable.

/// Back-office credential management
pub mod admin;
/// Category management and the category browse queries
pub mod category;
/// Course management, listing, and search
pub mod course;
/// Append-only action logging
pub mod log;
/// Payment submission and the approval workflow
pub mod payment;
/// Buyer course requests
pub mod request;
/// Key/value bot settings
pub mod settings;
/// Buyer records and the ban flag
pub mod user;

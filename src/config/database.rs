//! Database configuration module.
//!
//! Handles the `SQLite` connection and table creation using `SeaORM`. Tables
//! are generated from the entity definitions via
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::entities::{Admin, BotSetting, Category, Course, CourseRequest, Log, Payment, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from the environment or falls back to a local
/// `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/coursebot.sqlite".to_string())
}

/// Establishes the database connection using [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all storefront tables from the entity definitions.
///
/// Idempotency is left to the caller; this is run once at startup against a
/// fresh or already-migrated file and unconditionally in tests against
/// in-memory databases.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let category_table = schema.create_table_from_entity(Category);
    let user_table = schema.create_table_from_entity(User);
    let course_table = schema.create_table_from_entity(Course);
    let payment_table = schema.create_table_from_entity(Payment);
    let log_table = schema.create_table_from_entity(Log);
    let admin_table = schema.create_table_from_entity(Admin);
    let setting_table = schema.create_table_from_entity(BotSetting);
    let request_table = schema.create_table_from_entity(CourseRequest);

    db.execute(builder.build(&category_table)).await?;
    db.execute(builder.build(&user_table)).await?;
    db.execute(builder.build(&course_table)).await?;
    db.execute(builder.build(&payment_table)).await?;
    db.execute(builder.build(&log_table)).await?;
    db.execute(builder.build(&admin_table)).await?;
    db.execute(builder.build(&setting_table)).await?;
    db.execute(builder.build(&request_table)).await?;

    Ok(())
}

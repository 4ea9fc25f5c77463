//! Append-only action log.
//!
//! Every tracked user action lands here with a short tag and optional
//! free-text details. Rows are never mutated or deleted.

use crate::{
    entities::{Log, log},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Appends one action to the log.
pub async fn record(
    db: &DatabaseConnection,
    telegram_id: Option<&str>,
    action: &str,
    details: Option<&str>,
) -> Result<log::Model> {
    let entry = log::ActiveModel {
        telegram_id: Set(telegram_id.map(ToString::to_string)),
        action: Set(action.to_string()),
        timestamp: Set(chrono::Utc::now()),
        details: Set(details.map(ToString::to_string)),
        ..Default::default()
    };

    entry.insert(db).await.map_err(Into::into)
}

/// Returns a user's logged actions, newest first.
pub async fn for_user(db: &DatabaseConnection, telegram_id: &str) -> Result<Vec<log::Model>> {
    Log::find()
        .filter(log::Column::TelegramId.eq(telegram_id))
        .order_by_desc(log::Column::Timestamp)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_record_and_query() -> Result<()> {
        let db = setup_test_db().await?;

        record(&db, Some("1001"), "command_start", None).await?;
        record(&db, Some("1001"), "view_course", Some("Viewed course: Rust 101")).await?;
        record(&db, Some("2002"), "command_start", None).await?;

        let entries = for_user(&db, "1001").await?;
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].action, "view_course");
        assert_eq!(entries[0].details.as_deref(), Some("Viewed course: Rust 101"));

        Ok(())
    }

    #[tokio::test]
    async fn test_record_without_user() -> Result<()> {
        let db = setup_test_db().await?;

        let entry = record(&db, None, "startup", None).await?;
        assert!(entry.telegram_id.is_none());

        Ok(())
    }
}

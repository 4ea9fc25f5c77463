//! Buyer records.
//!
//! Users are created lazily on first interaction and never deleted. Banning
//! is a soft flag surfaced to the back-office; the chat flow does not act on
//! it (see DESIGN.md for the open question around enforcement).

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Identity details the chat platform hands us with every event.
#[derive(Debug, Clone)]
pub struct ChatProfile {
    /// Platform identity as a string, unique per user
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Finds a user by platform identity.
pub async fn get_by_telegram_id(
    db: &DatabaseConnection,
    telegram_id: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::TelegramId.eq(telegram_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the existing user for this profile, creating one on first contact.
///
/// New users are logged with a `user_joined` action so the back-office can
/// see signups.
pub async fn get_or_create(db: &DatabaseConnection, profile: &ChatProfile) -> Result<user::Model> {
    if let Some(existing) = get_by_telegram_id(db, &profile.telegram_id).await? {
        return Ok(existing);
    }

    let created = user::ActiveModel {
        telegram_id: Set(profile.telegram_id.clone()),
        username: Set(profile.username.clone()),
        first_name: Set(profile.first_name.clone()),
        last_name: Set(profile.last_name.clone()),
        joined_date: Set(chrono::Utc::now()),
        is_banned: Set(false),
        ban_reason: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    crate::core::log::record(
        db,
        Some(&profile.telegram_id),
        "user_joined",
        Some(&format!(
            "New user joined: {} {} (@{})",
            profile.first_name.as_deref().unwrap_or(""),
            profile.last_name.as_deref().unwrap_or(""),
            profile.username.as_deref().unwrap_or("-"),
        )),
    )
    .await?;

    Ok(created)
}

/// All users, newest signups first.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::JoinedDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Flags a user as banned with a reason. The user record stays in place.
pub async fn ban(db: &DatabaseConnection, user_id: i32, reason: &str) -> Result<user::Model> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            telegram_id: user_id.to_string(),
        })?;

    let mut active: user::ActiveModel = user.into();
    active.is_banned = Set(true);
    active.ban_reason = Set(Some(reason.to_string()));
    active.update(db).await.map_err(Into::into)
}

/// Clears the ban flag and reason.
pub async fn unban(db: &DatabaseConnection, user_id: i32) -> Result<user::Model> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            telegram_id: user_id.to_string(),
        })?;

    let mut active: user::ActiveModel = user.into();
    active.is_banned = Set(false);
    active.ban_reason = Set(None);
    active.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{setup_test_db, test_profile};

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let profile = test_profile("1001");

        let first = get_or_create(&db, &profile).await?;
        let second = get_or_create(&db, &profile).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(User::find().all(&db).await?.len(), 1);

        // Signup was logged exactly once
        let log_entries = crate::core::log::for_user(&db, "1001").await?;
        assert_eq!(log_entries.len(), 1);
        assert_eq!(log_entries[0].action, "user_joined");

        Ok(())
    }

    #[tokio::test]
    async fn test_ban_and_unban() -> Result<()> {
        let db = setup_test_db().await?;
        let user = get_or_create(&db, &test_profile("1001")).await?;
        assert!(!user.is_banned);

        let banned = ban(&db, user.id, "spam").await?;
        assert!(banned.is_banned);
        assert_eq!(banned.ban_reason.as_deref(), Some("spam"));

        let unbanned = unban(&db, user.id).await?;
        assert!(!unbanned.is_banned);
        assert!(unbanned.ban_reason.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_ban_missing_user() -> Result<()> {
        let db = setup_test_db().await?;

        let result = ban(&db, 999, "spam").await;
        assert!(matches!(result.unwrap_err(), Error::UserNotFound { .. }));

        Ok(())
    }
}

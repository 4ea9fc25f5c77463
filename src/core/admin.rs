//! Back-office credential management.
//!
//! Admin accounts gate the web back-office. Passwords are stored as bcrypt
//! hashes; verification stamps `last_login` on success.

use crate::{
    entities::{Admin, admin},
    errors::{Error, Result},
};
use bcrypt::{DEFAULT_COST, hash, verify};
use sea_orm::{Condition, Set, prelude::*};

/// Creates an admin account with a freshly hashed password.
///
/// Username and email must be unique; duplicates are rejected before the
/// insert so the caller gets a readable validation error instead of a raw
/// constraint violation.
pub async fn create(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    email: &str,
) -> Result<admin::Model> {
    if username.trim().is_empty() || password.is_empty() || email.trim().is_empty() {
        return Err(Error::Validation {
            message: "Username, password, and email are all required".to_string(),
        });
    }

    let clash = Admin::find()
        .filter(
            Condition::any()
                .add(admin::Column::Username.eq(username.trim()))
                .add(admin::Column::Email.eq(email.trim())),
        )
        .one(db)
        .await?;
    if clash.is_some() {
        return Err(Error::Validation {
            message: "An admin with this username or email already exists".to_string(),
        });
    }

    admin::ActiveModel {
        username: Set(username.trim().to_string()),
        password_hash: Set(hash(password, DEFAULT_COST)?),
        email: Set(email.trim().to_string()),
        created_date: Set(chrono::Utc::now()),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Checks a username/password pair. On success the admin's `last_login` is
/// stamped and the updated row returned; on failure `None`.
pub async fn verify_credentials(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<admin::Model>> {
    let Some(admin) = Admin::find()
        .filter(admin::Column::Username.eq(username))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if !verify(password, &admin.password_hash)? {
        return Ok(None);
    }

    let mut active: admin::ActiveModel = admin.into();
    active.last_login = Set(Some(chrono::Utc::now()));
    active.update(db).await.map(Some).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_create_and_verify() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create(&db, "root", "hunter2!", "root@example.com").await?;
        assert!(created.last_login.is_none());
        assert_ne!(created.password_hash, "hunter2!");

        let verified = verify_credentials(&db, "root", "hunter2!").await?;
        assert!(verified.is_some());
        assert!(verified.unwrap().last_login.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        create(&db, "root", "hunter2!", "root@example.com").await?;

        assert!(verify_credentials(&db, "root", "wrong").await?.is_none());
        assert!(verify_credentials(&db, "nobody", "hunter2!").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        create(&db, "root", "hunter2!", "root@example.com").await?;

        let result = create(&db, "root", "other", "second@example.com").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }
}

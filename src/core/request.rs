//! Buyer course requests.
//!
//! Buyers can ask for courses the store does not carry yet. The back-office
//! either marks a request fulfilled or deletes it.

use crate::{
    entities::{CourseRequest, course_request},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Persists a new course request for the given user.
pub async fn create(
    db: &DatabaseConnection,
    user_id: i32,
    request_text: &str,
) -> Result<course_request::Model> {
    if request_text.trim().is_empty() {
        return Err(Error::Validation {
            message: "Course request text cannot be empty".to_string(),
        });
    }

    course_request::ActiveModel {
        user_id: Set(user_id),
        request_text: Set(request_text.trim().to_string()),
        timestamp: Set(chrono::Utc::now()),
        is_fulfilled: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// All requests, open ones first, newest first within each group.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<course_request::Model>> {
    CourseRequest::find()
        .order_by_asc(course_request::Column::IsFulfilled)
        .order_by_desc(course_request::Column::Timestamp)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks a request as fulfilled.
pub async fn fulfill(db: &DatabaseConnection, request_id: i32) -> Result<course_request::Model> {
    let request = CourseRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::Validation {
            message: format!("Course request {request_id} not found"),
        })?;

    let mut active: course_request::ActiveModel = request.into();
    active.is_fulfilled = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Removes a request entirely.
pub async fn delete(db: &DatabaseConnection, request_id: i32) -> Result<()> {
    let request = CourseRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::Validation {
            message: format!("Course request {request_id} not found"),
        })?;

    request.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{setup_test_db, test_profile};

    #[tokio::test]
    async fn test_create_fulfill_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let user = crate::core::user::get_or_create(&db, &test_profile("1001")).await?;

        let request = create(&db, user.id, "Advanced SQL by Jane Doe").await?;
        assert!(!request.is_fulfilled);

        let fulfilled = fulfill(&db, request.id).await?;
        assert!(fulfilled.is_fulfilled);

        delete(&db, request.id).await?;
        assert!(list(&db).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_empty_text() -> Result<()> {
        let db = setup_test_db().await?;
        let user = crate::core::user::get_or_create(&db, &test_profile("1001")).await?;

        let result = create(&db, user.id, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_open_requests_first() -> Result<()> {
        let db = setup_test_db().await?;
        let user = crate::core::user::get_or_create(&db, &test_profile("1001")).await?;

        let first = create(&db, user.id, "Request A").await?;
        let second = create(&db, user.id, "Request B").await?;
        fulfill(&db, first.id).await?;

        let all = list(&db).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert!(all[1].is_fulfilled);

        Ok(())
    }
}

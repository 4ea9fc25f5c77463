//! Category management and the category browse queries.
//!
//! Category names are unique case-insensitively. Deleting a category never
//! deletes courses: referencing courses get their category cleared first.

use crate::{
    entities::{Category, Course, category, course},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// A category together with its number of active courses, as shown in the
/// category browse menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryListing {
    pub category: category::Model,
    pub active_courses: u64,
}

async fn find_by_name_ci(
    db: &DatabaseConnection,
    name: &str,
    exclude_id: Option<i32>,
) -> Result<Option<category::Model>> {
    let mut query = Category::find().filter(
        Expr::expr(Func::lower(Expr::col(category::Column::Name))).eq(name.trim().to_lowercase()),
    );
    if let Some(id) = exclude_id {
        query = query.filter(category::Column::Id.ne(id));
    }
    query.one(db).await.map_err(Into::into)
}

/// Creates a category, rejecting names that clash case-insensitively.
pub async fn create(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }
    if find_by_name_ci(db, name, None).await?.is_some() {
        return Err(Error::Validation {
            message: format!("Category '{name}' already exists"),
        });
    }

    category::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Renames a category, with the same case-insensitive uniqueness check
/// (excluding the category itself).
pub async fn rename(db: &DatabaseConnection, category_id: i32, name: &str) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Category name cannot be empty".to_string(),
        });
    }

    let category = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;

    if find_by_name_ci(db, name, Some(category_id)).await?.is_some() {
        return Err(Error::Validation {
            message: format!("Another category named '{name}' already exists"),
        });
    }

    let mut active: category::ActiveModel = category.into();
    active.name = Set(name.to_string());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a category and unassigns every course that referenced it.
/// Courses themselves are never deleted here.
pub async fn delete(db: &DatabaseConnection, category_id: i32) -> Result<()> {
    let category = Category::find_by_id(category_id)
        .one(db)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;

    let txn = db.begin().await?;

    Course::update_many()
        .col_expr(course::Column::CategoryId, Expr::value(Option::<i32>::None))
        .filter(course::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?;

    category.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Finds a category by id.
pub async fn get_by_id(db: &DatabaseConnection, category_id: i32) -> Result<Option<category::Model>> {
    Category::find_by_id(category_id).one(db).await.map_err(Into::into)
}

/// All categories ordered by name, for the back-office listing.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<category::Model>> {
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Categories that have at least one active course, ordered by name, each
/// with its active-course count. Empty categories never reach the menu.
pub async fn with_active_courses(db: &DatabaseConnection) -> Result<Vec<CategoryListing>> {
    let mut listings = Vec::new();
    for category in list(db).await? {
        let active_courses = Course::find()
            .filter(course::Column::CategoryId.eq(category.id))
            .filter(course::Column::IsActive.eq(true))
            .count(db)
            .await?;
        if active_courses > 0 {
            listings.push(CategoryListing {
                category,
                active_courses,
            });
        }
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_category, create_test_course, setup_test_db};

    #[tokio::test]
    async fn test_create_rejects_case_insensitive_duplicate() -> Result<()> {
        let db = setup_test_db().await?;

        create(&db, "Data Science").await?;
        let result = create(&db, "data science").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create(&db, "  DATA SCIENCE  ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_rename_keeps_uniqueness() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create(&db, "Programming").await?;
        create(&db, "Design").await?;

        let result = rename(&db, first.id, "DESIGN").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Renaming to a different casing of itself is allowed
        let renamed = rename(&db, first.id, "programming").await?;
        assert_eq!(renamed.name, "programming");

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unassigns_courses() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Programming").await?;

        let course_a = create_test_course(&db, "Rust 101", 29.99, Some(category.id)).await?;
        let course_b = create_test_course(&db, "Go 101", 19.99, Some(category.id)).await?;

        delete(&db, category.id).await?;

        // Both courses survive with their category reference cleared
        let a = Course::find_by_id(course_a.id).one(&db).await?.unwrap();
        let b = Course::find_by_id(course_b.id).one(&db).await?.unwrap();
        assert!(a.category_id.is_none());
        assert!(b.category_id.is_none());
        assert!(Category::find_by_id(category.id).one(&db).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_category() -> Result<()> {
        let db = setup_test_db().await?;

        let result = delete(&db, 999).await;
        assert!(matches!(result.unwrap_err(), Error::CategoryNotFound { id: 999 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_menu_hides_empty_categories() -> Result<()> {
        let db = setup_test_db().await?;
        let full = create_test_category(&db, "Programming").await?;
        create_test_category(&db, "Empty").await?;
        let inactive_only = create_test_category(&db, "Archived").await?;

        create_test_course(&db, "Rust 101", 29.99, Some(full.id)).await?;
        create_test_course(&db, "Go 101", 19.99, Some(full.id)).await?;

        let retired = create_test_course(&db, "COBOL 101", 9.99, Some(inactive_only.id)).await?;
        crate::core::course::set_active(&db, retired.id, false).await?;

        let menu = with_active_courses(&db).await?;
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].category.id, full.id);
        assert_eq!(menu[0].active_courses, 2);

        Ok(())
    }
}

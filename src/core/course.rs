//! Course management, listing, and search.
//!
//! All buyer-facing queries are restricted to active courses. Saving a course
//! validates the free/price invariant up front so an invalid draft never
//! touches the database.

use crate::{
    config::PaymentConfig,
    entities::{Course, Payment, PaymentMethod, category, course, payment},
    errors::{Error, Result},
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{Condition, JoinType, QueryOrder, QuerySelect, Set, prelude::*};

/// Editable course fields, as submitted by the back-office form.
#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub file_link: String,
    pub category_id: Option<i32>,
    pub image_link: Option<String>,
    pub qr_code_image: Option<String>,
    pub is_free: bool,
    pub demo_video_link: Option<String>,
    pub is_active: bool,
    pub payment_options: Option<String>,
}

impl Default for CourseDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            price: 0.0,
            file_link: String::new(),
            category_id: None,
            image_link: None,
            qr_code_image: None,
            is_free: false,
            demo_video_link: None,
            is_active: true,
            payment_options: None,
        }
    }
}

fn validate(draft: &CourseDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(Error::Validation {
            message: "Course title cannot be empty".to_string(),
        });
    }
    if draft.file_link.trim().is_empty() {
        return Err(Error::Validation {
            message: "Course file link is required".to_string(),
        });
    }
    if !draft.price.is_finite() || draft.price < 0.0 {
        return Err(Error::InvalidPrice { price: draft.price });
    }
    // Paid courses must cost something
    if !draft.is_free && draft.price <= 0.0 {
        return Err(Error::InvalidPrice { price: draft.price });
    }
    Ok(())
}

/// Creates a course after validating the draft. Nothing is written when
/// validation fails.
pub async fn create(db: &DatabaseConnection, draft: CourseDraft) -> Result<course::Model> {
    validate(&draft)?;

    let now = chrono::Utc::now();
    course::ActiveModel {
        title: Set(draft.title.trim().to_string()),
        description: Set(draft.description),
        price: Set(draft.price),
        file_link: Set(draft.file_link.trim().to_string()),
        category_id: Set(draft.category_id),
        image_link: Set(draft.image_link),
        qr_code_image: Set(draft.qr_code_image),
        is_free: Set(draft.is_free),
        demo_video_link: Set(draft.demo_video_link),
        created_date: Set(now),
        updated_date: Set(now),
        is_active: Set(draft.is_active),
        payment_options: Set(draft.payment_options),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Replaces an existing course's editable fields with the draft.
pub async fn update(
    db: &DatabaseConnection,
    course_id: i32,
    draft: CourseDraft,
) -> Result<course::Model> {
    validate(&draft)?;

    let existing = Course::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or(Error::CourseNotFound { id: course_id })?;

    let mut active: course::ActiveModel = existing.into();
    active.title = Set(draft.title.trim().to_string());
    active.description = Set(draft.description);
    active.price = Set(draft.price);
    active.file_link = Set(draft.file_link.trim().to_string());
    active.category_id = Set(draft.category_id);
    active.image_link = Set(draft.image_link);
    active.qr_code_image = Set(draft.qr_code_image);
    active.is_free = Set(draft.is_free);
    active.demo_video_link = Set(draft.demo_video_link);
    active.is_active = Set(draft.is_active);
    active.payment_options = Set(draft.payment_options);
    active.updated_date = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Flips the soft-disable flag.
pub async fn set_active(db: &DatabaseConnection, course_id: i32, active: bool) -> Result<course::Model> {
    let existing = Course::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or(Error::CourseNotFound { id: course_id })?;

    let mut model: course::ActiveModel = existing.into();
    model.is_active = Set(active);
    model.updated_date = Set(chrono::Utc::now());
    model.update(db).await.map_err(Into::into)
}

/// Hard-deletes a course. Blocked while any payment references it; the
/// back-office is told to mark the course inactive instead.
pub async fn delete(db: &DatabaseConnection, course_id: i32) -> Result<()> {
    let course = Course::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or(Error::CourseNotFound { id: course_id })?;

    let payment_count = Payment::find()
        .filter(payment::Column::CourseId.eq(course_id))
        .count(db)
        .await?;
    if payment_count > 0 {
        return Err(Error::CourseHasPayments {
            count: payment_count,
        });
    }

    course.delete(db).await?;
    Ok(())
}

/// Finds a course by id regardless of the active flag. Used once a buyer has
/// already selected the course.
pub async fn get_by_id(db: &DatabaseConnection, course_id: i32) -> Result<Option<course::Model>> {
    Course::find_by_id(course_id).one(db).await.map_err(Into::into)
}

/// Finds an active course by id, as buyer-facing menus require.
pub async fn get_active(db: &DatabaseConnection, course_id: i32) -> Result<Option<course::Model>> {
    Course::find_by_id(course_id)
        .filter(course::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All active courses in insertion order, for the catalog listing.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<course::Model>> {
    Course::find()
        .filter(course::Column::IsActive.eq(true))
        .order_by_asc(course::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active courses in a category, ordered by title.
pub async fn list_active_in_category(
    db: &DatabaseConnection,
    category_id: i32,
) -> Result<Vec<course::Model>> {
    Course::find()
        .filter(course::Column::CategoryId.eq(category_id))
        .filter(course::Column::IsActive.eq(true))
        .order_by_asc(course::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Free-text search over active courses: case-insensitive substring match on
/// the course title or on the name of its category, ordered by title.
///
/// Matching on the category name is what lets a search for "data science"
/// surface a course titled "Advanced Machine Learning" filed under that
/// category.
pub async fn search_active(db: &DatabaseConnection, query: &str) -> Result<Vec<course::Model>> {
    let pattern = format!("%{}%", query.trim().to_lowercase());

    Course::find()
        .join(JoinType::LeftJoin, course::Relation::Category.def())
        .filter(course::Column::IsActive.eq(true))
        .filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col((course::Entity, course::Column::Title))))
                        .like(&pattern),
                )
                .add(
                    Expr::expr(Func::lower(Expr::col((
                        category::Entity,
                        category::Column::Name,
                    ))))
                    .like(&pattern),
                ),
        )
        .order_by_asc(course::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The payment methods a buyer may pick for this course: the course-level
/// allow-list when set, otherwise everything the global config enables.
#[must_use]
pub fn eligible_payment_methods(
    course: &course::Model,
    payments: &PaymentConfig,
) -> Vec<PaymentMethod> {
    let from_course: Vec<PaymentMethod> = course
        .payment_options
        .as_deref()
        .unwrap_or("")
        .split(',')
        .filter_map(PaymentMethod::parse)
        .collect();

    if from_course.is_empty() {
        payments.enabled_methods()
    } else {
        from_course
    }
}

//! Payment submission and the approval workflow.
//!
//! Submissions always enter as `Pending`. `approve` and `reject` are the only
//! ways out, both are terminal, and both are safe to call twice: a payment
//! that already reached a terminal status is returned unchanged instead of
//! being flipped or re-stamped.

use crate::{
    entities::{Payment, PaymentMethod, PaymentStatus, payment},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Marker appended to a gift payment's details when its code is redeemed
/// during approval.
const REDEEMED_MARKER: &str = "[REDEEMED]";

/// Outcome of an [`approve`] or [`reject`] call: the stored row plus whether
/// this call performed the status transition. Concurrent calls on the same
/// payment race on a conditional update, so exactly one of them observes
/// `performed == true`.
#[derive(Debug)]
pub struct Transition {
    pub payment: payment::Model,
    pub performed: bool,
}

/// Records a proof-of-payment submission (a stored screenshot).
///
/// `proof_hash` is the fingerprint of the uploaded image. If this user has
/// already submitted a payment with the same fingerprint, the submission is
/// rejected as a duplicate and nothing is written.
pub async fn submit_proof(
    db: &DatabaseConnection,
    user_id: i32,
    course_id: i32,
    method: PaymentMethod,
    amount: f64,
    proof_filename: &str,
    proof_hash: &str,
) -> Result<payment::Model> {
    if is_duplicate_proof(db, user_id, proof_hash).await? {
        return Err(Error::DuplicateSubmission);
    }

    payment::ActiveModel {
        user_id: Set(user_id),
        course_id: Set(course_id),
        payment_method: Set(method),
        payment_proof: Set(Some(proof_filename.to_string())),
        proof_hash: Set(Some(proof_hash.to_string())),
        amount: Set(amount),
        status: Set(PaymentStatus::Pending),
        submission_date: Set(chrono::Utc::now()),
        approval_date: Set(None),
        details: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records a gift card submission. The code is kept in `details` in the
/// `Gift Card Code: <code>` form the back-office displays.
pub async fn submit_gift_code(
    db: &DatabaseConnection,
    user_id: i32,
    course_id: i32,
    amount: f64,
    code: &str,
) -> Result<payment::Model> {
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::Validation {
            message: "Gift card code cannot be empty".to_string(),
        });
    }

    payment::ActiveModel {
        user_id: Set(user_id),
        course_id: Set(course_id),
        payment_method: Set(PaymentMethod::Gift),
        payment_proof: Set(None),
        proof_hash: Set(None),
        amount: Set(amount),
        status: Set(PaymentStatus::Pending),
        submission_date: Set(chrono::Utc::now()),
        approval_date: Set(None),
        details: Set(Some(format!("Gift Card Code: {code}"))),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Whether the user has already submitted a proof image with this
/// fingerprint. Callers can check this before storing the image so a refused
/// duplicate leaves nothing on disk.
pub async fn is_duplicate_proof(
    db: &DatabaseConnection,
    user_id: i32,
    proof_hash: &str,
) -> Result<bool> {
    let count = Payment::find()
        .filter(payment::Column::UserId.eq(user_id))
        .filter(payment::Column::ProofHash.eq(proof_hash))
        .count(db)
        .await?;
    Ok(count > 0)
}

async fn require(db: &DatabaseConnection, payment_id: i32) -> Result<payment::Model> {
    Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or(Error::PaymentNotFound { id: payment_id })
}

/// Claims the pending -> `to` transition for one payment. The status filter
/// makes the claim atomic: of any number of concurrent callers, exactly one
/// sees a row affected.
async fn claim_transition(
    db: &DatabaseConnection,
    payment_id: i32,
    to: PaymentStatus,
) -> Result<bool> {
    let mut update = Payment::update_many()
        .col_expr(payment::Column::Status, Expr::value(to))
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending));
    if to == PaymentStatus::Approved {
        update = update.col_expr(
            payment::Column::ApprovalDate,
            Expr::value(Some(chrono::Utc::now())),
        );
    }
    Ok(update.exec(db).await?.rows_affected > 0)
}

/// Approves a pending payment: stamps `approval_date` and, for gift payments,
/// marks the code redeemed in `details` exactly once.
///
/// The transition itself is a single conditional update, so a double-tapped
/// approval (or two concurrent ones) cannot re-stamp the date, re-append the
/// redemption marker, or both report having performed the approval.
pub async fn approve(db: &DatabaseConnection, payment_id: i32) -> Result<Transition> {
    require(db, payment_id).await?;
    let performed = claim_transition(db, payment_id, PaymentStatus::Approved).await?;
    let payment = require(db, payment_id).await?;

    // Only the claiming call redeems the gift code
    if performed && payment.payment_method == PaymentMethod::Gift {
        if let Some(details) = &payment.details {
            if !details.contains(REDEEMED_MARKER) {
                let redeemed = format!("{details} {REDEEMED_MARKER}");
                let mut active: payment::ActiveModel = payment.into();
                active.details = Set(Some(redeemed));
                return Ok(Transition {
                    payment: active.update(db).await?,
                    performed,
                });
            }
        }
    }

    Ok(Transition { payment, performed })
}

/// Rejects a pending payment. Same guard as [`approve`]: terminal payments
/// are left unchanged and `performed` is false.
pub async fn reject(db: &DatabaseConnection, payment_id: i32) -> Result<Transition> {
    require(db, payment_id).await?;
    let performed = claim_transition(db, payment_id, PaymentStatus::Rejected).await?;
    let payment = require(db, payment_id).await?;
    Ok(Transition { payment, performed })
}

/// Finds a payment by id.
pub async fn get_by_id(db: &DatabaseConnection, payment_id: i32) -> Result<Option<payment::Model>> {
    Payment::find_by_id(payment_id).one(db).await.map_err(Into::into)
}

/// Payments awaiting review, oldest first so the queue drains in order.
pub async fn list_pending(db: &DatabaseConnection) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .order_by_asc(payment::Column::SubmissionDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A user's approved purchases, newest first.
pub async fn purchases_for_user(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<payment::Model>> {
    Payment::find()
        .filter(payment::Column::UserId.eq(user_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Approved))
        .order_by_desc(payment::Column::SubmissionDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether the user already owns the course (an approved payment exists).
pub async fn has_approved_purchase(
    db: &DatabaseConnection,
    user_id: i32,
    course_id: i32,
) -> Result<bool> {
    let count = Payment::find()
        .filter(payment::Column::UserId.eq(user_id))
        .filter(payment::Column::CourseId.eq(course_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Approved))
        .count(db)
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_course, setup_test_db, test_profile};

    async fn seed(db: &DatabaseConnection) -> Result<(i32, i32)> {
        let user = crate::core::user::get_or_create(db, &test_profile("1001")).await?;
        let course = create_test_course(db, "Rust 101", 29.99, None).await?;
        Ok((user.id, course.id))
    }

    #[tokio::test]
    async fn test_duplicate_proof_rejected_per_user() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;

        submit_proof(&db, user_id, course_id, PaymentMethod::Upi, 29.99, "a.png", "abc123").await?;

        // Same fingerprint from the same user, even for another course
        let other = create_test_course(&db, "Go 101", 19.99, None).await?;
        let result =
            submit_proof(&db, user_id, other.id, PaymentMethod::Upi, 19.99, "b.png", "abc123")
                .await;
        assert!(matches!(result.unwrap_err(), Error::DuplicateSubmission));

        // A different user may submit the same fingerprint
        let second = crate::core::user::get_or_create(&db, &test_profile("1002")).await?;
        submit_proof(&db, second.id, course_id, PaymentMethod::Upi, 29.99, "c.png", "abc123")
            .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_approve_is_terminal_and_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;
        let payment =
            submit_proof(&db, user_id, course_id, PaymentMethod::Upi, 29.99, "a.png", "h1").await?;

        let approved = approve(&db, payment.id).await?;
        assert!(approved.performed);
        assert_eq!(approved.payment.status, PaymentStatus::Approved);
        let first_stamp = approved.payment.approval_date.unwrap();

        // Second approve keeps the original timestamp and claims nothing
        let again = approve(&db, payment.id).await?;
        assert!(!again.performed);
        assert_eq!(again.payment.approval_date.unwrap(), first_stamp);

        // Reject after approve does not flip the status
        let rejected = reject(&db, payment.id).await?;
        assert!(!rejected.performed);
        assert_eq!(rejected.payment.status, PaymentStatus::Approved);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_approvals_claim_once() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;
        let payment =
            submit_proof(&db, user_id, course_id, PaymentMethod::Upi, 29.99, "a.png", "h1").await?;

        let (first, second) = tokio::join!(approve(&db, payment.id), approve(&db, payment.id));
        let (first, second) = (first?, second?);

        // Exactly one of the racing calls performs the transition
        assert!(first.performed ^ second.performed);
        assert_eq!(first.payment.status, PaymentStatus::Approved);
        assert_eq!(second.payment.status, PaymentStatus::Approved);

        Ok(())
    }

    #[tokio::test]
    async fn test_reject_is_terminal() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;
        let payment =
            submit_proof(&db, user_id, course_id, PaymentMethod::Crypto, 29.99, "a.png", "h1")
                .await?;

        assert!(reject(&db, payment.id).await?.performed);
        let flipped = approve(&db, payment.id).await?;
        assert!(!flipped.performed);
        assert_eq!(flipped.payment.status, PaymentStatus::Rejected);
        assert!(flipped.payment.approval_date.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_gift_redemption_marker_appended_once() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;
        let payment = submit_gift_code(&db, user_id, course_id, 29.99, "SAVE20").await?;
        assert_eq!(payment.details.as_deref(), Some("Gift Card Code: SAVE20"));
        assert_eq!(payment.gift_card_code().as_deref(), Some("SAVE20"));

        let approved = approve(&db, payment.id).await?;
        assert_eq!(
            approved.payment.details.as_deref(),
            Some("Gift Card Code: SAVE20 [REDEEMED]")
        );

        // A second approval must not stack another marker
        let again = approve(&db, payment.id).await?;
        assert_eq!(
            again.payment.details.as_deref(),
            Some("Gift Card Code: SAVE20 [REDEEMED]")
        );
        assert_eq!(again.payment.gift_card_code().as_deref(), Some("SAVE20"));

        Ok(())
    }

    #[tokio::test]
    async fn test_purchases_and_ownership() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;

        let pending =
            submit_proof(&db, user_id, course_id, PaymentMethod::Paypal, 29.99, "a.png", "h1")
                .await?;
        assert!(!has_approved_purchase(&db, user_id, course_id).await?);
        assert!(purchases_for_user(&db, user_id).await?.is_empty());

        approve(&db, pending.id).await?;
        assert!(has_approved_purchase(&db, user_id, course_id).await?);
        assert_eq!(purchases_for_user(&db, user_id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_pending_queue_oldest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;

        let first =
            submit_proof(&db, user_id, course_id, PaymentMethod::Upi, 29.99, "a.png", "h1").await?;
        let second =
            submit_proof(&db, user_id, course_id, PaymentMethod::Upi, 29.99, "b.png", "h2").await?;

        let queue = list_pending(&db).await?;
        assert_eq!(queue.len(), 2);
        assert!(queue[0].id == first.id && queue[1].id == second.id);

        approve(&db, first.id).await?;
        assert_eq!(list_pending(&db).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_gift_code_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let (user_id, course_id) = seed(&db).await?;

        let result = submit_gift_code(&db, user_id, course_id, 29.99, "   ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }
}

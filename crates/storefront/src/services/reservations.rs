//! Reservation workflow.
//!
//! Converts a cart snapshot into independent reservation records and then
//! empties the cart, best-effort. The remote collaborator offers no
//! transaction at this granularity, so the workflow is explicitly
//! at-least-partial-success: created reservations are never rolled back,
//! and cart lines are only cleared for lines whose reservation creation
//! succeeded.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use libreria_core::{CartLineId, Email, ReservationId, ReservationStatus};

use crate::gateway::{CollectionGateway, GatewayError, SharedGateway, collections, parse};
use crate::models::{CartLine, CurrentUser, Reservation};

use super::cart::CartService;

/// Errors from reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Submissions require a signed-in principal.
    #[error("reservations require a signed-in user")]
    NotAuthenticated,

    /// An empty submission batch is a validation failure, not a no-op
    /// success.
    #[error("cannot submit a reservation for an empty cart")]
    EmptyCart,

    /// A remote read/write failed outside the documented partial-batch
    /// semantics.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// The line on which a submission stopped.
#[derive(Debug)]
pub struct FailedLine {
    pub title: String,
    pub author: String,
    pub error: GatewayError,
}

/// Result of one submission batch.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// Reservations created, in cart order.
    pub created: Vec<ReservationId>,
    /// First creation failure; lines after it were not attempted and
    /// their cart lines were left untouched.
    pub failed: Option<FailedLine>,
    /// Cart lines cleared after their reservation was created.
    pub cleared: Vec<CartLineId>,
    /// Cart lines whose reservation exists but whose delete failed; they
    /// stay visible in the cart until removed by hand.
    pub stale: Vec<CartLineId>,
    /// Timestamp shared by every reservation in the batch.
    pub created_at: DateTime<Utc>,
    /// Batch marker shared by every reservation in the batch.
    pub batch_id: Uuid,
}

impl SubmitOutcome {
    /// Whether every line was reserved and cleared.
    #[must_use]
    pub fn fully_succeeded(&self) -> bool {
        self.failed.is_none() && self.stale.is_empty()
    }
}

/// What a status change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The reservation already had this status; no write was issued.
    Unchanged,
    /// One field update was issued.
    Updated,
}

/// Reservation workflow over the `reserva` collection.
pub struct ReservationService {
    gateway: SharedGateway,
}

impl ReservationService {
    /// Create a new reservation service.
    #[must_use]
    pub const fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Submit the given cart lines as one reservation batch.
    ///
    /// One `pending` reservation is created per line, sequentially and in
    /// order, all stamped with the same `created_at` and batch id. The
    /// loop stops at the first creation failure; earlier reservations
    /// stay, and only their cart lines are cleared afterwards.
    ///
    /// Stock is deliberately not re-checked here: exhaustion is handled
    /// out-of-band by staff reviewing pending reservations.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a principal, `EmptyCart` for an empty
    /// batch. Mid-batch creation failures are reported in the outcome,
    /// not as an `Err`.
    #[instrument(skip(self, principal, cart, lines), fields(lines = lines.len()))]
    pub async fn submit(
        &self,
        principal: Option<&CurrentUser>,
        cart: &CartService,
        lines: &[CartLine],
    ) -> Result<SubmitOutcome, ReservationError> {
        let user = principal.ok_or(ReservationError::NotAuthenticated)?;
        if lines.is_empty() {
            return Err(ReservationError::EmptyCart);
        }

        // One timestamp for the whole batch so the independent records can
        // still be grouped by submission.
        let created_at = Utc::now();
        let batch_id = Uuid::new_v4();

        let mut created: Vec<ReservationId> = Vec::with_capacity(lines.len());
        let mut reserved_lines: Vec<CartLineId> = Vec::with_capacity(lines.len());
        let mut failed = None;

        for line in lines {
            let fields = Reservation::fields_for_new(line, &user.email, created_at, batch_id);
            match self.gateway.create(collections::RESERVATIONS, fields).await {
                Ok(id) => {
                    created.push(ReservationId::new(id));
                    reserved_lines.push(line.id.clone());
                }
                Err(e) => {
                    warn!(
                        title = %line.title,
                        error = %e,
                        "reservation creation failed mid-batch; earlier reservations stand"
                    );
                    failed = Some(FailedLine {
                        title: line.title.clone(),
                        author: line.author.clone(),
                        error: e,
                    });
                    break;
                }
            }
        }

        // Clear only the lines whose reservation exists. Deletes are
        // independent; a failure leaves a stale line, nothing is retried.
        let mut cleared = Vec::with_capacity(reserved_lines.len());
        let mut stale = Vec::new();
        for line_id in reserved_lines {
            if cart.clear_line_best_effort(&user.uid, &line_id).await {
                cleared.push(line_id);
            } else {
                stale.push(line_id);
            }
        }
        cart.refresh_for(&user.uid).await;

        info!(
            buyer = %user.email,
            created = created.len(),
            partial = failed.is_some(),
            "reservation batch submitted"
        );

        Ok(SubmitOutcome {
            created,
            failed,
            cleared,
            stale,
            created_at,
            batch_id,
        })
    }

    /// List every reservation, optionally filtered by status, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn list(
        &self,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, ReservationError> {
        let docs = self.gateway.list(collections::RESERVATIONS).await?;
        let mut reservations: Vec<Reservation> = docs
            .iter()
            .filter_map(parse::parse_reservation)
            .filter(|r| status.is_none_or(|wanted| r.status == wanted))
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }

    /// List a buyer's reservations, newest first.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn list_for_buyer(&self, email: &Email) -> Result<Vec<Reservation>, ReservationError> {
        let docs = self.gateway.list(collections::RESERVATIONS).await?;
        let mut reservations: Vec<Reservation> = docs
            .iter()
            .filter_map(parse::parse_reservation)
            .filter(|r| r.buyer_email == *email)
            .collect();
        reservations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reservations)
    }

    /// Change a reservation's status.
    ///
    /// Transitions are unguarded (any status may be set from any other),
    /// but a reassignment to the current status skips the write entirely.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        id: &ReservationId,
        current: ReservationStatus,
        new: ReservationStatus,
    ) -> Result<StatusChange, ReservationError> {
        if current == new {
            return Ok(StatusChange::Unchanged);
        }

        self.gateway
            .update(
                collections::RESERVATIONS,
                id.as_str(),
                Reservation::status_patch(new),
            )
            .await?;
        Ok(StatusChange::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{CollectionGateway, MemoryGateway};
    use libreria_core::PrincipalId;
    use std::sync::Arc;

    fn user(uid: &str) -> CurrentUser {
        CurrentUser {
            uid: PrincipalId::new(uid),
            email: Email::parse(&format!("{uid}@example.com")).expect("email"),
            display_name: None,
            photo_url: None,
            id_token: None,
        }
    }

    async fn seeded_cart(
        gateway: &Arc<MemoryGateway>,
        cart: &CartService,
        shopper: &CurrentUser,
        entries: &[(&str, &str, &str, u32)],
    ) -> Vec<CartLine> {
        for (title, author, price, quantity) in entries {
            gateway
                .create(
                    &collections::cart_for(&shopper.uid),
                    serde_json::json!({
                        "title": title,
                        "author": author,
                        "price": price,
                        "quantity": quantity,
                    }),
                )
                .await
                .expect("seed cart line");
        }
        cart.lines(Some(shopper)).await.expect("cart lines")
    }

    #[tokio::test]
    async fn empty_batch_is_a_validation_failure() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway);

        let err = service
            .submit(Some(&user("u1")), &cart, &[])
            .await
            .expect_err("empty cart must fail");
        assert!(matches!(err, ReservationError::EmptyCart));
    }

    #[tokio::test]
    async fn submission_requires_a_principal() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway);

        let err = service
            .submit(None, &cart, &[])
            .await
            .expect_err("must fail");
        assert!(matches!(err, ReservationError::NotAuthenticated));
    }

    #[tokio::test]
    async fn batch_creates_one_pending_reservation_per_line() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway.clone());
        let shopper = user("u1");

        let lines = seeded_cart(
            &gateway,
            &cart,
            &shopper,
            &[
                ("Frankenstein", "Mary Shelley", "29.99", 2),
                ("1984", "George Orwell", "24.99", 1),
            ],
        )
        .await;

        let outcome = service
            .submit(Some(&shopper), &cart, &lines)
            .await
            .expect("submit");
        assert!(outcome.fully_succeeded());
        assert_eq!(outcome.created.len(), 2);

        let reservations = service.list(None).await.expect("list");
        assert_eq!(reservations.len(), 2);
        for r in &reservations {
            assert_eq!(r.status, ReservationStatus::Pending);
            assert_eq!(r.created_at, outcome.created_at);
            assert_eq!(r.batch_id, Some(outcome.batch_id));
        }

        let totals: Vec<String> = reservations.iter().map(|r| r.total.to_string()).collect();
        assert!(totals.contains(&"59.98".to_owned()));
        assert!(totals.contains(&"24.99".to_owned()));

        // Cart is empty afterwards.
        assert!(cart.lines(Some(&shopper)).await.expect("lines").is_empty());
    }

    #[tokio::test]
    async fn mid_batch_failure_keeps_earlier_reservations_and_later_lines() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway.clone());
        let shopper = user("u1");

        let lines = seeded_cart(
            &gateway,
            &cart,
            &shopper,
            &[
                ("A", "First", "10.00", 1),
                ("B", "Second", "10.00", 1),
                ("C", "Third", "10.00", 1),
            ],
        )
        .await;

        // The first creation succeeds, the second fails.
        gateway.fail_creates_after(collections::RESERVATIONS, 1);

        let outcome = service
            .submit(Some(&shopper), &cart, &lines)
            .await
            .expect("submit");
        assert_eq!(outcome.created.len(), 1);
        assert!(outcome.failed.is_some());
        assert_eq!(outcome.cleared.len(), 1);

        // The earlier reservation stands.
        assert_eq!(service.list(None).await.expect("list").len(), 1);

        // Later cart lines were not deleted.
        let remaining = cart.lines(Some(&shopper)).await.expect("lines");
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn failed_cart_clears_leave_stale_lines() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway.clone());
        let shopper = user("u1");

        let lines = seeded_cart(&gateway, &cart, &shopper, &[("A", "First", "10.00", 1)]).await;

        gateway.fail_deletes(&collections::cart_for(&shopper.uid));

        let outcome = service
            .submit(Some(&shopper), &cart, &lines)
            .await
            .expect("submit");
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.stale.len(), 1);
        assert!(!outcome.fully_succeeded());
    }

    #[tokio::test]
    async fn same_status_change_issues_no_write() {
        let gateway = Arc::new(MemoryGateway::new());
        let cart = CartService::new(gateway.clone());
        let service = ReservationService::new(gateway.clone());
        let shopper = user("u1");

        let lines = seeded_cart(&gateway, &cart, &shopper, &[("A", "First", "10.00", 1)]).await;
        let outcome = service
            .submit(Some(&shopper), &cart, &lines)
            .await
            .expect("submit");
        let id = outcome.created.first().expect("created id").clone();

        // No-op reassignment is suppressed before any write: reassigning a
        // nonexistent id to its "current" status succeeds because nothing
        // was issued (a real write would fail with NotFound).
        let missing = ReservationId::new("no-such-doc");
        let change = service
            .change_status(&missing, ReservationStatus::Pending, ReservationStatus::Pending)
            .await
            .expect("no-op change");
        assert_eq!(change, StatusChange::Unchanged);

        let change = service
            .change_status(&id, ReservationStatus::Pending, ReservationStatus::Pending)
            .await
            .expect("no-op change");
        assert_eq!(change, StatusChange::Unchanged);

        // A real change issues exactly one field update, reflected in the
        // next snapshot.
        let change = service
            .change_status(&id, ReservationStatus::Pending, ReservationStatus::Completed)
            .await
            .expect("change");
        assert_eq!(change, StatusChange::Updated);

        let completed = service
            .list(Some(ReservationStatus::Completed))
            .await
            .expect("list");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed.first().expect("reservation").id, id);
    }
}

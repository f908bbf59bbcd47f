//! Reservation record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use libreria_core::{Email, Price, ReservationId, ReservationStatus};

use super::cart::CartLine;

/// One cart line converted into an order-like record at checkout.
///
/// Reservations are independent, individually status-tracked documents;
/// there is no parent "order" entity. Lines submitted together share a
/// `created_at` timestamp and a batch id so they can still be grouped by
/// submission. Immutable once created except for `status`.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub title: String,
    pub author: String,
    pub image: String,
    pub genres: Vec<String>,
    pub description: String,
    pub unit_price: Price,
    pub stock: u32,
    pub quantity: u32,
    pub buyer_email: Email,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    /// `unit_price x quantity` captured at submission; never re-validated
    /// against the current catalog price.
    pub total: Price,
    pub batch_id: Option<Uuid>,
}

impl Reservation {
    /// Document payload for a new pending reservation from a cart line.
    #[must_use]
    pub fn fields_for_new(
        line: &CartLine,
        buyer_email: &Email,
        created_at: DateTime<Utc>,
        batch_id: Uuid,
    ) -> Value {
        json!({
            "title": line.title,
            "author": line.author,
            "image": line.image,
            "genres": line.genres,
            "description": line.description,
            "price": line.unit_price.to_string(),
            "stock": line.stock_at_add,
            "quantity": line.quantity,
            "buyer_email": buyer_email.as_str(),
            "status": ReservationStatus::Pending,
            "created_at": created_at.to_rfc3339(),
            "total": line.line_total().to_string(),
            "batch_id": batch_id,
        })
    }

    /// Patch payload for a status change.
    #[must_use]
    pub fn status_patch(status: ReservationStatus) -> Value {
        json!({ "status": status })
    }
}

//! Parse-and-validate boundary for remote documents.
//!
//! The document store enforces no schema, so nothing beyond this module
//! may trust a raw document's shape. Each parser either produces a typed
//! record (defaulting optional fields) or rejects the document with a
//! warning when an identity-critical field is missing; rejected documents
//! are skipped from snapshots, never allowed to abort one.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use libreria_core::{
    BookId, CartLineId, Email, Price, PrincipalId, ReservationId, ReservationStatus, RoleId,
};

use crate::models::{AboutContent, Book, CartLine, DirectoryEntry, Reservation, UserProfile};

use super::RawDocument;

// =============================================================================
// Field accessors
// =============================================================================

fn string_field(fields: &Value, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn string_field_or_default(fields: &Value, key: &str) -> String {
    string_field(fields, key).unwrap_or_default()
}

fn bool_field(fields: &Value, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn u32_field(fields: &Value, key: &str) -> Option<u32> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// Decimal amounts are accepted as JSON strings or numbers: this
/// application writes strings, but older documents carry numbers.
fn decimal_field(fields: &Value, key: &str) -> Option<Decimal> {
    match fields.get(key)? {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn string_list_field(fields: &Value, key: &str) -> Vec<String> {
    fields
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            let mut list: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();
            // Genres are a set; keep snapshots stable for comparison.
            list.sort();
            list.dedup();
            list
        })
        .unwrap_or_default()
}

/// Timestamps are accepted as RFC 3339 strings or as `{"seconds": n}`
/// maps, the shape the original backend stored.
fn datetime_field(fields: &Value, key: &str) -> Option<DateTime<Utc>> {
    match fields.get(key)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Object(map) => {
            let seconds = map.get("seconds").and_then(Value::as_i64)?;
            Utc.timestamp_opt(seconds, 0).single()
        }
        _ => None,
    }
}

// =============================================================================
// Document parsers
// =============================================================================

/// Parse a catalog document. Requires a non-empty title.
#[must_use]
pub fn parse_book(doc: &RawDocument) -> Option<Book> {
    let title = string_field(&doc.fields, "title").filter(|t| !t.is_empty());
    let Some(title) = title else {
        warn!(id = %doc.id, "skipping catalog document without a title");
        return None;
    };

    Some(Book {
        id: BookId::new(doc.id.clone()),
        title,
        author: string_field_or_default(&doc.fields, "author"),
        price: decimal_field(&doc.fields, "price").map_or_else(Price::zero, Price::new),
        stock: u32_field(&doc.fields, "stock").unwrap_or(0),
        description: string_field_or_default(&doc.fields, "description"),
        image: string_field_or_default(&doc.fields, "image"),
        genres: string_list_field(&doc.fields, "genres"),
        featured: bool_field(&doc.fields, "featured"),
        published: bool_field(&doc.fields, "published"),
        editorial: string_field(&doc.fields, "editorial").filter(|e| !e.is_empty()),
    })
}

/// Parse a cart-line document. Requires a non-empty title; a stored
/// quantity below 1 is clamped to 1 (the store never writes one, but the
/// collection is not schema-enforced).
#[must_use]
pub fn parse_cart_line(doc: &RawDocument) -> Option<CartLine> {
    let title = string_field(&doc.fields, "title").filter(|t| !t.is_empty());
    let Some(title) = title else {
        warn!(id = %doc.id, "skipping cart document without a title");
        return None;
    };

    Some(CartLine {
        id: CartLineId::new(doc.id.clone()),
        title,
        author: string_field_or_default(&doc.fields, "author"),
        unit_price: decimal_field(&doc.fields, "price").map_or_else(Price::zero, Price::new),
        stock_at_add: u32_field(&doc.fields, "stock").unwrap_or(0),
        description: string_field_or_default(&doc.fields, "description"),
        image: string_field_or_default(&doc.fields, "image"),
        genres: string_list_field(&doc.fields, "genres"),
        quantity: u32_field(&doc.fields, "quantity").unwrap_or(1).max(1),
    })
}

/// Parse a reservation document. Requires a title, a parseable status,
/// and a buyer email.
#[must_use]
pub fn parse_reservation(doc: &RawDocument) -> Option<Reservation> {
    let title = string_field(&doc.fields, "title").filter(|t| !t.is_empty());
    let Some(title) = title else {
        warn!(id = %doc.id, "skipping reservation document without a title");
        return None;
    };

    let status = string_field(&doc.fields, "status")
        .and_then(|s| ReservationStatus::from_str(&s).ok());
    let Some(status) = status else {
        warn!(id = %doc.id, "skipping reservation document with missing or invalid status");
        return None;
    };

    let buyer_email =
        string_field(&doc.fields, "buyer_email").and_then(|e| Email::parse(&e).ok());
    let Some(buyer_email) = buyer_email else {
        warn!(id = %doc.id, "skipping reservation document without a buyer email");
        return None;
    };

    let unit_price = decimal_field(&doc.fields, "price").map_or_else(Price::zero, Price::new);
    let quantity = u32_field(&doc.fields, "quantity").unwrap_or(1).max(1);

    Some(Reservation {
        id: ReservationId::new(doc.id.clone()),
        title,
        author: string_field_or_default(&doc.fields, "author"),
        image: string_field_or_default(&doc.fields, "image"),
        genres: string_list_field(&doc.fields, "genres"),
        description: string_field_or_default(&doc.fields, "description"),
        unit_price,
        stock: u32_field(&doc.fields, "stock").unwrap_or(0),
        quantity,
        buyer_email,
        status,
        created_at: datetime_field(&doc.fields, "created_at").unwrap_or_else(|| {
            warn!(id = %doc.id, "reservation document missing created_at, defaulting to epoch");
            Utc.timestamp_opt(0, 0).single().unwrap_or_default()
        }),
        total: decimal_field(&doc.fields, "total")
            .map_or_else(|| unit_price.line_total(quantity), Price::new),
        batch_id: string_field(&doc.fields, "batch_id").and_then(|s| Uuid::parse_str(&s).ok()),
    })
}

/// Parse a user directory document. Requires a principal uid.
#[must_use]
pub fn parse_directory_entry(doc: &RawDocument) -> Option<DirectoryEntry> {
    let uid = string_field(&doc.fields, "uid").filter(|u| !u.is_empty());
    let Some(uid) = uid else {
        warn!(id = %doc.id, "skipping user document without a uid");
        return None;
    };

    Some(DirectoryEntry {
        doc_id: doc.id.clone(),
        uid: PrincipalId::new(uid),
        first_name: string_field_or_default(&doc.fields, "first_name"),
        last_name: string_field_or_default(&doc.fields, "last_name"),
        email: string_field_or_default(&doc.fields, "email"),
        role: string_field(&doc.fields, "role")
            .filter(|r| !r.is_empty())
            .map(RoleId::new),
    })
}

/// Parse the extended profile fields of a user document. Every field
/// defaults.
#[must_use]
pub fn parse_profile(doc: &RawDocument) -> UserProfile {
    UserProfile {
        phone: string_field_or_default(&doc.fields, "phone"),
        address: string_field_or_default(&doc.fields, "address"),
        city: string_field_or_default(&doc.fields, "city"),
        postal_code: string_field_or_default(&doc.fields, "postal_code"),
    }
}

/// Parse the about-page document. Every field defaults.
#[must_use]
pub fn parse_about(doc: &RawDocument) -> AboutContent {
    let defaults = AboutContent::default();
    AboutContent {
        title: string_field(&doc.fields, "title").unwrap_or(defaults.title),
        body: string_field(&doc.fields, "body").unwrap_or(defaults.body),
        contact_email: string_field_or_default(&doc.fields, "contact_email"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> RawDocument {
        RawDocument::new("doc-1".to_owned(), fields)
    }

    #[test]
    fn book_defaults_optional_fields() {
        let book = parse_book(&doc(json!({"title": "1984"}))).expect("book");
        assert_eq!(book.title, "1984");
        assert_eq!(book.stock, 0);
        assert_eq!(book.price, Price::zero());
        assert!(book.genres.is_empty());
        assert!(!book.published);
    }

    #[test]
    fn book_without_title_is_rejected() {
        assert!(parse_book(&doc(json!({"author": "Nobody"}))).is_none());
        assert!(parse_book(&doc(json!({"title": ""}))).is_none());
    }

    #[test]
    fn price_accepts_string_and_number() {
        let from_string = parse_book(&doc(json!({"title": "A", "price": "29.99"}))).expect("book");
        let from_number = parse_book(&doc(json!({"title": "A", "price": 29.99}))).expect("book");
        assert_eq!(from_string.price, from_number.price);
        assert_eq!(from_string.price.to_string(), "29.99");
    }

    #[test]
    fn genres_are_deduplicated_and_sorted() {
        let book = parse_book(&doc(json!({
            "title": "A",
            "genres": ["terror", "fiction", "terror"],
        })))
        .expect("book");
        assert_eq!(book.genres, vec!["fiction", "terror"]);
    }

    #[test]
    fn cart_line_quantity_is_clamped_to_one() {
        let line = parse_cart_line(&doc(json!({"title": "A", "quantity": 0}))).expect("line");
        assert_eq!(line.quantity, 1);
    }

    #[test]
    fn reservation_requires_status_and_email() {
        let valid = doc(json!({
            "title": "A",
            "status": "pending",
            "buyer_email": "b@example.com",
            "price": "24.99",
            "quantity": 2,
        }));
        let reservation = parse_reservation(&valid).expect("reservation");
        assert_eq!(reservation.status, ReservationStatus::Pending);
        // Missing total falls back to price x quantity.
        assert_eq!(reservation.total.to_string(), "49.98");

        assert!(parse_reservation(&doc(json!({"title": "A", "status": "nonsense", "buyer_email": "b@example.com"}))).is_none());
        assert!(parse_reservation(&doc(json!({"title": "A", "buyer_email": "b@example.com"}))).is_none());
        assert!(parse_reservation(&doc(json!({"title": "A", "status": "pending"}))).is_none());
    }

    #[test]
    fn timestamps_accept_both_wire_shapes() {
        let rfc = doc(json!({"created_at": "2026-08-07T12:00:00Z"}));
        let secs = doc(json!({"created_at": {"seconds": 1_754_568_000}}));
        assert!(datetime_field(&rfc.fields, "created_at").is_some());
        assert!(datetime_field(&secs.fields, "created_at").is_some());
    }

    #[test]
    fn directory_entry_requires_uid() {
        assert!(parse_directory_entry(&doc(json!({"email": "a@b.c"}))).is_none());
        let entry = parse_directory_entry(&doc(json!({"uid": "u1", "role": "xyz"}))).expect("entry");
        assert_eq!(entry.role.as_ref().map(libreria_core::RoleId::as_str), Some("xyz"));
    }
}

//! Employee console route handlers.
//!
//! A reduced surface over the same services as the admin console: the
//! catalog is read-only and reservation status management is identical.

pub mod books;
pub mod reservations;

use axum::response::Redirect;

use crate::middleware::RequireEmployee;

/// `/employee` lands on the catalog view.
pub async fn dashboard(RequireEmployee(_employee): RequireEmployee) -> Redirect {
    Redirect::to("/employee/books")
}

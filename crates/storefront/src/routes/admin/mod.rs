//! Admin console route handlers.

pub mod about;
pub mod books;
pub mod reservations;
pub mod roles;

use axum::response::Redirect;

use crate::middleware::RequireAdmin;

/// `/admin` lands on the catalog back office.
pub async fn dashboard(RequireAdmin(_admin): RequireAdmin) -> Redirect {
    Redirect::to("/admin/books")
}

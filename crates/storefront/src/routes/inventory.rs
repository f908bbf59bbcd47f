//! Inventory route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::home::BookView;

/// Inventory page template.
#[derive(Template, WebTemplate)]
#[template(path = "inventory.html")]
pub struct InventoryTemplate {
    pub books: Vec<BookView>,
}

/// Display the full catalog with stock levels. Signed-in users only.
#[instrument(skip(state, _user))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
) -> Result<InventoryTemplate> {
    let books = state.catalog().books().await?;
    Ok(InventoryTemplate {
        books: books.iter().map(BookView::from).collect(),
    })
}

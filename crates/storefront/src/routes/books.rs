//! Book detail and add-to-cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use libreria_core::BookId;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

use super::home::BookView;

/// Book detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "books/show.html")]
pub struct BookShowTemplate {
    pub book: BookView,
    pub signed_in: bool,
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub quantity: Option<u32>,
}

/// Display a book's detail page.
#[instrument(skip(state, principal))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(principal): OptionalAuth,
    Path(id): Path<String>,
) -> Result<BookShowTemplate> {
    let book = state.catalog().get(&BookId::new(id)).await?;
    Ok(BookShowTemplate {
        book: BookView::from(&book),
        signed_in: principal.is_some(),
    })
}

/// Add a book to the cart.
///
/// Anonymous visitors are redirected to authentication instead of
/// attempting the write; the cart service itself enforces the same
/// precondition.
#[instrument(skip(state, principal, form))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    OptionalAuth(principal): OptionalAuth,
    Path(id): Path<String>,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    if principal.is_none() {
        return Ok(Redirect::to("/login").into_response());
    }

    let book = state.catalog().get(&BookId::new(id)).await?;
    state
        .cart()
        .add_item(principal.as_ref(), &book, form.quantity.unwrap_or(1))
        .await?;

    Ok(Redirect::to("/cart").into_response())
}

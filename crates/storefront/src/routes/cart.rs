//! Cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use libreria_core::CartLineId;

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CartLine;
use crate::models::cart::cart_total;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub image: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id.to_string(),
            title: line.title.clone(),
            author: line.author.clone(),
            unit_price: line.unit_price.to_string(),
            quantity: line.quantity,
            line_total: line.line_total().to_string(),
            image: line.image.clone(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub notice: Option<String>,
}

/// Update quantity form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: u32,
}

/// Remove line form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: String,
}

async fn render_cart(state: &AppState, user: &crate::models::CurrentUser, notice: Option<String>) -> Result<CartShowTemplate> {
    let lines = state.cart().lines(Some(user)).await?;
    let total = cart_total(&lines).to_string();
    Ok(CartShowTemplate {
        lines: lines.iter().map(CartLineView::from).collect(),
        total,
        notice,
    })
}

/// Display the cart page with the latest confirmed snapshot.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<CartShowTemplate> {
    render_cart(&state, &user, None).await
}

/// Update a line's quantity. A quantity below 1 removes the line.
#[instrument(skip(state, user, form))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    state
        .cart()
        .set_quantity(Some(&user), &CartLineId::new(form.line_id), form.quantity)
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(state, user, form))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    state
        .cart()
        .remove_item(Some(&user), &CartLineId::new(form.line_id))
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Submit the cart as a reservation batch.
///
/// On full success the browser lands on the profile's reservation list.
/// A partial failure keeps the user on the cart page with an explanation:
/// reservations already created stand, and the remaining lines are still
/// in the cart.
#[instrument(skip(state, user))]
pub async fn reserve(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response> {
    let lines = state.cart().lines(Some(&user)).await?;

    let outcome = match state
        .reservations()
        .submit(Some(&user), state.cart(), &lines)
        .await
    {
        Ok(outcome) => outcome,
        Err(crate::services::reservations::ReservationError::EmptyCart) => {
            let notice = "Add products to the cart before reserving.".to_owned();
            return Ok(render_cart(&state, &user, Some(notice)).await?.into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if outcome.fully_succeeded() {
        return Ok(Redirect::to("/profile").into_response());
    }

    let notice = if outcome.failed.is_some() {
        format!(
            "Only {} of {} items could be reserved; the rest are still in your cart.",
            outcome.created.len(),
            lines.len()
        )
    } else {
        "Your reservation was created, but some items could not be cleared from the cart."
            .to_owned()
    };
    Ok(render_cart(&state, &user, Some(notice)).await?.into_response())
}

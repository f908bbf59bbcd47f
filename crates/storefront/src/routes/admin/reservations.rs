//! Admin reservation management route handlers.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::instrument;

use libreria_core::{ReservationId, ReservationStatus};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::super::profile::ReservationView;

/// Reservation management template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reservations.html")]
pub struct AdminReservationsTemplate {
    pub reservations: Vec<ReservationView>,
    /// Active status filter ("" = all).
    pub filter: String,
    pub statuses: Vec<String>,
    /// POST target prefix, shared with the employee console template.
    pub action_prefix: String,
}

/// Status filter query parameters.
#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub status: Option<String>,
}

/// Status change form data. `current` mirrors the in-memory status the
/// console displayed, so no-op changes can be suppressed without a read.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub current: String,
    pub status: String,
}

pub(crate) fn parse_status(value: &str) -> Result<ReservationStatus> {
    ReservationStatus::from_str(value)
        .map_err(|_| AppError::BadRequest(format!("invalid status: {value}")))
}

pub(crate) async fn reservation_views(
    state: &AppState,
    filter: Option<&str>,
) -> Result<(Vec<ReservationView>, String)> {
    let status = match filter {
        Some(value) if !value.is_empty() => Some(parse_status(value)?),
        _ => None,
    };

    let reservations = state.reservations().list(status).await?;
    let filter = status.map(|s| s.to_string()).unwrap_or_default();
    Ok((
        reservations.iter().map(ReservationView::from).collect(),
        filter,
    ))
}

/// List reservations, optionally filtered by status.
#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<FilterQuery>,
) -> Result<AdminReservationsTemplate> {
    let (reservations, filter) = reservation_views(&state, query.status.as_deref()).await?;
    Ok(AdminReservationsTemplate {
        reservations,
        filter,
        statuses: ReservationStatus::ALL.iter().map(ToString::to_string).collect(),
        action_prefix: "/admin/reservations".to_owned(),
    })
}

/// Change one reservation's status.
#[instrument(skip(state, _admin, form))]
pub async fn change_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let current = parse_status(&form.current)?;
    let new = parse_status(&form.status)?;

    state
        .reservations()
        .change_status(&ReservationId::new(id), current, new)
        .await?;

    Ok(Redirect::to("/admin/reservations"))
}

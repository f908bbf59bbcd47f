//! Employee reservation management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use tracing::instrument;

use libreria_core::{ReservationId, ReservationStatus};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireEmployee;
use crate::state::AppState;

use super::super::admin::reservations::{FilterQuery, StatusForm, parse_status, reservation_views};
use super::super::profile::ReservationView;

/// Employee reservation management template.
#[derive(Template, WebTemplate)]
#[template(path = "employee/reservations.html")]
pub struct EmployeeReservationsTemplate {
    pub reservations: Vec<ReservationView>,
    pub filter: String,
    pub statuses: Vec<String>,
    pub action_prefix: String,
}

/// List reservations, optionally filtered by status.
#[instrument(skip(state, _employee))]
pub async fn index(
    State(state): State<AppState>,
    RequireEmployee(_employee): RequireEmployee,
    Query(query): Query<FilterQuery>,
) -> Result<EmployeeReservationsTemplate> {
    let (reservations, filter) = reservation_views(&state, query.status.as_deref()).await?;
    Ok(EmployeeReservationsTemplate {
        reservations,
        filter,
        statuses: ReservationStatus::ALL.iter().map(ToString::to_string).collect(),
        action_prefix: "/employee/reservations".to_owned(),
    })
}

/// Change one reservation's status.
#[instrument(skip(state, _employee, form))]
pub async fn change_status(
    State(state): State<AppState>,
    RequireEmployee(_employee): RequireEmployee,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let current = parse_status(&form.current)?;
    let new = parse_status(&form.status)?;

    state
        .reservations()
        .change_status(&ReservationId::new(id), current, new)
        .await?;

    Ok(Redirect::to("/employee/reservations"))
}

//! Profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, State},
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::middleware::auth::set_current_user;
use crate::models::{Reservation, UserProfile};
use crate::state::AppState;

/// Reservation display data for templates.
#[derive(Debug, Clone)]
pub struct ReservationView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub buyer_email: String,
    pub quantity: u32,
    pub total: String,
    pub status: String,
    pub status_class: String,
    pub created_at: String,
}

impl From<&Reservation> for ReservationView {
    fn from(reservation: &Reservation) -> Self {
        let status_class = match reservation.status {
            libreria_core::ReservationStatus::Pending => "badge-pending",
            libreria_core::ReservationStatus::Completed => "badge-completed",
            libreria_core::ReservationStatus::Cancelled => "badge-cancelled",
        };

        Self {
            id: reservation.id.to_string(),
            title: reservation.title.clone(),
            author: reservation.author.clone(),
            buyer_email: reservation.buyer_email.to_string(),
            quantity: reservation.quantity,
            total: reservation.total.to_string(),
            status: reservation.status.to_string(),
            status_class: status_class.to_owned(),
            created_at: reservation
                .created_at
                .format("%b %e, %Y %H:%M")
                .to_string(),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub email: String,
    pub display_name: String,
    pub photo_url: String,
    pub profile: UserProfile,
    pub reservations: Vec<ReservationView>,
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub display_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
}

/// Display the profile page with the user's reservation history.
#[instrument(skip(state, user))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ProfileTemplate> {
    let profile = state.auth().profile(&user.uid).await?;
    let reservations = state.reservations().list_for_buyer(&user.email).await?;

    Ok(ProfileTemplate {
        email: user.email.to_string(),
        display_name: user.display_name.unwrap_or_default(),
        photo_url: user.photo_url.unwrap_or_default(),
        profile,
        reservations: reservations.iter().map(ReservationView::from).collect(),
    })
}

/// Save profile fields: extended fields in the user document, the display
/// name at the identity provider.
#[instrument(skip(state, session, user, form))]
pub async fn save(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let profile = UserProfile {
        phone: form.phone,
        address: form.address,
        city: form.city,
        postal_code: form.postal_code,
    };
    state.auth().save_profile(&user, &profile).await?;

    let display_name = form.display_name.trim();
    if !display_name.is_empty() && user.display_name.as_deref() != Some(display_name) {
        state
            .auth()
            .update_identity_profile(&user, Some(display_name), None)
            .await?;

        let mut updated = user.clone();
        updated.display_name = Some(display_name.to_owned());
        if let Err(e) = set_current_user(&session, &updated).await {
            warn!(error = %e, "failed to refresh session principal");
        }
    }

    Ok(Redirect::to("/profile"))
}

/// Upload a new avatar image and point the identity profile at it.
#[instrument(skip(state, session, user, multipart))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let Some(storage) = state.storage() else {
        return Err(AppError::BadRequest(
            "image uploads are not configured".to_owned(),
        ));
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("empty upload".to_owned()));
        }

        let path = format!("avatars/{}", user.uid);
        let url = storage.upload(&path, bytes.to_vec(), &content_type).await?;

        state
            .auth()
            .update_identity_profile(&user, None, Some(&url))
            .await?;

        let mut updated = user.clone();
        updated.photo_url = Some(url);
        if let Err(e) = set_current_user(&session, &updated).await {
            warn!(error = %e, "failed to refresh session principal");
        }
        break;
    }

    Ok(Redirect::to("/profile"))
}

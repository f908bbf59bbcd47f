//! Federated sign-in via the external identity gateway.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use libreria_core::{Email, PrincipalId};

use crate::error::{AppError, Result, set_sentry_user};
use crate::identity;
use crate::middleware::auth::set_current_user;
use crate::models::{CurrentUser, session_keys};
use crate::services::AuthService;
use crate::state::AppState;

/// Callback query parameters from the identity gateway.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

fn callback_uri(state: &AppState) -> String {
    format!(
        "{}/auth/sso/callback",
        state.config().base_url.trim_end_matches('/')
    )
}

/// Redirect to the identity gateway's authorization endpoint.
#[instrument(skip(state, session))]
pub async fn login(State(state): State<AppState>, session: Session) -> Result<Response> {
    let Some(sso) = state.config().sso.as_ref() else {
        return Err(AppError::NotFound("federated sign-in".to_owned()));
    };

    let nonce: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    session
        .insert(session_keys::SSO_STATE, &nonce)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let url = identity::authorize_url(sso, &callback_uri(&state), &nonce);
    Ok(Redirect::to(&url).into_response())
}

/// Handle the identity gateway callback: verify the state nonce, exchange
/// the code, and establish the session from the token claims.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    let Some(sso) = state.config().sso.as_ref() else {
        return Err(AppError::NotFound("federated sign-in".to_owned()));
    };

    let expected: Option<String> = session
        .remove(session_keys::SSO_STATE)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if expected.as_deref() != Some(query.state.as_str()) {
        warn!("SSO callback with unknown state nonce");
        return Err(AppError::BadRequest("invalid sign-in state".to_owned()));
    }

    let client = reqwest::Client::new();
    let claims = identity::exchange_code(&client, sso, &callback_uri(&state), &query.code).await?;

    let email = claims
        .email
        .as_deref()
        .and_then(|e| Email::parse(e).ok())
        .ok_or_else(|| AppError::BadRequest("identity token carries no email".to_owned()))?;

    let user = CurrentUser {
        uid: PrincipalId::new(claims.sub),
        email,
        display_name: claims.name,
        photo_url: None,
        id_token: None,
    };

    let role = state.auth().resolve_role(Some(&user)).await;
    set_current_user(&session, &user)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if let Err(e) = AuthService::cache_role(&session, role).await {
        warn!(error = %e, "failed to cache role marker");
    }
    set_sentry_user(&user.uid, Some(user.email.as_str()));

    Ok(Redirect::to("/").into_response())
}

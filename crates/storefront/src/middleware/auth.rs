//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in principal or a resolved
//! role in route handlers.
//!
//! Role guards apply the cached-role fast path first: a cached marker that
//! is a member of the route's required role set authorizes immediately,
//! accepting the small window where a stale cached role grants transient
//! access until the authoritative path corrects it. Without a cached
//! marker the guard waits for authoritative resolution and then writes the
//! cache through its single writer. This is an accepted trade-off, not a
//! security boundary; see DESIGN.md.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use libreria_core::Role;

use crate::models::{CurrentUser, session_keys};
use crate::services::AuthService;
use crate::state::AppState;

/// Extractor that requires a signed-in principal.
///
/// If nobody is signed in, redirects to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when a guard rejects the request.
pub enum AuthRejection {
    /// Redirect to the login page (anonymous visitor).
    RedirectToLogin,
    /// Redirect home (signed in, but wrong role).
    RedirectHome,
    /// Unauthorized response (no session infrastructure).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

async fn session_user(parts: &mut Parts) -> Result<Option<CurrentUser>, AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::Unauthorized)?;
    Ok(session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten())
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the signed-in principal.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Shared guard logic for role-gated routes.
///
/// Required role sets are exact-match by design: an administrator is not a
/// member of the employee console's role set, mirroring the deployed
/// behavior.
async fn guard_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: &[Role],
) -> Result<(CurrentUser, Role), AuthRejection> {
    let session = parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::Unauthorized)?;

    let user = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten();

    // Fast path: trust the cached marker when it already satisfies the
    // route.
    if let Some(cached) = AuthService::cached_role(&session).await
        && allowed.contains(&cached)
    {
        if let Some(user) = user {
            return Ok((user, cached));
        }
    }

    // Authoritative path: resolve, write the cache through its single
    // writer, then re-check membership.
    let resolved = state.auth().resolve_role(user.as_ref()).await;
    if resolved.is_signed_in() {
        let _ = AuthService::cache_role(&session, resolved).await;
    }

    match user {
        Some(user) if allowed.contains(&resolved) => Ok((user, resolved)),
        Some(_) => Err(AuthRejection::RedirectHome),
        None => Err(AuthRejection::RedirectToLogin),
    }
}

/// Extractor that requires the administrator role.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = guard_role(parts, state, &[Role::Admin]).await?;
        Ok(Self(user))
    }
}

/// Extractor that requires the employee role.
pub struct RequireEmployee(pub CurrentUser);

impl FromRequestParts<AppState> for RequireEmployee {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, _) = guard_role(parts, state, &[Role::Employee]).await?;
        Ok(Self(user))
    }
}

/// Helper to set the signed-in principal in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

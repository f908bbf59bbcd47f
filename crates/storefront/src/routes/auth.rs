//! Login, logout, and registration route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use libreria_core::Role;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::{clear_session, set_current_user};
use crate::models::session_keys;
use crate::services::AuthService;
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub sso_enabled: bool,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Where a fresh sign-in lands, by role.
const fn landing_for(role: Role) -> &'static str {
    match role {
        Role::Admin => "/admin",
        Role::Employee => "/employee",
        Role::User | Role::Guest => "/",
    }
}

/// Display the login page.
pub async fn login_page(State(state): State<AppState>) -> LoginTemplate {
    LoginTemplate {
        error: None,
        sso_enabled: state.config().sso.is_some(),
    }
}

/// Login action.
///
/// Seed accounts and identity-provider accounts share this entry point;
/// `AuthService::login` decides which path applies. On success the session
/// gains the principal and the cached role marker, and the browser lands
/// on the role's console.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    if form.email.is_empty() || form.password.is_empty() {
        return LoginTemplate {
            error: Some("Please fill in every field".to_owned()),
            sso_enabled: state.config().sso.is_some(),
        }
        .into_response();
    }

    match state.auth().login(&form.email, &form.password).await {
        Ok((user, role)) => {
            if let Err(e) = set_current_user(&session, &user).await {
                warn!(error = %e, "failed to store principal in session");
            }
            if let Err(e) = AuthService::cache_role(&session, role).await {
                warn!(error = %e, "failed to cache role marker");
            }
            set_sentry_user(&user.uid, Some(user.email.as_str()));

            Redirect::to(landing_for(role)).into_response()
        }
        Err(e) => {
            warn!(email = %form.email, error = %e, "sign-in rejected");
            LoginTemplate {
                error: Some(e.user_message()),
                sso_enabled: state.config().sso.is_some(),
            }
            .into_response()
        }
    }
}

/// Logout action.
///
/// Tears the principal's cart subscription down before the session is
/// destroyed, so a later sign-in can never observe the previous
/// principal's lines.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if let Ok(Some(user)) = session
        .get::<crate::models::CurrentUser>(session_keys::CURRENT_USER)
        .await
    {
        state.cart().detach(&user.uid).await;
    }

    if let Err(e) = clear_session(&session).await {
        warn!(error = %e, "failed to clear session on logout");
    }
    clear_sentry_user();

    Redirect::to("/")
}

/// Display the registration page.
pub async fn register_page() -> RegisterTemplate {
    RegisterTemplate { error: None }
}

/// Registration action.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.email.is_empty() || form.password.is_empty() {
        return RegisterTemplate {
            error: Some("Please fill in every field".to_owned()),
        }
        .into_response();
    }

    match state
        .auth()
        .register(&form.email, &form.password, &form.first_name, &form.last_name)
        .await
    {
        Ok((user, role)) => {
            if let Err(e) = set_current_user(&session, &user).await {
                warn!(error = %e, "failed to store principal in session");
            }
            if let Err(e) = AuthService::cache_role(&session, role).await {
                warn!(error = %e, "failed to cache role marker");
            }
            set_sentry_user(&user.uid, Some(user.email.as_str()));

            Redirect::to("/").into_response()
        }
        Err(e) => {
            warn!(email = %form.email, error = %e, "registration rejected");
            RegisterTemplate {
                error: Some(e.user_message()),
            }
            .into_response()
        }
    }
}

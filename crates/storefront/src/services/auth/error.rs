//! Authentication error types.

use thiserror::Error;

use libreria_core::EmailError;

use crate::gateway::GatewayError;
use crate::identity::IdentityError;

/// Errors from authentication and role resolution.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected or failed the request.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A collection read/write failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The submitted email is structurally invalid.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Session storage failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// User-facing message; internal detail never leaks.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Identity(e) => e.user_message().to_owned(),
            Self::InvalidEmail(_) => "Invalid email address".to_owned(),
            Self::Gateway(_) | Self::Session(_) => {
                "Something went wrong, please try again".to_owned()
            }
        }
    }
}

//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use libreria_core::{Email, PrincipalId};

/// Session-stored principal identity.
///
/// Minimal data stored in the session to identify the signed-in user.
/// Seed-account principals carry no identity-provider token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Identity-provider principal id (or a `seed:` id for seed accounts).
    pub uid: PrincipalId,
    /// Principal's email address.
    pub email: Email,
    /// Display name, when the identity provider has one.
    pub display_name: Option<String>,
    /// Avatar URL, when set.
    pub photo_url: Option<String>,
    /// Identity-provider token for profile mutations; absent for seed
    /// accounts.
    pub id_token: Option<String>,
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the signed-in principal.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cached role marker (role resolution fast path).
    ///
    /// Written only by `AuthService::cache_role`.
    pub const CACHED_ROLE: &str = "cached_role";

    /// Key for the SSO state nonce (CSRF protection).
    pub const SSO_STATE: &str = "sso_state";
}

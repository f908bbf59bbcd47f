//! Identity provider REST client.
//!
//! The identity provider owns credential storage and verification; this
//! client only relays sign-in/sign-up/profile calls and maps provider
//! error codes to user-facing failures. Seed-account sign-in never touches
//! this client (see `services::auth`).
//!
//! Federated sign-in goes through an external identity gateway instead;
//! [`authorize_url`] and [`exchange_code`] implement only the
//! redirect/exchange contract with it.

use base64::Engine;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use libreria_core::{Email, PrincipalId};

use crate::config::{IdentityConfig, SsoConfig};

/// Errors from the identity provider or the SSO gateway.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request with an error code.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// Response body did not have the expected shape.
    #[error("malformed identity response: {0}")]
    Malformed(String),

    /// No identity provider is configured.
    #[error("identity provider not configured")]
    NotConfigured,
}

impl IdentityError {
    /// User-facing message for a provider error code.
    ///
    /// Unknown codes collapse to a generic invalid-credentials message;
    /// the raw code is logged, never shown.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Provider(code) => match code.as_str() {
                "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => "User not found",
                "INVALID_PASSWORD" => "Incorrect password",
                "INVALID_EMAIL" => "Invalid email address format",
                "EMAIL_EXISTS" => "An account with this email already exists",
                "USER_DISABLED" => "This account has been disabled",
                _ => "Invalid credentials",
            },
            Self::NotConfigured => "Sign-in is not available right now",
            _ => "Sign-in failed, please try again",
        }
    }
}

/// A signed-in principal as reported by the identity provider.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uid: PrincipalId,
    pub email: Email,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    /// Token for subsequent profile mutations.
    pub id_token: String,
}

/// REST client for the identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a new identity client from configuration.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            api_key: config.api_key.expose_secret().to_string(),
        }
    }

    async fn account_call(&self, action: &str, body: Value) -> Result<Value, IdentityError> {
        let url = format!("{}/v1/accounts:{action}?key={}", self.endpoint, self.api_key);
        let response = self.client.post(url).json(&body).send().await?;

        if !response.status().is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let code = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN")
                .to_owned();
            return Err(IdentityError::Provider(code));
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))
    }

    fn principal_from(response: &Value) -> Result<Principal, IdentityError> {
        let field = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let local_id = field("localId")
            .ok_or_else(|| IdentityError::Malformed("response missing localId".to_owned()))?;
        let raw_email = field("email")
            .ok_or_else(|| IdentityError::Malformed("response missing email".to_owned()))?;
        let id_token = field("idToken")
            .ok_or_else(|| IdentityError::Malformed("response missing idToken".to_owned()))?;

        let email = Email::parse(&raw_email)
            .map_err(|e| IdentityError::Malformed(format!("provider returned bad email: {e}")))?;

        Ok(Principal {
            uid: PrincipalId::new(local_id),
            email,
            display_name: field("displayName"),
            photo_url: field("photoUrl"),
            id_token,
        })
    }

    /// Sign in with an email/password credential pair.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] with the provider's error code
    /// when the credentials are rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, IdentityError> {
        let response = self
            .account_call(
                "signInWithPassword",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Self::principal_from(&response)
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Provider`] (`EMAIL_EXISTS`, …) on rejection.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, IdentityError> {
        let response = self
            .account_call(
                "signUp",
                serde_json::json!({
                    "email": email,
                    "password": password,
                    "returnSecureToken": true,
                }),
            )
            .await?;
        Self::principal_from(&response)
    }

    /// Update profile fields (display name, photo URL) for a signed-in
    /// principal.
    ///
    /// # Errors
    ///
    /// Returns an error when the token is rejected or the call fails.
    #[instrument(skip(self, id_token))]
    pub async fn update_profile(
        &self,
        id_token: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), IdentityError> {
        let mut body = serde_json::json!({
            "idToken": id_token,
            "returnSecureToken": false,
        });
        if let (Value::Object(map), Some(name)) = (&mut body, display_name) {
            map.insert("displayName".to_owned(), Value::String(name.to_owned()));
        }
        if let (Value::Object(map), Some(url)) = (&mut body, photo_url) {
            map.insert("photoUrl".to_owned(), Value::String(url.to_owned()));
        }

        self.account_call("update", body).await.map(|_| ())
    }
}

// =============================================================================
// Federated sign-in (external identity gateway)
// =============================================================================

/// Claims extracted from a gateway-issued identity token.
#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Build the authorization redirect URL for the identity gateway.
#[must_use]
pub fn authorize_url(sso: &SsoConfig, redirect_uri: &str, state: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
        sso.gateway_url.trim_end_matches('/'),
        sso.realm,
        urlencoding::encode(&sso.client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
    )
}

/// Exchange an authorization code at the gateway token endpoint and read
/// the identity claims.
///
/// The claims are trusted as received: the token travels directly from the
/// gateway's token endpoint over TLS, so no local signature check is done.
///
/// # Errors
///
/// Returns an error when the exchange fails or the token is malformed.
pub async fn exchange_code(
    client: &reqwest::Client,
    sso: &SsoConfig,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenClaims, IdentityError> {
    let token_url = format!(
        "{}/realms/{}/protocol/openid-connect/token",
        sso.gateway_url.trim_end_matches('/'),
        sso.realm
    );

    let response = client
        .post(token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", sso.client_id.as_str()),
            ("client_secret", sso.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(IdentityError::Provider("SSO_EXCHANGE_FAILED".to_owned()));
    }

    let body: Value = response.json().await?;
    let id_token = body
        .get("id_token")
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Malformed("token response missing id_token".to_owned()))?;

    decode_claims(id_token)
}

/// Decode the payload segment of a JWT without verifying the signature.
fn decode_claims(jwt: &str) -> Result<TokenClaims, IdentityError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| IdentityError::Malformed("token is not a JWT".to_owned()))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| IdentityError::Malformed(format!("token payload not base64: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| IdentityError::Malformed(format!("token claims not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn sso() -> SsoConfig {
        SsoConfig {
            gateway_url: "https://sso.example.com".to_owned(),
            realm: "bookstore".to_owned(),
            client_id: "storefront".to_owned(),
            client_secret: SecretString::from("s3cret"),
        }
    }

    #[test]
    fn authorize_url_contains_realm_and_state() {
        let url = authorize_url(&sso(), "https://shop.example.com/auth/sso/callback", "abc123");
        assert!(url.starts_with("https://sso.example.com/realms/bookstore/"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("client_id=storefront"));
    }

    #[test]
    fn decode_claims_reads_payload() {
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(r#"{"sub":"u-1","email":"u@example.com","name":"U"}"#);
        let jwt = format!("header.{payload}.sig");
        let claims = decode_claims(&jwt).expect("claims");
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email.as_deref(), Some("u@example.com"));
    }

    #[test]
    fn decode_claims_rejects_non_jwt() {
        assert!(decode_claims("not-a-jwt").is_err());
    }

    #[test]
    fn provider_codes_map_to_messages() {
        let err = IdentityError::Provider("INVALID_PASSWORD".to_owned());
        assert_eq!(err.user_message(), "Incorrect password");
        let err = IdentityError::Provider("SOMETHING_ELSE".to_owned());
        assert_eq!(err.user_message(), "Invalid credentials");
    }
}

//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `GATEWAY_PROJECT_ID` - Backend project id (unless `GATEWAY_MODE=memory`)
//! - `GATEWAY_API_KEY` - Backend API key (unless `GATEWAY_MODE=memory`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `GATEWAY_MODE` - `http` (default) or `memory` for local development
//! - `GATEWAY_ENDPOINT` - Document database endpoint (default: hosted)
//! - `IDENTITY_ENDPOINT`, `IDENTITY_API_KEY` - Identity provider REST API
//! - `SSO_GATEWAY_URL`, `SSO_REALM`, `SSO_CLIENT_ID`, `SSO_CLIENT_SECRET` -
//!   external identity gateway for federated sign-in
//! - `STORAGE_ENDPOINT`, `STORAGE_BUCKET` - object storage for images
//! - `SEED_ADMIN_EMAIL`, `SEED_ADMIN_PASSWORD` - admin seed account
//! - `SEED_EMPLOYEE_EMAIL`, `SEED_EMPLOYEE_PASSWORD` - employee seed account
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - error tracking

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How to reach the document database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Hosted backend over HTTP.
    Http,
    /// In-process store (local development, no backend project needed).
    Memory,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// How to reach the document database
    pub gateway_mode: GatewayMode,
    /// Document database configuration (`None` in memory mode)
    pub gateway: Option<GatewayConfig>,
    /// Identity provider configuration
    pub identity: Option<IdentityConfig>,
    /// External identity gateway for federated sign-in
    pub sso: Option<SsoConfig>,
    /// Object storage for catalog and avatar images
    pub storage: Option<StorageConfig>,
    /// Seed accounts recognized at login without the identity provider
    pub seed_accounts: SeedAccounts,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Document database configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Backend endpoint base URL
    pub endpoint: String,
    /// Backend project id
    pub project_id: String,
    /// Backend API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Identity provider REST API configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Identity provider endpoint base URL
    pub endpoint: String,
    /// Identity provider API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// External identity gateway (federated sign-in) configuration.
#[derive(Clone)]
pub struct SsoConfig {
    /// Gateway base URL
    pub gateway_url: String,
    /// Realm name
    pub realm: String,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for SsoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SsoConfig")
            .field("gateway_url", &self.gateway_url)
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Object storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage endpoint base URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
}

/// One seed credential pair.
#[derive(Clone)]
pub struct SeedCredential {
    pub email: String,
    pub password: SecretString,
}

impl std::fmt::Debug for SeedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedCredential")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Privileged accounts recognized at login without the identity provider.
///
/// SECURITY: this is a deliberate compatibility path with the deployed
/// system, not a recommended design. Anyone holding these credentials gets
/// the role without the identity provider ever being consulted, and
/// nothing behind the collection gateway re-checks the role server-side.
/// Treated as a pre-production gap; see DESIGN.md.
#[derive(Debug, Clone)]
pub struct SeedAccounts {
    pub admin: SeedCredential,
    pub employee: SeedCredential,
}

impl SeedAccounts {
    fn from_env() -> Self {
        Self {
            admin: SeedCredential {
                email: get_env_or_default("SEED_ADMIN_EMAIL", "admin@gmail.com"),
                password: SecretString::from(get_env_or_default(
                    "SEED_ADMIN_PASSWORD",
                    "admin123",
                )),
            },
            employee: SeedCredential {
                email: get_env_or_default("SEED_EMPLOYEE_EMAIL", "empleado@gmail.com"),
                password: SecretString::from(get_env_or_default(
                    "SEED_EMPLOYEE_PASSWORD",
                    "empleado123",
                )),
            },
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let gateway_mode = match get_env_or_default("GATEWAY_MODE", "http").as_str() {
            "memory" => GatewayMode::Memory,
            "http" => GatewayMode::Http,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "GATEWAY_MODE".to_string(),
                    format!("expected 'http' or 'memory', got '{other}'"),
                ));
            }
        };

        let gateway = match gateway_mode {
            GatewayMode::Http => Some(GatewayConfig::from_env()?),
            GatewayMode::Memory => None,
        };

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            gateway_mode,
            gateway,
            identity: IdentityConfig::from_env()?,
            sso: SsoConfig::from_env(),
            storage: StorageConfig::from_env(),
            seed_accounts: SeedAccounts::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GatewayConfig {
    /// Load just the gateway section from the environment.
    ///
    /// Also used by the CLI, which needs the gateway but none of the web
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when required variables are missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: get_env_or_default("GATEWAY_ENDPOINT", "https://docstore.googleapis.com"),
            project_id: get_required_env("GATEWAY_PROJECT_ID")?,
            api_key: get_required_secret("GATEWAY_API_KEY")?,
        })
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(endpoint) = get_optional_env("IDENTITY_ENDPOINT") else {
            return Ok(None);
        };
        Ok(Some(Self {
            endpoint,
            api_key: get_required_secret("IDENTITY_API_KEY")?,
        }))
    }
}

impl SsoConfig {
    fn from_env() -> Option<Self> {
        let gateway_url = get_optional_env("SSO_GATEWAY_URL")?;
        let realm = get_optional_env("SSO_REALM")?;
        let client_id = get_optional_env("SSO_CLIENT_ID")?;
        let client_secret = get_optional_env("SSO_CLIENT_SECRET")?;
        Some(Self {
            gateway_url,
            realm,
            client_id,
            client_secret: SecretString::from(client_secret),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Option<Self> {
        let endpoint = get_optional_env("STORAGE_ENDPOINT")?;
        let bucket = get_optional_env("STORAGE_BUCKET")?;
        Some(Self { endpoint, bucket })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_session_secret(&secret, "TEST_SESSION");
        assert!(result.is_ok());
    }

    #[test]
    fn test_seed_credential_debug_redacts_password() {
        let credential = SeedCredential {
            email: "admin@gmail.com".to_string(),
            password: SecretString::from("super_secret_password"),
        };

        let debug_output = format!("{credential:?}");
        assert!(debug_output.contains("admin@gmail.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password"));
    }
}

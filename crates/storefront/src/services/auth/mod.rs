//! Authentication and role resolution.
//!
//! Role resolution runs as a small state machine per request: the session
//! enters `Unresolved`, the cached role marker (if present) authorizes
//! immediately as the fast path, and the authoritative role-assignment
//! document corrects the cache afterwards. A principal with no role
//! document is baseline `User`; no principal at all is `Guest`. Resolution
//! never blocks public routes and never surfaces as an error there.
//!
//! The cached marker has exactly one writer, [`AuthService::cache_role`] -
//! guards and views read it, nothing else writes it.
//!
//! SECURITY: two privileged accounts (admin, employee) are recognized at
//! login from the seed-account config table, bypassing the identity
//! provider entirely. This reproduces the deployed system's behavior and
//! is a documented pre-production gap, not a security boundary; nothing
//! behind the collection gateway re-checks these roles server-side.

mod error;

pub use error::AuthError;

use secrecy::ExposeSecret;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use libreria_core::{Email, PrincipalId, Role};

use crate::config::SeedAccounts;
use crate::gateway::{CollectionGateway, SharedGateway, collections, parse};
use crate::identity::IdentityClient;
use crate::models::{CurrentUser, DirectoryEntry, UserProfile, roles, session_keys};

/// Prefix marking principals established from the seed-account table.
const SEED_UID_PREFIX: &str = "seed:";

/// Authentication service.
///
/// Handles sign-in (seed accounts and identity provider), registration,
/// and role resolution against the `users` collection.
pub struct AuthService {
    gateway: SharedGateway,
    identity: Option<IdentityClient>,
    seed_accounts: SeedAccounts,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        gateway: SharedGateway,
        identity: Option<IdentityClient>,
        seed_accounts: SeedAccounts,
    ) -> Self {
        Self {
            gateway,
            identity,
            seed_accounts,
        }
    }

    // =========================================================================
    // Sign-in
    // =========================================================================

    /// Sign in with an email/password credential pair.
    ///
    /// The seed-account table is consulted first; a match establishes the
    /// privileged principal without the identity provider. Everyone else
    /// authenticates against the provider and resolves to their
    /// authoritative role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` when the provider rejects the
    /// credentials (or none is configured).
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(CurrentUser, Role), AuthError> {
        if let Some(seeded) = self.match_seed_account(email, password)? {
            info!(email, role = %seeded.1, "seed account sign-in");
            return Ok(seeded);
        }

        let identity = self
            .identity
            .as_ref()
            .ok_or(crate::identity::IdentityError::NotConfigured)?;
        let principal = identity.sign_in_with_password(email, password).await?;

        let user = CurrentUser {
            uid: principal.uid,
            email: principal.email,
            display_name: principal.display_name,
            photo_url: principal.photo_url,
            id_token: Some(principal.id_token),
        };
        let role = self.resolve_role(Some(&user)).await;
        Ok((user, role))
    }

    fn match_seed_account(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<(CurrentUser, Role)>, AuthError> {
        let accounts = [
            (&self.seed_accounts.admin, Role::Admin, "seed:admin"),
            (&self.seed_accounts.employee, Role::Employee, "seed:employee"),
        ];

        for (credential, role, uid) in accounts {
            if credential.email == email && credential.password.expose_secret() == password {
                let user = CurrentUser {
                    uid: PrincipalId::new(uid),
                    email: Email::parse(email)?,
                    display_name: None,
                    photo_url: None,
                    id_token: None,
                };
                return Ok(Some((user, role)));
            }
        }
        Ok(None)
    }

    /// Register a new account with the identity provider and create its
    /// directory document with the standard role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Identity` on provider rejection (e.g. the email
    /// already exists).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(CurrentUser, Role), AuthError> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(crate::identity::IdentityError::NotConfigured)?;
        let principal = identity.sign_up(email, password).await?;

        // Directory document failure must not lose the account: the user
        // exists at the provider either way, and a missing document just
        // resolves to the same baseline role.
        let directory_fields = serde_json::json!({
            "uid": principal.uid.as_str(),
            "first_name": first_name,
            "last_name": last_name,
            "email": principal.email.as_str(),
            "role": roles::STANDARD,
        });
        if let Err(e) = self
            .gateway
            .create(collections::USERS, directory_fields)
            .await
        {
            warn!(error = %e, "failed to create directory document for new account");
        }

        let user = CurrentUser {
            uid: principal.uid,
            email: principal.email,
            display_name: principal.display_name,
            photo_url: principal.photo_url,
            id_token: Some(principal.id_token),
        };
        Ok((user, Role::User))
    }

    // =========================================================================
    // Role resolution
    // =========================================================================

    /// Authoritative role for a principal.
    ///
    /// - no principal -> `Guest`
    /// - seed principal -> its seeded role
    /// - directory document with a role assignment -> mapped role
    /// - no directory document -> baseline `User`
    ///
    /// A gateway failure degrades to baseline `User` with a warning
    /// instead of erroring: resolution must never block navigation.
    pub async fn resolve_role(&self, principal: Option<&CurrentUser>) -> Role {
        let Some(user) = principal else {
            return Role::Guest;
        };

        if let Some(role) = Self::seed_role(&user.uid) {
            return role;
        }

        match self.directory_entry(&user.uid).await {
            Ok(Some(entry)) => entry
                .role
                .as_ref()
                .map_or(Role::User, roles::resolve),
            Ok(None) => Role::User,
            Err(e) => {
                warn!(uid = %user.uid, error = %e, "role lookup failed, using baseline role");
                Role::User
            }
        }
    }

    fn seed_role(uid: &PrincipalId) -> Option<Role> {
        match uid.as_str() {
            "seed:admin" => Some(Role::Admin),
            "seed:employee" => Some(Role::Employee),
            other if other.starts_with(SEED_UID_PREFIX) => Some(Role::User),
            _ => None,
        }
    }

    async fn directory_entry(
        &self,
        uid: &PrincipalId,
    ) -> Result<Option<DirectoryEntry>, AuthError> {
        let docs = self.gateway.list(collections::USERS).await?;
        Ok(docs
            .iter()
            .filter_map(parse::parse_directory_entry)
            .find(|entry| entry.uid == *uid))
    }

    /// Every user directory entry, for the admin roles console.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn directory(&self) -> Result<Vec<DirectoryEntry>, AuthError> {
        let docs = self.gateway.list(collections::USERS).await?;
        let mut entries: Vec<DirectoryEntry> = docs
            .iter()
            .filter_map(parse::parse_directory_entry)
            .collect();
        entries.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(entries)
    }

    /// Reassign a user's role-assignment document id.
    ///
    /// A reassignment to the current id is suppressed without a write.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        entry: &DirectoryEntry,
        role_id: &libreria_core::RoleId,
    ) -> Result<bool, AuthError> {
        if entry.role.as_ref() == Some(role_id) {
            return Ok(false);
        }
        self.gateway
            .update(
                collections::USERS,
                &entry.doc_id,
                DirectoryEntry::role_patch(role_id),
            )
            .await?;
        Ok(true)
    }

    // =========================================================================
    // Extended profile
    // =========================================================================

    /// Extended profile fields for a principal, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    pub async fn profile(&self, uid: &PrincipalId) -> Result<UserProfile, AuthError> {
        let entry = self.directory_doc_id(uid).await?;
        match entry {
            Some(doc_id) => {
                let doc = self.gateway.get(collections::USERS, &doc_id).await?;
                Ok(doc.as_ref().map(parse::parse_profile).unwrap_or_default())
            }
            None => Ok(UserProfile::default()),
        }
    }

    /// Save extended profile fields for a principal, creating the
    /// directory document when missing.
    ///
    /// # Errors
    ///
    /// Gateway errors are propagated.
    #[instrument(skip(self, profile))]
    pub async fn save_profile(
        &self,
        user: &CurrentUser,
        profile: &UserProfile,
    ) -> Result<(), AuthError> {
        match self.directory_doc_id(&user.uid).await? {
            Some(doc_id) => {
                self.gateway
                    .update(collections::USERS, &doc_id, profile.to_fields())
                    .await?;
            }
            None => {
                let mut fields = profile.to_fields();
                if let serde_json::Value::Object(map) = &mut fields {
                    map.insert(
                        "uid".to_owned(),
                        serde_json::Value::String(user.uid.as_str().to_owned()),
                    );
                    map.insert(
                        "email".to_owned(),
                        serde_json::Value::String(user.email.as_str().to_owned()),
                    );
                    map.insert(
                        "role".to_owned(),
                        serde_json::Value::String(roles::STANDARD.to_owned()),
                    );
                }
                self.gateway.create(collections::USERS, fields).await?;
            }
        }
        Ok(())
    }

    async fn directory_doc_id(&self, uid: &PrincipalId) -> Result<Option<String>, AuthError> {
        Ok(self.directory_entry(uid).await?.map(|e| e.doc_id))
    }

    /// Push display-name/avatar changes to the identity provider.
    ///
    /// Seed principals carry no provider token; for them (and when no
    /// provider is configured) the call is a no-op, since the session is
    /// the only place their profile exists.
    #[instrument(skip(self, user, photo_url))]
    pub async fn update_identity_profile(
        &self,
        user: &CurrentUser,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError> {
        let (Some(identity), Some(token)) = (self.identity.as_ref(), user.id_token.as_deref())
        else {
            return Ok(());
        };
        identity
            .update_profile(token, display_name, photo_url)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Cached role marker (session fast path)
    // =========================================================================

    /// Write the cached role marker. The single writer of this session
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` when the session cannot be modified.
    pub async fn cache_role(session: &Session, role: Role) -> Result<(), AuthError> {
        session.insert(session_keys::CACHED_ROLE, role).await?;
        Ok(())
    }

    /// Read the cached role marker, if any.
    pub async fn cached_role(session: &Session) -> Option<Role> {
        session
            .get::<Role>(session_keys::CACHED_ROLE)
            .await
            .ok()
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedAccounts, SeedCredential};
    use crate::gateway::{CollectionGateway, MemoryGateway};
    use secrecy::SecretString;
    use std::sync::Arc;

    fn seed_accounts() -> SeedAccounts {
        SeedAccounts {
            admin: SeedCredential {
                email: "admin@gmail.com".to_owned(),
                password: SecretString::from("admin123"),
            },
            employee: SeedCredential {
                email: "empleado@gmail.com".to_owned(),
                password: SecretString::from("empleado123"),
            },
        }
    }

    fn service(gateway: Arc<MemoryGateway>) -> AuthService {
        AuthService::new(gateway, None, seed_accounts())
    }

    fn user(uid: &str) -> CurrentUser {
        CurrentUser {
            uid: PrincipalId::new(uid),
            email: Email::parse(&format!("{uid}@example.com")).expect("email"),
            display_name: None,
            photo_url: None,
            id_token: None,
        }
    }

    #[tokio::test]
    async fn seed_credentials_bypass_the_identity_provider() {
        // No identity client configured at all; the seed path must still
        // authenticate.
        let service = service(Arc::new(MemoryGateway::new()));

        let (admin, role) = service
            .login("admin@gmail.com", "admin123")
            .await
            .expect("admin login");
        assert_eq!(role, Role::Admin);
        assert_eq!(admin.uid.as_str(), "seed:admin");

        let (_, role) = service
            .login("empleado@gmail.com", "empleado123")
            .await
            .expect("employee login");
        assert_eq!(role, Role::Employee);
    }

    #[tokio::test]
    async fn wrong_seed_password_falls_through_to_the_provider() {
        let service = service(Arc::new(MemoryGateway::new()));
        let err = service
            .login("admin@gmail.com", "wrong")
            .await
            .expect_err("must not grant admin");
        assert!(matches!(
            err,
            AuthError::Identity(crate::identity::IdentityError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn no_principal_resolves_to_guest() {
        let service = service(Arc::new(MemoryGateway::new()));
        assert_eq!(service.resolve_role(None).await, Role::Guest);
    }

    #[tokio::test]
    async fn missing_role_document_resolves_to_baseline_user() {
        let service = service(Arc::new(MemoryGateway::new()));
        assert_eq!(service.resolve_role(Some(&user("u1"))).await, Role::User);
    }

    #[tokio::test]
    async fn role_document_resolves_to_assigned_role() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .create(
                collections::USERS,
                serde_json::json!({
                    "uid": "u1",
                    "email": "u1@example.com",
                    "role": roles::EMPLOYEE,
                }),
            )
            .await
            .expect("seed user doc");

        let service = service(gateway);
        assert_eq!(service.resolve_role(Some(&user("u1"))).await, Role::Employee);
    }

    #[tokio::test]
    async fn unknown_role_id_resolves_to_baseline_user() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .create(
                collections::USERS,
                serde_json::json!({"uid": "u1", "role": "not-a-seeded-role"}),
            )
            .await
            .expect("seed user doc");

        let service = service(gateway);
        assert_eq!(service.resolve_role(Some(&user("u1"))).await, Role::User);
    }

    #[tokio::test]
    async fn role_reassignment_suppresses_no_op_writes() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway
            .create(
                collections::USERS,
                serde_json::json!({"uid": "u1", "role": roles::STANDARD}),
            )
            .await
            .expect("seed user doc");
        let service = service(gateway);

        let entry = service
            .directory()
            .await
            .expect("directory")
            .into_iter()
            .next()
            .expect("entry");

        let standard = libreria_core::RoleId::new(roles::STANDARD);
        assert!(!service.assign_role(&entry, &standard).await.expect("no-op"));

        let employee = libreria_core::RoleId::new(roles::EMPLOYEE);
        assert!(service.assign_role(&entry, &employee).await.expect("assign"));
        assert_eq!(
            service.resolve_role(Some(&user("u1"))).await,
            Role::Employee
        );
    }

    #[tokio::test]
    async fn profile_round_trips_and_creates_directory_doc() {
        let service = service(Arc::new(MemoryGateway::new()));
        let shopper = user("u1");

        let blank = service.profile(&shopper.uid).await.expect("profile");
        assert!(blank.phone.is_empty());

        let profile = UserProfile {
            phone: "555-0100".to_owned(),
            address: "Calle Mayor 1".to_owned(),
            city: "Madrid".to_owned(),
            postal_code: "28001".to_owned(),
        };
        service
            .save_profile(&shopper, &profile)
            .await
            .expect("save profile");

        let loaded = service.profile(&shopper.uid).await.expect("profile");
        assert_eq!(loaded.city, "Madrid");
        // Saving created the directory document with the baseline role.
        assert_eq!(service.resolve_role(Some(&shopper)).await, Role::User);
    }
}

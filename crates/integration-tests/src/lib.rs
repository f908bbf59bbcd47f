//! Workflow tests for Librería.
//!
//! These tests wire the real service layer (cart state machine,
//! reservation workflow, role resolution) against the in-memory gateway
//! and drive full storefront flows: browse, add to cart, reserve, manage
//! status, resolve roles.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p libreria-integration-tests
//! ```

use std::sync::Arc;

use secrecy::SecretString;

use libreria_core::{Email, PrincipalId};
use libreria_storefront::config::{SeedAccounts, SeedCredential};
use libreria_storefront::gateway::{MemoryGateway, SharedGateway};
use libreria_storefront::models::CurrentUser;
use libreria_storefront::services::{
    AuthService, CartService, CatalogService, ReservationService,
};

/// The full service layer over one shared in-memory gateway.
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub reservations: ReservationService,
    pub auth: AuthService,
}

impl TestContext {
    /// Build a context with the default seed accounts.
    #[must_use]
    pub fn new() -> Self {
        let gateway = Arc::new(MemoryGateway::new());
        let shared: SharedGateway = gateway.clone();

        Self {
            catalog: CatalogService::new(shared.clone()),
            cart: CartService::new(shared.clone()),
            reservations: ReservationService::new(shared.clone()),
            auth: AuthService::new(shared, None, default_seed_accounts()),
            gateway,
        }
    }

    /// A signed-in customer principal.
    #[must_use]
    pub fn shopper(&self, uid: &str) -> CurrentUser {
        CurrentUser {
            uid: PrincipalId::new(uid),
            email: Email::parse(&format!("{uid}@example.com")).expect("test email"),
            display_name: None,
            photo_url: None,
            id_token: None,
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The deployed seed-account credential pairs.
#[must_use]
pub fn default_seed_accounts() -> SeedAccounts {
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

//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::{GatewayMode, StorefrontConfig};
use crate::gateway::{HttpGateway, MemoryGateway, SharedGateway};
use crate::identity::IdentityClient;
use crate::services::{AuthService, CartService, CatalogService, ReservationService};
use crate::storage::MediaStorage;

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("GATEWAY_MODE=http requires gateway configuration")]
    MissingGatewayConfig,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources: the gateway, the services, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: SharedGateway,
    catalog: CatalogService,
    cart: CartService,
    reservations: ReservationService,
    auth: AuthService,
    storage: Option<MediaStorage>,
}

impl AppState {
    /// Create a new application state from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is internally inconsistent.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let gateway: SharedGateway = match config.gateway_mode {
            GatewayMode::Http => {
                let gateway_config = config
                    .gateway
                    .as_ref()
                    .ok_or(StateError::MissingGatewayConfig)?;
                Arc::new(HttpGateway::new(gateway_config))
            }
            GatewayMode::Memory => Arc::new(MemoryGateway::new()),
        };

        Self::with_gateway(config, gateway)
    }

    /// Create application state over an explicit gateway.
    ///
    /// Used by tests to inject an in-memory gateway regardless of
    /// configuration.
    ///
    /// # Errors
    ///
    /// Currently infallible; kept fallible for parity with [`Self::new`].
    pub fn with_gateway(
        config: StorefrontConfig,
        gateway: SharedGateway,
    ) -> Result<Self, StateError> {
        let identity = config.identity.as_ref().map(IdentityClient::new);
        let storage = config.storage.as_ref().map(MediaStorage::new);

        let catalog = CatalogService::new(gateway.clone());
        let cart = CartService::new(gateway.clone());
        let reservations = ReservationService::new(gateway.clone());
        let auth = AuthService::new(gateway.clone(), identity, config.seed_accounts.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                catalog,
                cart,
                reservations,
                auth,
                storage,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the collection gateway.
    #[must_use]
    pub fn gateway(&self) -> &SharedGateway {
        &self.inner.gateway
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the cart state machine.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the reservation workflow.
    #[must_use]
    pub fn reservations(&self) -> &ReservationService {
        &self.inner.reservations
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the object storage client, when configured.
    #[must_use]
    pub fn storage(&self) -> Option<&MediaStorage> {
        self.inner.storage.as_ref()
    }
}

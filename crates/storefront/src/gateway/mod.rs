//! Remote collection gateway clients.
//!
//! # Architecture
//!
//! - The hosted document database is the source of truth - NO local sync,
//!   direct per-document calls
//! - Documents are schemaless JSON; typed records cross the
//!   [`parse`] boundary before the rest of the application sees them
//! - Collection watches deliver full snapshots over a `tokio::sync::watch`
//!   channel; consumers always treat the latest snapshot as ground truth
//!
//! # Implementations
//!
//! - [`HttpGateway`] - REST/JSON client for the hosted backend
//! - [`MemoryGateway`] - in-process store for tests and local development
//!
//! # Example
//!
//! ```rust,ignore
//! use libreria_storefront::gateway::{CollectionGateway, collections};
//!
//! let books = gateway.list(collections::BOOKS).await?;
//! let id = gateway.create(collections::BOOKS, fields).await?;
//! gateway.update(collections::BOOKS, &id, patch).await?;
//! ```

mod http;
mod memory;
pub mod parse;

pub use http::HttpGateway;
pub use memory::MemoryGateway;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// Well-known collection paths.
///
/// Collection names are inherited from the deployed backend project and
/// must match it exactly, Spanish names included.
pub mod collections {
    use libreria_core::PrincipalId;

    /// Book catalog.
    pub const BOOKS: &str = "libros";
    /// Reservation records (one per cart line, never grouped).
    pub const RESERVATIONS: &str = "reserva";
    /// User directory documents carrying role assignments.
    pub const USERS: &str = "users";
    /// Site configuration documents (`about` and friends).
    pub const CONFIGURATION: &str = "configuration";

    /// Per-principal cart sub-collection.
    #[must_use]
    pub fn cart_for(uid: &PrincipalId) -> String {
        format!("{USERS}/{uid}/carrito")
    }
}

/// A raw document as stored in the remote collection.
///
/// `fields` is always a JSON object; shape validation happens in [`parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Remote-assigned document identifier.
    pub id: String,
    /// Document payload.
    pub fields: Value,
}

impl RawDocument {
    /// Construct a document from its id and payload.
    #[must_use]
    pub const fn new(id: String, fields: Value) -> Self {
        Self { id, fields }
    }
}

/// Errors that can occur when talking to the collection gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("gateway returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// Rate limited by the backend.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Document not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Object-safe client contract for the hosted document database.
///
/// All operations are per-document; there are no cross-document
/// transactions, and per-document write ordering is the only consistency
/// mechanism the application relies on.
#[async_trait]
pub trait CollectionGateway: Send + Sync {
    /// List every document in a collection.
    async fn list(&self, path: &str) -> Result<Vec<RawDocument>, GatewayError>;

    /// Fetch one document by id. `Ok(None)` when absent.
    async fn get(&self, path: &str, id: &str) -> Result<Option<RawDocument>, GatewayError>;

    /// Create a document; the backend assigns and returns the id.
    async fn create(&self, path: &str, fields: Value) -> Result<String, GatewayError>;

    /// Create or replace a document under a caller-chosen id.
    ///
    /// Used for singleton configuration documents and seeded documents
    /// whose ids are deployment constants.
    async fn set(&self, path: &str, id: &str, fields: Value) -> Result<(), GatewayError>;

    /// Partial-merge update of an existing document.
    async fn update(&self, path: &str, id: &str, patch: Value) -> Result<(), GatewayError>;

    /// Delete a document.
    async fn delete(&self, path: &str, id: &str) -> Result<(), GatewayError>;

    /// Subscribe to a collection.
    ///
    /// The returned watch starts with an initial snapshot and pushes a new
    /// one whenever the collection changes. Dropping the watch tears the
    /// producer down.
    async fn watch(&self, path: &str) -> Result<CollectionWatch, GatewayError>;
}

/// Shared handle type used across the application.
pub type SharedGateway = Arc<dyn CollectionGateway>;

/// Live subscription to one collection.
///
/// Owns the background producer task; dropping the watch aborts it, which
/// closes the channel for every receiver.
pub struct CollectionWatch {
    rx: watch::Receiver<Vec<RawDocument>>,
    refresh: Arc<Notify>,
    producer: JoinHandle<()>,
}

impl CollectionWatch {
    pub(crate) const fn new(
        rx: watch::Receiver<Vec<RawDocument>>,
        refresh: Arc<Notify>,
        producer: JoinHandle<()>,
    ) -> Self {
        Self {
            rx,
            refresh,
            producer,
        }
    }

    /// The latest confirmed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RawDocument> {
        self.rx.borrow().clone()
    }

    /// A receiver for consumers that want push notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<RawDocument>> {
        self.rx.clone()
    }

    /// Ask the producer to re-read the collection immediately.
    ///
    /// Called after a confirmed mutation so the next snapshot reflects
    /// remote truth without waiting a full poll interval.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for CollectionWatch {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

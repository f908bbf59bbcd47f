//! Cart state machine.
//!
//! Owns the signed-in user's in-progress selection by mirroring the
//! per-user `carrito` sub-collection. The reactive view always reflects
//! the last confirmed remote snapshot: mutations go to the gateway first
//! and the view catches up when the watch delivers, trading responsiveness
//! for consistency with the remote source of truth.
//!
//! Subscription discipline: at most one live gateway subscription per
//! principal, held in a registry keyed by principal id. `detach` (called
//! on logout) tears the watcher down before the session goes away, so a
//! later sign-in as a different principal can never observe the prior
//! principal's lines.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use libreria_core::{CartLineId, Price, PrincipalId};

use crate::gateway::{CollectionGateway, CollectionWatch, GatewayError, RawDocument, SharedGateway, collections, parse};
use crate::models::{Book, CartLine, CurrentUser, cart};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Mutations require a signed-in principal; callers redirect to
    /// authentication on this error rather than attempting the write.
    #[error("cart mutations require a signed-in user")]
    NotAuthenticated,

    /// A remote write/read failed. Reported distinctly, never swallowed.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// What a cart mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMutation {
    /// A new line was created.
    Added,
    /// An existing line with the same `(title, author)` absorbed the add.
    Merged {
        /// Quantity after the merge.
        quantity: u32,
    },
    /// A line's quantity was updated in place.
    Updated {
        /// Quantity after the update.
        quantity: u32,
    },
    /// The line was removed (explicitly, or by a decrement below 1).
    Removed,
}

/// One principal's live cart subscription.
struct ActiveCart {
    lines: watch::Receiver<Vec<CartLine>>,
    raw: CollectionWatch,
    forwarder: JoinHandle<()>,
}

impl Drop for ActiveCart {
    fn drop(&mut self) {
        // The raw watch aborts its own producer on drop.
        self.forwarder.abort();
    }
}

/// Cart state machine over the per-user remote sub-collection.
pub struct CartService {
    gateway: SharedGateway,
    watchers: Mutex<HashMap<PrincipalId, ActiveCart>>,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub fn new(gateway: SharedGateway) -> Self {
        Self {
            gateway,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    fn require_user(principal: Option<&CurrentUser>) -> Result<&CurrentUser, CartError> {
        principal.ok_or(CartError::NotAuthenticated)
    }

    fn parse_lines(docs: &[RawDocument]) -> Vec<CartLine> {
        let mut lines: Vec<CartLine> = docs.iter().filter_map(parse::parse_cart_line).collect();
        lines.sort_by(|a, b| a.merge_key().cmp(&b.merge_key()));
        lines
    }

    /// Ensure a live subscription for the principal and return its line
    /// view. Idempotent: a second call for the same principal reuses the
    /// existing subscription.
    async fn attach(&self, uid: &PrincipalId) -> Result<watch::Receiver<Vec<CartLine>>, CartError> {
        let mut watchers = self.watchers.lock().await;
        if let Some(active) = watchers.get(uid) {
            return Ok(active.lines.clone());
        }

        let raw = self.gateway.watch(&collections::cart_for(uid)).await?;
        let initial = Self::parse_lines(&raw.snapshot());
        let (tx, rx) = watch::channel(initial);

        let mut raw_rx = raw.subscribe();
        let forwarder = tokio::spawn(async move {
            while raw_rx.changed().await.is_ok() {
                let snapshot = raw_rx.borrow_and_update().clone();
                let parsed = Self::parse_lines(&snapshot);
                tx.send_if_modified(|current| {
                    if *current == parsed {
                        false
                    } else {
                        *current = parsed;
                        true
                    }
                });
            }
        });

        info!(%uid, "cart subscription attached");
        watchers.insert(
            uid.clone(),
            ActiveCart {
                lines: rx.clone(),
                raw,
                forwarder,
            },
        );
        Ok(rx)
    }

    /// Tear down the principal's subscription, if any.
    ///
    /// Called on logout so that nothing keeps observing the previous
    /// principal's sub-collection.
    pub async fn detach(&self, uid: &PrincipalId) {
        if self.watchers.lock().await.remove(uid).is_some() {
            info!(%uid, "cart subscription detached");
        }
    }

    /// Ask the principal's watcher for an immediate re-read after a
    /// confirmed mutation.
    async fn refresh(&self, uid: &PrincipalId) {
        if let Some(active) = self.watchers.lock().await.get(uid) {
            active.raw.request_refresh();
        }
    }

    /// Live view of the principal's cart lines.
    ///
    /// # Errors
    ///
    /// `CartError::NotAuthenticated` without a principal; gateway errors
    /// when the subscription cannot be established.
    pub async fn observe_lines(
        &self,
        principal: Option<&CurrentUser>,
    ) -> Result<watch::Receiver<Vec<CartLine>>, CartError> {
        let user = Self::require_user(principal)?;
        self.attach(&user.uid).await
    }

    /// Latest confirmed snapshot of the principal's cart.
    ///
    /// # Errors
    ///
    /// Same as [`Self::observe_lines`].
    pub async fn lines(&self, principal: Option<&CurrentUser>) -> Result<Vec<CartLine>, CartError> {
        let rx = self.observe_lines(principal).await?;
        let snapshot = rx.borrow().clone();
        Ok(snapshot)
    }

    /// Sum of `unit_price x quantity` over the current snapshot.
    ///
    /// # Errors
    ///
    /// Same as [`Self::observe_lines`].
    pub async fn get_total(&self, principal: Option<&CurrentUser>) -> Result<Price, CartError> {
        Ok(cart::cart_total(&self.lines(principal).await?))
    }

    /// Add a catalog entry to the cart.
    ///
    /// Scans the current snapshot for a line with the same
    /// `(title, author)` first; when found, the add becomes a quantity
    /// increment on that line. Duplicate catalog entries must never
    /// produce duplicate cart lines.
    ///
    /// # Errors
    ///
    /// `CartError::NotAuthenticated` without a principal; gateway errors
    /// are propagated to the caller.
    #[instrument(skip(self, principal, book), fields(title = %book.title))]
    pub async fn add_item(
        &self,
        principal: Option<&CurrentUser>,
        book: &Book,
        requested_qty: u32,
    ) -> Result<CartMutation, CartError> {
        let user = Self::require_user(principal)?;
        let requested = requested_qty.max(1);

        let rx = self.attach(&user.uid).await?;
        let existing = {
            let snapshot = rx.borrow();
            snapshot
                .iter()
                .find(|line| line.merge_key() == (book.title.as_str(), book.author.as_str()))
                .map(|line| (line.id.clone(), line.quantity))
        };

        if let Some((line_id, quantity)) = existing {
            let merged = quantity + requested;
            self.set_quantity(principal, &line_id, merged).await?;
            return Ok(CartMutation::Merged { quantity: merged });
        }

        self.gateway
            .create(
                &collections::cart_for(&user.uid),
                CartLine::fields_for_new(book, requested),
            )
            .await?;
        self.refresh(&user.uid).await;
        Ok(CartMutation::Added)
    }

    /// Set a line's quantity. A requested quantity below 1 removes the
    /// line; a non-positive quantity is never stored.
    ///
    /// # Errors
    ///
    /// `CartError::NotAuthenticated` without a principal; gateway errors
    /// are propagated to the caller.
    #[instrument(skip(self, principal))]
    pub async fn set_quantity(
        &self,
        principal: Option<&CurrentUser>,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<CartMutation, CartError> {
        let user = Self::require_user(principal)?;

        if quantity < 1 {
            return self.remove_item(principal, line_id).await;
        }

        self.gateway
            .update(
                &collections::cart_for(&user.uid),
                line_id.as_str(),
                CartLine::quantity_patch(quantity),
            )
            .await?;
        self.refresh(&user.uid).await;
        Ok(CartMutation::Updated { quantity })
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// `CartError::NotAuthenticated` without a principal; gateway errors
    /// are propagated to the caller.
    #[instrument(skip(self, principal))]
    pub async fn remove_item(
        &self,
        principal: Option<&CurrentUser>,
        line_id: &CartLineId,
    ) -> Result<CartMutation, CartError> {
        let user = Self::require_user(principal)?;

        self.gateway
            .delete(&collections::cart_for(&user.uid), line_id.as_str())
            .await?;
        self.refresh(&user.uid).await;
        Ok(CartMutation::Removed)
    }

    /// Delete a line after its reservation was created, without treating a
    /// failure as fatal.
    ///
    /// Used by the reservation workflow's best-effort cleanup; a failed
    /// delete leaves a stale line that the next snapshot still shows.
    pub(crate) async fn clear_line_best_effort(
        &self,
        uid: &PrincipalId,
        line_id: &CartLineId,
    ) -> bool {
        match self
            .gateway
            .delete(&collections::cart_for(uid), line_id.as_str())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(%uid, %line_id, error = %e, "failed to clear reserved cart line");
                false
            }
        }
    }

    /// Refresh hook for workflows that mutate the cart collection
    /// directly.
    pub(crate) async fn refresh_for(&self, uid: &PrincipalId) {
        self.refresh(uid).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use libreria_core::Email;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    fn user(uid: &str) -> CurrentUser {
        CurrentUser {
            uid: PrincipalId::new(uid),
            email: Email::parse(&format!("{uid}@example.com")).expect("email"),
            display_name: None,
            photo_url: None,
            id_token: None,
        }
    }

    fn book(title: &str, author: &str, price: &str) -> Book {
        Book {
            id: libreria_core::BookId::new(format!("{title}-{author}")),
            title: title.to_owned(),
            author: author.to_owned(),
            price: Price::new(Decimal::from_str(price).expect("decimal")),
            stock: 10,
            description: String::new(),
            image: String::new(),
            genres: Vec::new(),
            featured: false,
            published: true,
            editorial: None,
        }
    }

    async fn wait_for<F>(rx: &mut watch::Receiver<Vec<CartLine>>, pred: F) -> Vec<CartLine>
    where
        F: Fn(&[CartLine]) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let lines = rx.borrow().clone();
                    if pred(&lines) {
                        return lines;
                    }
                }
                rx.changed().await.expect("cart watch closed");
            }
        })
        .await
        .expect("timed out waiting for cart snapshot")
    }

    #[tokio::test]
    async fn mutations_require_a_principal() {
        let service = CartService::new(Arc::new(MemoryGateway::new()));
        let err = service
            .add_item(None, &book("1984", "George Orwell", "24.99"), 1)
            .await
            .expect_err("must fail");
        assert!(matches!(err, CartError::NotAuthenticated));
    }

    #[tokio::test]
    async fn equal_title_author_adds_merge_into_one_line() {
        let service = CartService::new(Arc::new(MemoryGateway::new()));
        let shopper = user("u1");

        // Two distinct catalog entries with the same title and author.
        let first = book("Frankenstein", "Mary Shelley", "29.99");
        let mut second = book("Frankenstein", "Mary Shelley", "29.99");
        second.id = libreria_core::BookId::new("duplicate-entry");

        let mut rx = service
            .observe_lines(Some(&shopper))
            .await
            .expect("observe");

        service
            .add_item(Some(&shopper), &first, 1)
            .await
            .expect("add");
        wait_for(&mut rx, |lines| lines.len() == 1).await;

        let outcome = service
            .add_item(Some(&shopper), &second, 2)
            .await
            .expect("add again");
        assert_eq!(outcome, CartMutation::Merged { quantity: 3 });

        let lines = wait_for(&mut rx, |lines| {
            lines.len() == 1 && lines.iter().all(|l| l.quantity == 3)
        })
        .await;
        assert_eq!(lines.len(), 1);
    }

    #[tokio::test]
    async fn quantity_below_one_removes_the_line() {
        let service = CartService::new(Arc::new(MemoryGateway::new()));
        let shopper = user("u1");

        service
            .add_item(Some(&shopper), &book("1984", "George Orwell", "24.99"), 1)
            .await
            .expect("add");

        let mut rx = service
            .observe_lines(Some(&shopper))
            .await
            .expect("observe");
        let lines = wait_for(&mut rx, |lines| lines.len() == 1).await;
        let line_id = lines.first().expect("line").id.clone();

        let outcome = service
            .set_quantity(Some(&shopper), &line_id, 0)
            .await
            .expect("set");
        assert_eq!(outcome, CartMutation::Removed);
        wait_for(&mut rx, |lines| lines.is_empty()).await;
    }

    #[tokio::test]
    async fn get_total_sums_the_snapshot() {
        let service = CartService::new(Arc::new(MemoryGateway::new()));
        let shopper = user("u1");

        service
            .add_item(
                Some(&shopper),
                &book("Frankenstein", "Mary Shelley", "29.99"),
                2,
            )
            .await
            .expect("add");
        service
            .add_item(Some(&shopper), &book("1984", "George Orwell", "24.99"), 1)
            .await
            .expect("add");

        let mut rx = service
            .observe_lines(Some(&shopper))
            .await
            .expect("observe");
        wait_for(&mut rx, |lines| lines.len() == 2).await;

        let total = service.get_total(Some(&shopper)).await.expect("total");
        assert_eq!(total.to_string(), "84.97");
    }

    #[tokio::test]
    async fn switching_principals_never_shows_residual_lines() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = CartService::new(gateway.clone());
        let alice = user("alice");
        let bob = user("bob");

        for title in ["A", "B", "C"] {
            service
                .add_item(Some(&alice), &book(title, "Author", "10.00"), 1)
                .await
                .expect("add");
        }
        let mut alice_rx = service
            .observe_lines(Some(&alice))
            .await
            .expect("observe alice");
        wait_for(&mut alice_rx, |lines| lines.len() == 3).await;

        // Logout tears the subscription down before the switch.
        service.detach(&alice.uid).await;

        let bob_rx = service.observe_lines(Some(&bob)).await.expect("observe bob");
        assert!(bob_rx.borrow().is_empty(), "bob must never see alice's lines");

        // The detached channel is closed; nothing keeps feeding it.
        let closed = alice_rx.changed().await;
        assert!(closed.is_err(), "alice's watch must be torn down");
    }

    #[tokio::test]
    async fn malformed_cart_documents_are_skipped() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = CartService::new(gateway.clone());
        let shopper = user("u1");

        gateway
            .create(
                &collections::cart_for(&shopper.uid),
                json!({"author": "No Title"}),
            )
            .await
            .expect("create raw");
        gateway
            .create(
                &collections::cart_for(&shopper.uid),
                json!({"title": "Valid", "author": "A", "price": "5.00", "quantity": 1}),
            )
            .await
            .expect("create raw");

        let lines = service.lines(Some(&shopper)).await.expect("lines");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines.first().expect("line").title, "Valid");
    }
}

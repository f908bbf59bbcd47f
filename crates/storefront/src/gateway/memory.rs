//! In-process collection gateway.
//!
//! Backs local development (`GATEWAY_MODE=memory`) and the workflow tests.
//! Watches are driven by a change notifier, so snapshots arrive promptly
//! after every mutation instead of on a poll interval.
//!
//! The gateway also supports fault injection on create/delete so that
//! partial-batch semantics (reservation submission) are testable without a
//! real backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, watch};

use super::{CollectionGateway, CollectionWatch, GatewayError, RawDocument};

/// In-memory document store implementing [`CollectionGateway`].
#[derive(Clone, Default)]
pub struct MemoryGateway {
    inner: Arc<MemoryGatewayInner>,
}

#[derive(Default)]
struct MemoryGatewayInner {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    next_id: AtomicU64,
    changed: Notify,
    /// Remaining successful creates per path before injected failure.
    create_budget: Mutex<HashMap<String, u64>>,
    /// Paths whose deletes fail.
    failing_deletes: Mutex<Vec<String>>,
}

impl MemoryGateway {
    /// Create an empty in-memory gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// After `budget` more successful creates on `path`, fail every
    /// subsequent create with a synthetic backend error.
    pub fn fail_creates_after(&self, path: &str, budget: u64) {
        self.inner
            .create_budget
            .lock()
            .expect("create budget lock")
            .insert(path.to_owned(), budget);
    }

    /// Make every delete on `path` fail with a synthetic backend error.
    pub fn fail_deletes(&self, path: &str) {
        self.inner
            .failing_deletes
            .lock()
            .expect("failing deletes lock")
            .push(path.to_owned());
    }

    fn assign_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("doc-{n:06}")
    }

    fn snapshot_of(&self, path: &str) -> Vec<RawDocument> {
        let collections = self.inner.collections.lock().expect("collections lock");
        collections.get(path).map_or_else(Vec::new, |docs| {
            docs.iter()
                .map(|(id, fields)| RawDocument::new(id.clone(), fields.clone()))
                .collect()
        })
    }

    fn injected_create_failure(&self, path: &str) -> bool {
        let mut budget = self.inner.create_budget.lock().expect("create budget lock");
        match budget.get_mut(path) {
            Some(0) => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        }
    }

    fn injected_delete_failure(&self, path: &str) -> bool {
        self.inner
            .failing_deletes
            .lock()
            .expect("failing deletes lock")
            .iter()
            .any(|p| p == path)
    }

    fn synthetic_failure() -> GatewayError {
        GatewayError::Status {
            status: 500,
            body: "injected backend failure".to_owned(),
        }
    }
}

#[async_trait]
impl CollectionGateway for MemoryGateway {
    async fn list(&self, path: &str) -> Result<Vec<RawDocument>, GatewayError> {
        Ok(self.snapshot_of(path))
    }

    async fn get(&self, path: &str, id: &str) -> Result<Option<RawDocument>, GatewayError> {
        let collections = self.inner.collections.lock().expect("collections lock");
        Ok(collections
            .get(path)
            .and_then(|docs| docs.get(id))
            .map(|fields| RawDocument::new(id.to_owned(), fields.clone())))
    }

    async fn create(&self, path: &str, fields: Value) -> Result<String, GatewayError> {
        if self.injected_create_failure(path) {
            return Err(Self::synthetic_failure());
        }

        let id = self.assign_id();
        {
            let mut collections = self.inner.collections.lock().expect("collections lock");
            collections
                .entry(path.to_owned())
                .or_default()
                .insert(id.clone(), fields);
        }
        self.inner.changed.notify_waiters();
        Ok(id)
    }

    async fn set(&self, path: &str, id: &str, fields: Value) -> Result<(), GatewayError> {
        {
            let mut collections = self.inner.collections.lock().expect("collections lock");
            collections
                .entry(path.to_owned())
                .or_default()
                .insert(id.to_owned(), fields);
        }
        self.inner.changed.notify_waiters();
        Ok(())
    }

    async fn update(&self, path: &str, id: &str, patch: Value) -> Result<(), GatewayError> {
        {
            let mut collections = self.inner.collections.lock().expect("collections lock");
            let doc = collections
                .get_mut(path)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| GatewayError::NotFound(format!("{path}/{id}")))?;

            // Partial merge: patch keys overwrite, everything else stays.
            if let (Value::Object(target), Value::Object(source)) = (&mut *doc, patch) {
                for (key, value) in source {
                    target.insert(key, value);
                }
            } else {
                return Err(GatewayError::Status {
                    status: 400,
                    body: "patch must be a JSON object".to_owned(),
                });
            }
        }
        self.inner.changed.notify_waiters();
        Ok(())
    }

    async fn delete(&self, path: &str, id: &str) -> Result<(), GatewayError> {
        if self.injected_delete_failure(path) {
            return Err(Self::synthetic_failure());
        }

        {
            let mut collections = self.inner.collections.lock().expect("collections lock");
            let removed = collections
                .get_mut(path)
                .and_then(|docs| docs.remove(id))
                .is_some();
            if !removed {
                return Err(GatewayError::NotFound(format!("{path}/{id}")));
            }
        }
        self.inner.changed.notify_waiters();
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<CollectionWatch, GatewayError> {
        let (tx, rx) = watch::channel(self.snapshot_of(path));
        let refresh = Arc::new(Notify::new());

        let gateway = self.clone();
        let watch_path = path.to_owned();
        let watch_refresh = Arc::clone(&refresh);
        let producer = tokio::spawn(async move {
            loop {
                // The sleep arm catches notifications raced before this
                // task registered as a waiter.
                tokio::select! {
                    () = gateway.inner.changed.notified() => {}
                    () = watch_refresh.notified() => {}
                    () = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
                }

                let snapshot = gateway.snapshot_of(&watch_path);
                tx.send_if_modified(|current| {
                    if *current == snapshot {
                        false
                    } else {
                        *current = snapshot;
                        true
                    }
                });

                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(CollectionWatch::new(rx, refresh, producer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let gateway = MemoryGateway::new();
        let a = gateway.create("libros", json!({"title": "A"})).await.expect("create");
        let b = gateway.create("libros", json!({"title": "B"})).await.expect("create");
        assert_ne!(a, b);
        assert_eq!(gateway.list("libros").await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn update_is_partial_merge() {
        let gateway = MemoryGateway::new();
        let id = gateway
            .create("libros", json!({"title": "A", "stock": 3}))
            .await
            .expect("create");
        gateway
            .update("libros", &id, json!({"stock": 5}))
            .await
            .expect("update");

        let doc = gateway.get("libros", &id).await.expect("get").expect("doc");
        assert_eq!(doc.fields.get("title"), Some(&json!("A")));
        assert_eq!(doc.fields.get("stock"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let gateway = MemoryGateway::new();
        let err = gateway.delete("libros", "nope").await.expect_err("missing");
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn injected_create_failures_respect_budget() {
        let gateway = MemoryGateway::new();
        gateway.fail_creates_after("reserva", 1);

        assert!(gateway.create("reserva", json!({})).await.is_ok());
        assert!(gateway.create("reserva", json!({})).await.is_err());
        // Other paths are unaffected.
        assert!(gateway.create("libros", json!({})).await.is_ok());
    }

    #[tokio::test]
    async fn watch_sees_mutations() {
        let gateway = MemoryGateway::new();
        let watch = gateway.watch("libros").await.expect("watch");
        let mut rx = watch.subscribe();
        assert!(rx.borrow().is_empty());

        gateway.create("libros", json!({"title": "A"})).await.expect("create");
        rx.changed().await.expect("changed");
        assert_eq!(rx.borrow().len(), 1);
    }
}

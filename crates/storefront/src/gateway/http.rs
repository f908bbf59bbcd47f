//! REST/JSON client for the hosted document database.
//!
//! Wire contract (all under the project document root):
//!
//! ```text
//! GET    {root}/{path}          -> {"documents": [{"id": "...", "fields": {...}}, ...]}
//! GET    {root}/{path}/{id}     -> {"id": "...", "fields": {...}}
//! POST   {root}/{path}          <- {"fields": {...}}        -> {"id": "..."}
//! PATCH  {root}/{path}/{id}     <- {"fields": {...}}        (partial merge)
//! DELETE {root}/{path}/{id}
//! ```
//!
//! Catalog and configuration reads are cached via `moka` (5-minute TTL);
//! writes to a cached path invalidate it. Collection watches poll in a
//! background task and push snapshots into a watch channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::{Notify, watch};
use tracing::{debug, instrument, warn};

use crate::config::GatewayConfig;

use super::{CollectionGateway, CollectionWatch, GatewayError, RawDocument, collections};

/// Poll interval for collection watches.
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Collections whose list responses are safe to cache briefly.
///
/// Carts and reservations must never be cached: their snapshots feed the
/// live views that mutations are checked against.
const CACHEABLE_PATHS: &[&str] = &[collections::BOOKS, collections::CONFIGURATION];

/// REST client for the hosted document database.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    document_root: String,
    api_key: String,
    cache: Cache<String, Vec<RawDocument>>,
}

impl HttpGateway {
    /// Create a new gateway client from configuration.
    ///
    /// No application-level timeouts are configured; the HTTP client's
    /// defaults apply.
    #[must_use]
    pub fn new(config: &GatewayConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let document_root = format!(
            "{}/v1/projects/{}/documents",
            config.endpoint.trim_end_matches('/'),
            config.project_id
        );

        Self {
            inner: Arc::new(HttpGatewayInner {
                client: reqwest::Client::new(),
                document_root,
                api_key: config.api_key.expose_secret().to_string(),
                cache,
            }),
        }
    }

    fn collection_url(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.document_root)
    }

    fn document_url(&self, path: &str, id: &str) -> String {
        format!("{}/{path}/{id}", self.inner.document_root)
    }

    /// Check a response status, surfacing rate limits distinctly.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(GatewayError::RateLimited(retry_after));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }

    async fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.collection_url(path))
            .header("X-Api-Key", &self.inner.api_key)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: Value = response.json().await?;
        let documents = body
            .get("documents")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(documents
            .into_iter()
            .filter_map(|doc| {
                let id = doc.get("id").and_then(Value::as_str)?.to_owned();
                let fields = doc.get("fields").cloned().unwrap_or(Value::Null);
                Some(RawDocument::new(id, fields))
            })
            .collect())
    }

    async fn invalidate(&self, path: &str) {
        if CACHEABLE_PATHS.contains(&path) {
            self.inner.cache.invalidate(path).await;
        }
    }
}

#[async_trait]
impl CollectionGateway for HttpGateway {
    #[instrument(skip(self))]
    async fn list(&self, path: &str) -> Result<Vec<RawDocument>, GatewayError> {
        if CACHEABLE_PATHS.contains(&path) {
            if let Some(cached) = self.inner.cache.get(path).await {
                debug!(path, "collection cache hit");
                return Ok(cached);
            }
        }

        let documents = self.fetch_collection(path).await?;

        if CACHEABLE_PATHS.contains(&path) {
            self.inner
                .cache
                .insert(path.to_owned(), documents.clone())
                .await;
        }

        Ok(documents)
    }

    #[instrument(skip(self))]
    async fn get(&self, path: &str, id: &str) -> Result<Option<RawDocument>, GatewayError> {
        let response = self
            .inner
            .client
            .get(self.document_url(path, id))
            .header("X-Api-Key", &self.inner.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(response).await?;

        let body: Value = response.json().await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(id)
            .to_owned();
        let fields = body.get("fields").cloned().unwrap_or(Value::Null);
        Ok(Some(RawDocument::new(id, fields)))
    }

    #[instrument(skip(self, fields))]
    async fn create(&self, path: &str, fields: Value) -> Result<String, GatewayError> {
        let response = self
            .inner
            .client
            .post(self.collection_url(path))
            .header("X-Api-Key", &self.inner.api_key)
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body: Value = response.json().await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Status {
                status: 200,
                body: "create response missing document id".to_owned(),
            })?
            .to_owned();

        self.invalidate(path).await;
        Ok(id)
    }

    #[instrument(skip(self, fields))]
    async fn set(&self, path: &str, id: &str, fields: Value) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .put(self.document_url(path, id))
            .header("X-Api-Key", &self.inner.api_key)
            .json(&serde_json::json!({ "fields": fields }))
            .send()
            .await?;
        Self::check_status(response).await?;

        self.invalidate(path).await;
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, path: &str, id: &str, patch: Value) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .patch(self.document_url(path, id))
            .header("X-Api-Key", &self.inner.api_key)
            .json(&serde_json::json!({ "fields": patch }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(format!("{path}/{id}")));
        }
        Self::check_status(response).await?;

        self.invalidate(path).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str, id: &str) -> Result<(), GatewayError> {
        let response = self
            .inner
            .client
            .delete(self.document_url(path, id))
            .header("X-Api-Key", &self.inner.api_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(format!("{path}/{id}")));
        }
        Self::check_status(response).await?;

        self.invalidate(path).await;
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<CollectionWatch, GatewayError> {
        let initial = self.fetch_collection(path).await?;
        let (tx, rx) = watch::channel(initial);
        let refresh = Arc::new(Notify::new());

        let gateway = self.clone();
        let poll_path = path.to_owned();
        let poll_refresh = Arc::clone(&refresh);
        let producer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = tokio::time::sleep(WATCH_POLL_INTERVAL) => {}
                    () = poll_refresh.notified() => {}
                }

                match gateway.fetch_collection(&poll_path).await {
                    Ok(snapshot) => {
                        // Only wake consumers when the collection changed.
                        tx.send_if_modified(|current| {
                            if *current == snapshot {
                                false
                            } else {
                                *current = snapshot;
                                true
                            }
                        });
                    }
                    Err(e) => {
                        // Keep the last confirmed snapshot; the next poll
                        // retries.
                        warn!(path = %poll_path, error = %e, "collection watch poll failed");
                    }
                }

                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(CollectionWatch::new(rx, refresh, producer))
    }
}

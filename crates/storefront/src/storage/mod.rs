//! Object storage client for catalog and avatar images.

use thiserror::Error;
use tracing::instrument;

use crate::config::StorageConfig;

/// Errors from the object storage service.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("storage returned HTTP {0}")]
    Status(u16),
}

/// Client for the object storage service.
///
/// Uploads are fire-and-confirm: bytes are PUT to a path and the public
/// download URL is derived from the same path. No listing or deletion is
/// needed anywhere in the application.
#[derive(Clone)]
pub struct MediaStorage {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl MediaStorage {
    /// Create a new storage client from configuration.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            bucket: config.bucket.clone(),
        }
    }

    /// Upload bytes to `path` and return the public download URL.
    ///
    /// # Errors
    ///
    /// Returns an error when the upload is rejected or the request fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!(
            "{}/upload/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(path)
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Status(response.status().as_u16()));
        }

        Ok(self.download_url(path))
    }

    /// Public download URL for an object path.
    #[must_use]
    pub fn download_url(&self, path: &str) -> String {
        format!(
            "{}/v1/b/{}/o/{}?alt=media",
            self.endpoint,
            self.bucket,
            urlencoding::encode(path)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_percent_encodes_the_path() {
        let storage = MediaStorage::new(&StorageConfig {
            endpoint: "https://media.example.com".to_owned(),
            bucket: "libreria".to_owned(),
        });
        let url = storage.download_url("covers/el quijote.jpg");
        assert_eq!(
            url,
            "https://media.example.com/v1/b/libreria/o/covers%2Fel%20quijote.jpg?alt=media"
        );
    }
}

//! HTTP document store client
//!
//! Talks to an RTDB-style document service where every document is
//! addressable as `{base_url}/{collection}/{key}.json`. A GET on an
//! absent key returns the JSON literal `null` (some deployments return
//! 404 instead); both read as "no document". Writes are idempotent
//! PUTs of the full document.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::DocumentStore;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP client for the document store
pub struct HttpDocumentStore {
    http_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpDocumentStore {
    /// Create a client from store configuration
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Store(format!("http client init failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// Document URL for a collection/key pair
    fn document_url(&self, collection: &str, key: &str) -> String {
        match &self.auth_token {
            Some(token) => format!(
                "{}/{}/{}.json?auth={}",
                self.base_url, collection, key, token
            ),
            None => format!("{}/{}/{}.json", self.base_url, collection, key),
        }
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        let url = self.document_url(collection, key);
        tracing::debug!(collection = %collection, key = %key, "Store GET");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Store(format!("GET {}/{}: {}", collection, key, e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "GET {}/{} returned {}: {}",
                collection, key, status, error_text
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("GET {}/{} body: {}", collection, key, e)))?;

        // Absent documents come back as the JSON literal `null`
        if value.is_null() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let url = self.document_url(collection, key);
        tracing::debug!(collection = %collection, key = %key, "Store PUT");

        let response = self
            .http_client
            .put(&url)
            .json(value)
            .send()
            .await
            .map_err(|e| Error::Store(format!("PUT {}/{}: {}", collection, key, e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "PUT {}/{} returned {}: {}",
                collection, key, status, error_text
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

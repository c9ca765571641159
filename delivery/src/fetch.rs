//! Bundle endpoint client.

use sideload_types::{BundleDocument, CodeBundle};

use crate::{DEFAULT_BUNDLE_ENDPOINT, MAX_ERROR_BODY_BYTES, http_client};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection-level failure reaching the endpoint.
    #[error("bundle request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("bundle endpoint returned {status}")]
    Status {
        status: reqwest::StatusCode,
        /// Leading bytes of the error body, for log context.
        body: String,
    },
    /// The response body was not a valid bundle document.
    #[error("malformed bundle document: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Fetches the code bundle the host has authorized this sandbox to load.
#[derive(Debug, Clone)]
pub struct BundleFetcher {
    endpoint: String,
}

impl BundleFetcher {
    /// Fetcher against the canonical endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_BUNDLE_ENDPOINT)
    }

    /// Fetcher against a specific endpoint. Tests point this at a mock
    /// server; production callers use [`BundleFetcher::new`].
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Perform the single authenticated GET and decode the bundle.
    ///
    /// Propagates on network error, non-2xx status, or malformed JSON.
    /// Nothing is retried.
    pub async fn fetch(&self, token: &str) -> Result<CodeBundle, FetchError> {
        let response = http_client()
            .get(&self.endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = truncated_body(response).await;
            tracing::warn!("bundle endpoint returned {status}");
            return Err(FetchError::Status { status, body });
        }

        let body = response.text().await?;
        let document: BundleDocument = serde_json::from_str(&body)?;
        tracing::debug!("fetched bundle with {} files", document.code.len());
        Ok(document.code)
    }
}

impl Default for BundleFetcher {
    fn default() -> Self {
        Self::new()
    }
}

async fn truncated_body(response: reqwest::Response) -> String {
    let Ok(mut body) = response.text().await else {
        return String::new();
    };
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut end = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}

//! Authenticated retrieval of code bundles.
//!
//! The fetcher performs a single `GET` against the bundle endpoint,
//! authenticated with a bearer token obtained from the host. There is no
//! retry: a failed fetch aborts the whole patch run for this process
//! lifetime.

use std::sync::OnceLock;
use std::time::Duration;

mod fetch;

pub use fetch::{BundleFetcher, FetchError};

/// Canonical bundle endpoint.
pub const DEFAULT_BUNDLE_ENDPOINT: &str = "https://api.sideload.dev/v0/bundle";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Cap on how much of a non-2xx body is kept for error reporting.
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

pub(crate) fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("failed to build tuned HTTP client: {e}; using defaults");
                reqwest::Client::new()
            })
    })
}

//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::auth::DEFAULT_REFRESH_PATH;
use crate::cache::StoreConfig;

/// Base URL the console talks to unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "https://restcountries.com/v3.1/";

/// Configuration for an [`Api`](crate::api::Api).
///
/// Every field has a default, so a partial JSON or TOML document is enough:
///
/// ```
/// use querykit::config::ApiConfig;
///
/// let config: ApiConfig = serde_json::from_str(
///     r#"{ "base_url": "https://api.example.com/v1/", "store": { "refetch_on_reconnect": false } }"#,
/// ).unwrap();
///
/// assert_eq!(config.refresh_path, "auth/refresh");
/// assert!(!config.store.refetch_on_reconnect);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// URL every relative endpoint path is resolved against.
    pub base_url: String,

    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// Path of the token refresh endpoint, relative to `base_url`.
    pub refresh_path: String,

    /// Cache behavior.
    pub store: StoreConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    /// Creates a configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: None,
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            store: StoreConfig::default(),
        }
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the cache configuration.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

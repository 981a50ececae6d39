use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;

use super::request::{RawResponse, RequestDescriptor};

/// Something that can carry a [`RequestDescriptor`] to a server.
///
/// Implementations perform exactly one attempt per call; retry policy
/// belongs to callers.
pub trait Transport: Send + Sync {
    /// Issues the request and returns the normalized result.
    fn execute<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> BoxFuture<'a, Result<RawResponse, ApiError>>;
}

/// [`Transport`] backed by `reqwest`, resolving relative URLs against a base URL.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: Url,
    timeout: Option<Duration>,
}

impl HttpExecutor {
    /// Creates an executor for the given base URL.
    ///
    /// A missing trailing `/` on the base path is added so relative
    /// request paths extend it instead of replacing its last segment.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|err| ApiError::InvalidUrl(format!("{base_url}: {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().build().map_err(|err| {
            warn!(error = %err, "Failed to build HTTP client.");
            ApiError::Network(format!("Failed to build HTTP client: {err}"))
        })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a request URL against the base URL.
    ///
    /// Absolute URLs are returned unchanged. A leading `/` on a relative
    /// path is ignored.
    pub fn resolve(&self, target: &str) -> Result<Url, ApiError> {
        if let Ok(url) = Url::parse(target) {
            return Ok(url);
        }
        self.base_url
            .join(target.trim_start_matches('/'))
            .map_err(|err| ApiError::InvalidUrl(format!("{target}: {err}")))
    }

    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let url = self.resolve(&request.url)?;
        debug!(method = %request.method, %url, "Sending request.");

        let mut builder = self.client.request(request.method.into(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|err| classify(&url, &err))?;
        let status = response.status();
        let text = response.text().await.map_err(|err| classify(&url, &err))?;
        let body = parse_body(&text);
        debug!(%url, status = status.as_u16(), "Received response.");

        if status.is_success() {
            Ok(RawResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ApiError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl Transport for HttpExecutor {
    fn execute<'a>(
        &'a self,
        request: &'a RequestDescriptor,
    ) -> BoxFuture<'a, Result<RawResponse, ApiError>> {
        Box::pin(self.send(request))
    }
}

fn classify(url: &Url, err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        debug!(%url, "Request timed out.");
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        debug!(error = %err, %url, "Request failed.");
        ApiError::Network(err.to_string())
    }
}

/// Parses a response body: JSON when possible, otherwise the raw text.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

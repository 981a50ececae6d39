//! Error types shared by every layer of the client.

use serde_json::Value;
use thiserror::Error;

/// Error type for requests issued through the client.
///
/// Values are `Clone` so cache snapshots can hand the same error to every
/// subscriber of an entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server could not be reached or the connection broke mid-request.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, parsed as JSON when possible.
        body: Value,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The request URL could not be resolved against the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// A body could not be encoded or decoded.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The request referred to an endpoint the registry does not know.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` for a `401 Unauthorized` response.
    ///
    /// This is the signal that moves the auth interceptor into its
    /// reauthentication phase.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Returns the response body for HTTP errors.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Errors detected while registering or looking up endpoints.
///
/// These are fatal: a registry that fails validation is never built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two endpoints were registered under the same name.
    #[error("Endpoint `{0}` is defined more than once")]
    DuplicateEndpoint(String),

    /// A mutation invalidates a tag that no query provides.
    #[error("Mutation `{endpoint}` invalidates tag `{tag}`, which no query provides")]
    DanglingTag {
        /// The offending mutation.
        endpoint: String,
        /// The tag nothing provides.
        tag: String,
    },

    /// An endpoint uses a tag missing from the declared tag types.
    #[error("Endpoint `{endpoint}` uses undeclared tag `{tag}`")]
    UndeclaredTag {
        /// The offending endpoint.
        endpoint: String,
        /// The undeclared tag.
        tag: String,
    },

    /// A query invalidates tags or a mutation provides them.
    #[error("{kind} `{endpoint}` cannot {role} tags")]
    TagRole {
        /// The offending endpoint.
        endpoint: String,
        /// Its kind.
        kind: &'static str,
        /// What it tried to do with tags.
        role: &'static str,
    },

    /// No endpoint is registered under the requested name.
    #[error("Unknown endpoint `{0}`")]
    UnknownEndpoint(String),

    /// The endpoint exists but is of the other kind.
    #[error("Endpoint `{name}` is a {actual}, not a {expected}")]
    KindMismatch {
        /// Endpoint name.
        name: String,
        /// Kind the caller asked for.
        expected: &'static str,
        /// Kind the endpoint was registered as.
        actual: &'static str,
    },
}

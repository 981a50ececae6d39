use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Opaque label grouping cache entries for bulk invalidation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the tag name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Identity of one cache entry: endpoint name plus canonical arguments.
///
/// Arguments are serialized to JSON with object keys sorted, so two
/// argument values that serialize to the same JSON share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: String,
    args: String,
}

impl CacheKey {
    /// Builds the key for `endpoint` called with `args`.
    pub fn new(endpoint: impl Into<String>, args: &impl Serialize) -> Result<Self, ApiError> {
        let value = serde_json::to_value(args)
            .map_err(|err| ApiError::Decode(format!("arguments: {err}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            args: value.to_string(),
        })
    }

    /// Returns the endpoint name.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the canonical JSON arguments.
    #[must_use]
    pub fn args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

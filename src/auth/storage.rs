use std::sync::Arc;

use dashmap::DashMap;

/// Storage key of the access token.
pub const ACCESS_TOKEN: &str = "accessToken";

/// Storage key of the refresh token.
pub const REFRESH_TOKEN: &str = "refreshToken";

/// Key-value persistence for session tokens.
///
/// The medium is up to the application (browser storage, keychain, a file);
/// the client only needs these three operations.
pub trait TokenStorage: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes a value, replacing any previous one.
    fn set(&self, key: &str, value: &str);

    /// Deletes a value. Deleting a missing key is a no-op.
    fn remove(&self, key: &str);
}

/// In-memory [`TokenStorage`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage already holding both session tokens.
    #[must_use]
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let storage = Self::new();
        storage.set(ACCESS_TOKEN, access_token);
        storage.set(REFRESH_TOKEN, refresh_token);
        storage
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|value| value.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }
}

use std::time::Duration;

use serde::Deserialize;

/// Configuration for cache behavior.
///
/// This controls when cached data is reused, refetched and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How long a settled entry counts as fresh.
    ///
    /// A new subscription to an entry older than this refetches when
    /// `refetch_on_mount_or_arg_change` is set. Zero means every new
    /// subscription refetches.
    pub freshness: Duration,

    /// How long an entry without subscribers is retained before eviction.
    pub keep_unused_for: Duration,

    /// Refetch stale entries when a new subscriber arrives.
    pub refetch_on_mount_or_arg_change: bool,

    /// Refetch every active entry when connectivity returns.
    pub refetch_on_reconnect: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(0),
            keep_unused_for: Duration::from_secs(60),
            refetch_on_mount_or_arg_change: true,
            refetch_on_reconnect: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with the given freshness and retention windows
    /// and both refetch policies enabled.
    #[must_use]
    pub const fn new(freshness: Duration, keep_unused_for: Duration) -> Self {
        Self {
            freshness,
            keep_unused_for,
            refetch_on_mount_or_arg_change: true,
            refetch_on_reconnect: true,
        }
    }
}

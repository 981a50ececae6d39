use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::error::ApiError;

use super::key::Tag;

/// Lifecycle state of a cache entry.
///
/// `Uninitialized → Pending → Fulfilled | Rejected`, and back to `Pending`
/// on refetch. Eviction removes the entry altogether.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Created but never fetched.
    Uninitialized,
    /// A request is in flight.
    Pending,
    /// The last request succeeded.
    Fulfilled,
    /// The last request failed.
    Rejected,
}

/// The stored result (or in-flight state) for one cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Current lifecycle state.
    pub status: EntryStatus,
    /// Data from the last successful fetch, kept while refetching.
    pub data: Option<Value>,
    /// Error from the last fetch, cleared when a fetch succeeds.
    pub error: Option<ApiError>,
    /// When the last fetch settled.
    pub last_fetched_at: Option<Instant>,
    /// Number of live subscriptions.
    pub subscriber_count: usize,
    /// Tags provided by the endpoint that produced the current result.
    pub tags: BTreeSet<Tag>,
}

impl CacheEntry {
    /// Creates an uninitialized entry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            status: EntryStatus::Uninitialized,
            data: None,
            error: None,
            last_fetched_at: None,
            subscriber_count: 0,
            tags: BTreeSet::new(),
        }
    }

    /// Marks a request as in flight.
    pub const fn begin_fetch(&mut self) {
        self.status = EntryStatus::Pending;
    }

    /// Records a successful fetch.
    pub fn fulfill(&mut self, data: Value, tags: BTreeSet<Tag>) {
        self.status = EntryStatus::Fulfilled;
        self.data = Some(data);
        self.error = None;
        self.settle(tags);
    }

    /// Records a failed fetch. Previous data is kept.
    pub fn reject(&mut self, error: ApiError, tags: BTreeSet<Tag>) {
        self.status = EntryStatus::Rejected;
        self.error = Some(error);
        self.settle(tags);
    }

    fn settle(&mut self, tags: BTreeSet<Tag>) {
        self.tags = tags;
        self.last_fetched_at = Some(Instant::now());
    }

    /// Checks if this entry is older than `freshness`. Unfetched entries are stale.
    #[must_use]
    pub fn is_stale(&self, freshness: Duration) -> bool {
        self.last_fetched_at
            .is_none_or(|fetched| fetched.elapsed() >= freshness)
    }

    /// Returns `true` when the entry should be fetched for a new subscriber.
    #[must_use]
    pub fn needs_fetch(&self, refetch_on_mount: bool, freshness: Duration) -> bool {
        match self.status {
            EntryStatus::Uninitialized => true,
            EntryStatus::Pending => false,
            EntryStatus::Fulfilled | EntryStatus::Rejected => {
                refetch_on_mount && self.is_stale(freshness)
            }
        }
    }

    /// Returns the view handed to subscribers.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
        }
    }
}

impl Default for CacheEntry {
    fn default() -> Self {
        Self::new()
    }
}

/// What a subscriber sees of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Current lifecycle state.
    pub status: EntryStatus,
    /// Last successful data, if any.
    pub data: Option<Value>,
    /// Last error, if the last fetch failed.
    pub error: Option<ApiError>,
}

impl Snapshot {
    /// Returns `true` while a request is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }

    /// Returns `true` once a fetch has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.status, EntryStatus::Fulfilled | EntryStatus::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    fn tags(names: &[&str]) -> BTreeSet<Tag> {
        names.iter().copied().map(Tag::from).collect()
    }

    #[test]
    fn test_new_entry() {
        let entry = CacheEntry::new();
        assert_eq!(entry.status, EntryStatus::Uninitialized);
        assert!(entry.is_stale(Duration::from_secs(60)));
        assert!(entry.needs_fetch(false, Duration::from_secs(60)));
    }

    #[test]
    fn test_fulfill_then_refetch_keeps_data() {
        let mut entry = CacheEntry::new();
        entry.begin_fetch();
        entry.fulfill(json!([1]), tags(&["GetIncidentsList"]));
        assert_eq!(entry.status, EntryStatus::Fulfilled);
        assert_eq!(entry.tags, tags(&["GetIncidentsList"]));

        entry.begin_fetch();
        let snapshot = entry.snapshot();
        assert!(snapshot.is_pending());
        assert_eq!(snapshot.data, Some(json!([1])));
    }

    #[test]
    fn test_reject_keeps_data_and_success_clears_error() {
        let mut entry = CacheEntry::new();
        entry.fulfill(json!("old"), BTreeSet::new());
        entry.reject(ApiError::Timeout, BTreeSet::new());
        assert_eq!(entry.data, Some(json!("old")));
        assert_eq!(entry.error, Some(ApiError::Timeout));

        entry.fulfill(json!("new"), BTreeSet::new());
        assert_eq!(entry.error, None);
    }

    #[test]
    fn test_staleness() {
        let mut entry = CacheEntry::new();
        entry.fulfill(json!(1), BTreeSet::new());
        assert!(!entry.is_stale(Duration::from_secs(1)));
        assert!(!entry.needs_fetch(true, Duration::from_secs(1)));
        // zero freshness: always stale
        assert!(entry.is_stale(Duration::ZERO));

        sleep(Duration::from_millis(10));
        assert!(entry.is_stale(Duration::from_millis(5)));
        assert!(entry.needs_fetch(true, Duration::from_millis(5)));
        assert!(!entry.needs_fetch(false, Duration::from_millis(5)));
    }

    #[test]
    fn test_pending_never_needs_fetch() {
        let mut entry = CacheEntry::new();
        entry.begin_fetch();
        assert!(!entry.needs_fetch(true, Duration::ZERO));
    }
}

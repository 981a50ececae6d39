//! Tag-aware result cache.
//!
//! Each [`CacheEntry`] holds the latest result of one endpoint called with
//! one set of arguments. Entries are created on first subscription, carry
//! the [`Tag`]s their endpoint provides, refetch when a mutation invalidates
//! one of those tags, and are evicted once nobody has observed them for
//! [`StoreConfig::keep_unused_for`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use querykit::cache::{CacheKey, CacheStore, Tag, fetcher};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), querykit::ApiError> {
//! let store = CacheStore::new();
//! let key = CacheKey::new("getIncidentsList", &())?;
//! let tags: BTreeSet<Tag> = [Tag::from("GetIncidentsList")].into();
//!
//! let mut incidents = store.subscribe(key, tags, fetcher(|| async { Ok(json!([])) }));
//! let settled = incidents.settled().await;
//!
//! // after a mutation touching incidents
//! store.invalidate(["GetIncidentsList"]);
//! # Ok(())
//! # }
//! ```

mod config;
mod entry;
mod key;
mod store;

pub use config::StoreConfig;
pub use entry::{CacheEntry, EntryStatus, Snapshot};
pub use key::{CacheKey, Tag};
pub use store::{CacheStore, Connectivity, Fetcher, ListenerHandle, Subscription, fetcher};

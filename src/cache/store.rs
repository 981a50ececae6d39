use std::collections::BTreeSet;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::ApiError;

use super::config::StoreConfig;
use super::entry::{CacheEntry, Snapshot};
use super::key::{CacheKey, Tag};

/// An async function producing the data for one cache key.
pub type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, ApiError>> + Send + Sync>;

/// Wraps an async closure as a [`Fetcher`].
pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ApiError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Connectivity change reported to [`CacheStore::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// The network became reachable.
    Online,
    /// The network became unreachable.
    Offline,
}

struct Slot {
    // Identifies this incarnation of the key; a fetch or retention timer
    // started for an earlier, dropped slot never touches a recreated one.
    epoch: u64,
    entry: CacheEntry,
    provides: BTreeSet<Tag>,
    fetcher: Fetcher,
    tx: watch::Sender<Snapshot>,
    in_flight: bool,
    refetch_queued: bool,
    // Bumped whenever the subscriber count changes; a retention timer only
    // evicts if the generation it captured is still current.
    generation: u64,
}

impl Slot {
    fn new(epoch: u64, provides: BTreeSet<Tag>, fetcher: Fetcher) -> Self {
        let entry = CacheEntry::new();
        let (tx, _) = watch::channel(entry.snapshot());
        Self {
            epoch,
            entry,
            provides,
            fetcher,
            tx,
            in_flight: false,
            refetch_queued: false,
            generation: 0,
        }
    }

    fn publish(&self) {
        self.tx.send_replace(self.entry.snapshot());
    }

    /// Marks the slot in flight and returns the fetcher to run, or queues a
    /// refetch behind the request already in flight.
    fn begin(&mut self) -> Option<Fetch> {
        if self.in_flight {
            self.refetch_queued = true;
            return None;
        }
        self.in_flight = true;
        self.entry.begin_fetch();
        self.publish();
        Some(Fetch {
            fetcher: self.fetcher.clone(),
            epoch: self.epoch,
        })
    }
}

struct Fetch {
    fetcher: Fetcher,
    epoch: u64,
}

struct Inner {
    slots: DashMap<CacheKey, Slot>,
    next_epoch: AtomicU64,
    config: StoreConfig,
}

/// Keyed cache of endpoint results with tag-based invalidation.
///
/// The store is an explicitly constructed handle; clones share state.
/// Guarantees:
///
/// - at most one request in flight per key; concurrent subscribers share it
/// - a refetch requested while a request is in flight runs after it settles
/// - results arriving for an entry nobody observes are discarded and the
///   entry is evicted
///
/// Fetches run on spawned tasks, so subscribing and invalidating must happen
/// inside a Tokio runtime.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

impl CacheStore {
    /// Creates an empty store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                next_epoch: AtomicU64::new(0),
                config,
            }),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Subscribes to the entry for `key`, creating it on first use.
    ///
    /// Fetches when the entry is new, or when it is stale and
    /// `refetch_on_mount_or_arg_change` is set, unless a request is already
    /// in flight. `provides` and `fetcher` are only used when the entry is
    /// created.
    pub fn subscribe(&self, key: CacheKey, provides: BTreeSet<Tag>, fetcher: Fetcher) -> Subscription {
        let config = self.inner.config;
        let (rx, fetch) = {
            let mut slot = self
                .inner
                .slots
                .entry(key.clone())
                .or_insert_with(|| {
                    let epoch = self.inner.next_epoch.fetch_add(1, Ordering::Relaxed);
                    Slot::new(epoch, provides, fetcher)
                });
            slot.entry.subscriber_count += 1;
            slot.generation += 1;

            let fetch = if slot
                .entry
                .needs_fetch(config.refetch_on_mount_or_arg_change, config.freshness)
                && !slot.in_flight
            {
                slot.begin()
            } else {
                None
            };
            (slot.tx.subscribe(), fetch)
        };

        debug!(%key, "Subscribed to cache entry.");
        if let Some(fetch) = fetch {
            self.spawn_fetch(key.clone(), fetch);
        }

        Subscription {
            current: rx.clone(),
            stream: WatchStream::new(rx).boxed(),
            guard: Guard {
                store: self.clone(),
                key,
            },
        }
    }

    /// Invalidates every entry carrying any of `tags`.
    ///
    /// Entries with subscribers refetch once (after any request already in
    /// flight); entries without subscribers are dropped. Returns the number
    /// of entries affected. Tags matching nothing make this a no-op.
    pub fn invalidate<I, T>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        let tags: BTreeSet<Tag> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            return 0;
        }

        let mut active = Vec::new();
        let mut unused = Vec::new();
        for slot in self.inner.slots.iter() {
            if slot.entry.tags.is_disjoint(&tags) {
                continue;
            }
            if slot.entry.subscriber_count > 0 {
                active.push(slot.key().clone());
            } else {
                unused.push(slot.key().clone());
            }
        }

        for key in &unused {
            self.inner
                .slots
                .remove_if(key, |_, slot| slot.entry.subscriber_count == 0);
        }
        for key in &active {
            self.refetch(key);
        }

        let tags: Vec<&str> = tags.iter().map(Tag::as_str).collect();
        info!(?tags, refetched = active.len(), dropped = unused.len(), "Invalidated tags.");
        active.len() + unused.len()
    }

    /// Refetches the entry for `key` if it has subscribers.
    ///
    /// Returns `false` when there is no such entry or nobody observes it.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let fetch = {
            let Some(mut slot) = self.inner.slots.get_mut(key) else {
                return false;
            };
            if slot.entry.subscriber_count == 0 {
                return false;
            }
            slot.begin()
        };
        if let Some(fetch) = fetch {
            self.spawn_fetch(key.clone(), fetch);
        }
        true
    }

    /// Refetches every entry with subscribers, if `refetch_on_reconnect` is
    /// set. Returns the number of entries refetched.
    pub fn reconnected(&self) -> usize {
        if !self.inner.config.refetch_on_reconnect {
            return 0;
        }
        let active: Vec<CacheKey> = self
            .inner
            .slots
            .iter()
            .filter(|slot| slot.entry.subscriber_count > 0)
            .map(|slot| slot.key().clone())
            .collect();
        for key in &active {
            self.refetch(key);
        }
        info!(refetched = active.len(), "Connectivity restored.");
        active.len()
    }

    /// Calls [`reconnected`](Self::reconnected) on every offline-to-online
    /// transition reported by `events`.
    pub fn listen<S>(&self, events: S) -> ListenerHandle
    where
        S: Stream<Item = Connectivity> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let store = self.clone();
        let join = tokio::spawn(async move {
            let mut events = std::pin::pin!(events);
            let mut offline = false;
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    event = events.next() => match event {
                        Some(Connectivity::Offline) => offline = true,
                        Some(Connectivity::Online) if offline => {
                            offline = false;
                            store.reconnected();
                        }
                        Some(Connectivity::Online) => {}
                        None => break,
                    },
                }
            }
        });
        ListenerHandle { token, join }
    }

    /// Returns a copy of the entry for `key`.
    #[must_use]
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.slots.get(key).map(|slot| slot.entry.clone())
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    fn spawn_fetch(&self, key: CacheKey, fetch: Fetch) {
        debug!(%key, "Fetching cache entry.");
        let store = self.clone();
        tokio::spawn(async move {
            let result = (fetch.fetcher)().await;
            store.complete(&key, fetch.epoch, result);
        });
    }

    fn complete(&self, key: &CacheKey, epoch: u64, result: Result<Value, ApiError>) {
        if self
            .inner
            .slots
            .remove_if(key, |_, slot| {
                slot.epoch == epoch && slot.entry.subscriber_count == 0
            })
            .is_some()
        {
            debug!(%key, "Discarded result for unobserved entry.");
            return;
        }

        let next = {
            let Some(mut slot) = self.inner.slots.get_mut(key) else {
                debug!(%key, "Discarded result for evicted entry.");
                return;
            };
            if slot.epoch != epoch {
                debug!(%key, "Discarded result for replaced entry.");
                return;
            }
            slot.in_flight = false;
            let provides = slot.provides.clone();
            match result {
                Ok(data) => slot.entry.fulfill(data, provides),
                Err(err) => {
                    debug!(%key, error = %err, "Fetch failed.");
                    slot.entry.reject(err, provides);
                }
            }
            slot.publish();

            if std::mem::take(&mut slot.refetch_queued) {
                slot.begin()
            } else {
                None
            }
        };

        if let Some(fetch) = next {
            self.spawn_fetch(key.clone(), fetch);
        }
    }

    fn release(&self, key: &CacheKey) {
        let (epoch, generation) = {
            let Some(mut slot) = self.inner.slots.get_mut(key) else {
                return;
            };
            slot.entry.subscriber_count = slot.entry.subscriber_count.saturating_sub(1);
            slot.generation += 1;
            if slot.entry.subscriber_count > 0 || slot.in_flight {
                return;
            }
            (slot.epoch, slot.generation)
        };

        let keep = self.inner.config.keep_unused_for;
        let handle = tokio::runtime::Handle::try_current();
        match handle {
            Ok(handle) if !keep.is_zero() => {
                let store = self.clone();
                let key = key.clone();
                handle.spawn(async move {
                    tokio::time::sleep(keep).await;
                    store.evict_if_unused(&key, epoch, generation);
                });
            }
            _ => self.evict_if_unused(key, epoch, generation),
        }
    }

    fn evict_if_unused(&self, key: &CacheKey, epoch: u64, generation: u64) {
        let evicted = self.inner.slots.remove_if(key, |_, slot| {
            slot.epoch == epoch
                && slot.generation == generation
                && slot.entry.subscriber_count == 0
                && !slot.in_flight
        });
        if evicted.is_some() {
            debug!(%key, "Evicted unused cache entry.");
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.inner.slots.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

struct Guard {
    store: CacheStore,
    key: CacheKey,
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

/// A live subscription to one cache entry.
///
/// Yields the entry's current [`Snapshot`] first, then every change.
/// Dropping it releases the subscription.
pub struct Subscription {
    current: watch::Receiver<Snapshot>,
    stream: BoxStream<'static, Snapshot>,
    guard: Guard,
}

impl Subscription {
    /// Returns the key this subscription observes.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        &self.guard.key
    }

    /// Returns the latest snapshot without waiting.
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.current.borrow().clone()
    }

    /// Waits for the next settled snapshot (`Fulfilled` or `Rejected`).
    ///
    /// Returns `None` if the entry disappears first.
    pub async fn settled(&mut self) -> Option<Snapshot> {
        while let Some(snapshot) = self.stream.next().await {
            if snapshot.is_settled() {
                return Some(snapshot);
            }
        }
        None
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.guard.key)
            .finish_non_exhaustive()
    }
}

/// Handle for a running connectivity listener.
#[derive(Debug)]
pub struct ListenerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl ListenerHandle {
    /// Cancels the listener and waits for it to finish.
    pub async fn cancel(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

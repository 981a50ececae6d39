//! The client facade.
//!
//! [`Api`] wires the layers together: an [`HttpExecutor`] (or any
//! [`Transport`]) under an [`AuthInterceptor`] that reports to a
//! [`NotificationBridge`], with a [`CacheStore`] on top, all driven by the
//! endpoints of a [`Registry`]. Every query fetch and mutation goes through
//! the same pipeline:
//!
//! ```text
//! endpoint request -> bearer auth -> transport -> (401: refresh, replay once)
//!                  -> notification -> response transform -> cache / caller
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use querykit::api::Api;
//! use querykit::auth::MemoryStorage;
//! use querykit::config::ApiConfig;
//! use querykit::endpoint::incidents;
//! use querykit::notify::ErrorMessageMap;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Clone, Deserialize)]
//! struct Incident {
//!     name: serde_json::Value,
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Api::new(
//!     ApiConfig::default(),
//!     incidents::registry()?,
//!     Arc::new(MemoryStorage::new()),
//!     ErrorMessageMap::new(),
//! )?;
//!
//! let mut list = api.query::<Vec<Incident>>(incidents::GET_INCIDENTS_LIST, &())?;
//! if let Some(result) = list.settled().await {
//!     println!("{:?}", result.data());
//! }
//! # Ok(())
//! # }
//! ```

mod mutation;
mod query;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::auth::{AuthInterceptor, AuthSession, TokenStorage};
use crate::cache::{CacheKey, CacheStore, Fetcher, Tag, fetcher};
use crate::config::ApiConfig;
use crate::endpoint::{Endpoint, Registry};
use crate::error::ApiError;
use crate::http::{HttpExecutor, Transport};
use crate::notify::{ErrorMessageMap, Notification, NotificationBridge};

pub use mutation::{Mutation, MutationResult, MutationState};
pub use query::{Query, QueryResult, QueryState};

struct Inner {
    config: ApiConfig,
    registry: Registry,
    interceptor: AuthInterceptor,
    store: CacheStore,
}

/// Entry point for issuing queries and mutations.
///
/// Explicitly constructed and cheap to clone; clones share the cache, the
/// session and the notification channel.
#[derive(Clone)]
pub struct Api {
    inner: Arc<Inner>,
}

impl Api {
    /// Creates a client talking HTTP to `config.base_url`.
    ///
    /// Fails with [`ApiError::InvalidUrl`] when the base URL cannot be parsed.
    pub fn new(
        config: ApiConfig,
        registry: Registry,
        storage: Arc<dyn TokenStorage>,
        error_map: ErrorMessageMap,
    ) -> Result<Self, ApiError> {
        let executor = HttpExecutor::new(&config.base_url, config.request_timeout)?;
        Ok(Self::with_transport(
            config,
            registry,
            Arc::new(executor),
            AuthSession::new(storage),
            error_map,
        ))
    }

    /// Creates a client over an arbitrary transport and session.
    pub fn with_transport(
        config: ApiConfig,
        registry: Registry,
        transport: Arc<dyn Transport>,
        session: AuthSession,
        error_map: ErrorMessageMap,
    ) -> Self {
        let bridge = NotificationBridge::new(error_map);
        let interceptor =
            AuthInterceptor::new(transport, session, bridge, config.refresh_path.clone());
        let store = CacheStore::with_config(config.store);
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                interceptor,
                store,
            }),
        }
    }

    /// Subscribes to the query endpoint `name` called with `args`.
    ///
    /// Subscribers with equal `name` and `args` share one cache entry and
    /// one in-flight request.
    pub fn query<T>(&self, name: &str, args: &impl Serialize) -> Result<Query<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let endpoint = self.inner.registry.query(name)?;
        let args = serde_json::to_value(args).map_err(|err| ApiError::Decode(err.to_string()))?;
        let key = CacheKey::new(name, &args)?;
        let provides = endpoint.provided_tags().clone();
        let fetcher = self.fetcher_for(endpoint.clone(), args);
        Ok(Query::new(self.inner.store.subscribe(key, provides, fetcher)))
    }

    /// Returns a handle for the mutation endpoint `name`.
    pub fn mutation<T>(&self, name: &str) -> Result<Mutation<T>, ApiError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let endpoint = self.inner.registry.mutation(name)?;
        Ok(Mutation::new(
            endpoint.clone(),
            self.inner.interceptor.clone(),
            self.inner.store.clone(),
        ))
    }

    /// Refetches the query `name` with `args` if anyone observes it.
    pub fn refetch(&self, name: &str, args: &impl Serialize) -> Result<bool, ApiError> {
        self.inner.registry.query(name)?;
        let key = CacheKey::new(name, args)?;
        Ok(self.inner.store.refetch(&key))
    }

    /// Invalidates cached entries carrying any of `tags`.
    pub fn invalidate<I, T>(&self, tags: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.inner.store.invalidate(tags)
    }

    /// Subscribes to user-facing notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.interceptor.bridge().subscribe()
    }

    /// Returns the auth session.
    #[must_use]
    pub fn session(&self) -> &AuthSession {
        self.inner.interceptor.session()
    }

    /// Returns the cache store.
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    /// Returns the endpoint registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    fn fetcher_for(&self, endpoint: Endpoint, args: Value) -> Fetcher {
        let interceptor = self.inner.interceptor.clone();
        let endpoint = Arc::new(endpoint);
        fetcher(move || {
            let interceptor = interceptor.clone();
            let endpoint = endpoint.clone();
            let request = endpoint.build_request(&args);
            async move {
                debug!(endpoint = endpoint.name(), url = %request.url, "Running query.");
                let response = interceptor.execute(&request, endpoint.options()).await?;
                Ok(endpoint.apply_transform(response.body))
            }
        })
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("base_url", &self.inner.config.base_url)
            .field("endpoints", &self.inner.registry.len())
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

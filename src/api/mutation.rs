use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;

use crate::auth::AuthInterceptor;
use crate::cache::CacheStore;
use crate::endpoint::Endpoint;
use crate::error::ApiError;

/// The state of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
    /// Mutation is idle (not yet started).
    Idle,
    /// Mutation is in progress.
    Loading,
    /// Mutation succeeded with a result.
    Success(T),
    /// Mutation failed with an error.
    Error(ApiError),
}

/// A mutation result containing the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult<T> {
    /// The current state of the mutation.
    pub state: MutationState<T>,
}

impl<T> MutationResult<T> {
    const fn idle() -> Self {
        Self {
            state: MutationState::Idle,
        }
    }

    /// Returns the result data if the mutation succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    /// Returns `true` if the mutation has not run since creation or reset.
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, MutationState::Idle)
    }

    /// Returns `true` if the mutation is currently loading.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, MutationState::Loading)
    }

    /// Returns `true` if the mutation succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }

    /// Returns `true` if the mutation failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, MutationState::Error(_))
    }
}

/// A handle for triggering one mutation endpoint.
///
/// Each [`trigger`](Self::trigger) sends the request through the auth
/// interceptor, applies the endpoint's response transformation and, on
/// success, invalidates the tags the endpoint declares. The latest outcome
/// is also published on a watch channel.
pub struct Mutation<T> {
    endpoint: Endpoint,
    interceptor: AuthInterceptor,
    store: CacheStore,
    state: watch::Sender<MutationResult<T>>,
}

impl<T> Mutation<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(crate) fn new(endpoint: Endpoint, interceptor: AuthInterceptor, store: CacheStore) -> Self {
        let (state, _) = watch::channel(MutationResult::idle());
        Self {
            endpoint,
            interceptor,
            store,
            state,
        }
    }

    /// Returns the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.endpoint.name()
    }

    /// Runs the mutation with `args`.
    ///
    /// Tags are invalidated as soon as the server accepts the request, even
    /// if the body then fails to decode into `T`.
    pub async fn trigger(&self, args: &impl Serialize) -> Result<T, ApiError> {
        self.state.send_replace(MutationResult {
            state: MutationState::Loading,
        });
        let result = self.run(args).await;
        let state = match &result {
            Ok(data) => MutationState::Success(data.clone()),
            Err(err) => MutationState::Error(err.clone()),
        };
        self.state.send_replace(MutationResult { state });
        result
    }

    async fn run(&self, args: &impl Serialize) -> Result<T, ApiError> {
        let args = serde_json::to_value(args).map_err(|err| ApiError::Decode(err.to_string()))?;
        let request = self.endpoint.build_request(&args);
        let response = self
            .interceptor
            .execute(&request, self.endpoint.options())
            .await?;
        let body = self.endpoint.apply_transform(response.body);

        let tags = self.endpoint.invalidated_tags();
        if !tags.is_empty() {
            debug!(endpoint = self.endpoint.name(), "Mutation succeeded, invalidating tags.");
            self.store.invalidate(tags.iter().cloned());
        }

        serde_json::from_value(body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// Returns the latest outcome.
    #[must_use]
    pub fn state(&self) -> MutationResult<T> {
        self.state.borrow().clone()
    }

    /// Watches outcome changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<MutationResult<T>> {
        self.state.subscribe()
    }

    /// Returns the state to [`MutationState::Idle`].
    pub fn reset(&self) {
        self.state.send_replace(MutationResult::idle());
    }
}

impl<T> fmt::Debug for Mutation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("endpoint", &self.endpoint.name())
            .finish_non_exhaustive()
    }
}

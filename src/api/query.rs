use std::fmt;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::cache::{CacheKey, EntryStatus, Snapshot, Subscription};
use crate::error::ApiError;

/// The state of a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// The entry exists but has never been fetched.
    Uninitialized,
    /// First fetch in progress, no data yet.
    Loading,
    /// Query succeeded with data.
    Success {
        /// The data returned by the query.
        data: T,
        /// Whether a newer result is being fetched.
        is_stale: bool,
    },
    /// The last fetch failed.
    Error(ApiError),
}

/// A query result containing the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    /// The current state of the query.
    pub state: QueryState<T>,
    /// Whether a request for this query is in flight.
    pub is_fetching: bool,
}

impl<T> QueryResult<T> {
    /// Returns the data if the query succeeded, otherwise `None`.
    pub const fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Success { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the error if the last fetch failed.
    pub const fn error(&self) -> Option<&ApiError> {
        match &self.state {
            QueryState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if the query is loading for the first time.
    pub const fn is_loading(&self) -> bool {
        matches!(self.state, QueryState::Loading)
    }

    /// Returns `true` if the query succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.state, QueryState::Success { .. })
    }

    /// Returns `true` if the query failed.
    pub const fn is_error(&self) -> bool {
        matches!(self.state, QueryState::Error(_))
    }

    /// Returns `true` if the query data is stale.
    pub const fn is_stale(&self) -> bool {
        matches!(self.state, QueryState::Success { is_stale: true, .. })
    }
}

impl<T: DeserializeOwned> QueryResult<T> {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let is_fetching = snapshot.is_pending();
        let state = match (snapshot.status, snapshot.data, snapshot.error) {
            (EntryStatus::Uninitialized, ..) => QueryState::Uninitialized,
            (EntryStatus::Rejected, _, Some(err)) => QueryState::Error(err),
            (EntryStatus::Pending, None, _) => QueryState::Loading,
            (status, Some(data), _) => match serde_json::from_value(data) {
                Ok(data) => QueryState::Success {
                    data,
                    is_stale: status == EntryStatus::Pending,
                },
                Err(err) => QueryState::Error(ApiError::Decode(err.to_string())),
            },
            // settled without data or error; the store never produces this
            (_, None, _) => QueryState::Uninitialized,
        };
        Self { state, is_fetching }
    }
}

/// A live, typed subscription to one query.
///
/// Yields the current [`QueryResult`] first, then one per change of the
/// underlying cache entry. While it is alive the entry is never evicted and
/// refetches when one of its tags is invalidated. Dropping it releases the
/// entry.
///
/// Data is decoded from JSON into `T` on every emission; a body that does not
/// fit `T` surfaces as [`ApiError::Decode`].
pub struct Query<T> {
    subscription: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Query<T> {
    pub(crate) const fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            _marker: PhantomData,
        }
    }

    /// Returns the cache key this query observes.
    #[must_use]
    pub const fn key(&self) -> &CacheKey {
        self.subscription.key()
    }

    /// Returns the latest result without waiting.
    #[must_use]
    pub fn current(&self) -> QueryResult<T> {
        QueryResult::from_snapshot(self.subscription.current())
    }

    /// Waits for the next settled result (success or error).
    ///
    /// Returns `None` if the entry disappears first.
    pub async fn settled(&mut self) -> Option<QueryResult<T>> {
        self.subscription
            .settled()
            .await
            .map(QueryResult::from_snapshot)
    }
}

impl<T: DeserializeOwned> Stream for Query<T> {
    type Item = QueryResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.subscription
            .poll_next_unpin(cx)
            .map(|snapshot| snapshot.map(QueryResult::from_snapshot))
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", self.subscription.key())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(
        status: EntryStatus,
        data: Option<serde_json::Value>,
        error: Option<ApiError>,
    ) -> Snapshot {
        Snapshot {
            status,
            data,
            error,
        }
    }

    #[test]
    fn test_query_result_predicates() {
        let loading: QueryResult<i32> = QueryResult {
            state: QueryState::Loading,
            is_fetching: true,
        };
        assert!(loading.is_loading());
        assert!(!loading.is_success());
        assert!(!loading.is_error());
        assert!(!loading.is_stale());

        let success = QueryResult {
            state: QueryState::Success {
                data: 42,
                is_stale: false,
            },
            is_fetching: false,
        };
        assert!(success.is_success());
        assert_eq!(success.data(), Some(&42));
        assert!(!success.is_stale());

        let failed: QueryResult<i32> = QueryResult {
            state: QueryState::Error(ApiError::Timeout),
            is_fetching: false,
        };
        assert!(failed.is_error());
        assert_eq!(failed.error(), Some(&ApiError::Timeout));
        assert_eq!(failed.data(), None);
    }

    #[test]
    fn test_from_snapshot() {
        let result: QueryResult<Vec<i32>> =
            QueryResult::from_snapshot(snapshot(EntryStatus::Uninitialized, None, None));
        assert_eq!(result.state, QueryState::Uninitialized);

        let result: QueryResult<Vec<i32>> =
            QueryResult::from_snapshot(snapshot(EntryStatus::Pending, None, None));
        assert!(result.is_loading());
        assert!(result.is_fetching);

        let result: QueryResult<Vec<i32>> =
            QueryResult::from_snapshot(snapshot(EntryStatus::Fulfilled, Some(json!([1, 2])), None));
        assert_eq!(result.data(), Some(&vec![1, 2]));
        assert!(!result.is_stale());
    }

    #[test]
    fn test_refetch_keeps_previous_data_as_stale() {
        let result: QueryResult<Vec<i32>> =
            QueryResult::from_snapshot(snapshot(EntryStatus::Pending, Some(json!([1])), None));
        assert!(result.is_stale());
        assert!(result.is_fetching);
        assert_eq!(result.data(), Some(&vec![1]));
    }

    #[test]
    fn test_error_and_decode_failure() {
        let result: QueryResult<Vec<i32>> = QueryResult::from_snapshot(snapshot(
            EntryStatus::Rejected,
            Some(json!([1])),
            Some(ApiError::Timeout),
        ));
        assert_eq!(result.error(), Some(&ApiError::Timeout));

        let result: QueryResult<Vec<i32>> =
            QueryResult::from_snapshot(snapshot(EntryStatus::Fulfilled, Some(json!("nope")), None));
        assert!(matches!(result.error(), Some(ApiError::Decode(_))));
    }
}

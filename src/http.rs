//! Request execution.
//!
//! A [`Transport`] carries one [`RequestDescriptor`] to the server and returns
//! a normalized [`RawResponse`] or [`ApiError`](crate::ApiError). Non-2xx
//! statuses become `ApiError::Http` with the status and body preserved.
//! Nothing at this layer retries.
//!
//! - [`HttpExecutor`]: the `reqwest`-backed transport used in production
//! - [`mock::MockTransport`]: a scripted transport for tests

mod executor;
pub mod mock;
mod request;

pub use executor::{HttpExecutor, Transport};
pub use request::{Method, RawResponse, RequestDescriptor};

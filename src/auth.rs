//! Bearer authentication with a bounded refresh-and-replay.
//!
//! The [`AuthInterceptor`] sits between the cache and the transport. On a
//! `401` it refreshes the token pair once through `POST auth/refresh` and
//! replays the original request once; if that is impossible the
//! [`AuthSession`] is invalidated and the original `401` is returned.
//!
//! Tokens are read and written through an injected [`TokenStorage`].

mod interceptor;
mod session;
mod storage;

pub use interceptor::{AuthInterceptor, DEFAULT_REFRESH_PATH};
pub use session::AuthSession;
pub use storage::{ACCESS_TOKEN, MemoryStorage, REFRESH_TOKEN, TokenStorage};

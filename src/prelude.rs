//! Prelude module for convenient imports.
//!
//! ```
//! use querykit::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Api`] - The client facade
//! - [`Query`], [`Mutation`] and their results - Typed handles for endpoints
//! - [`Endpoint`], [`Registry`] - Endpoint declarations
//! - [`ApiConfig`], [`StoreConfig`] - Configuration
//! - [`ExtraOptions`], [`ErrorMessageMap`] - Notification policy
//! - [`ApiError`], [`ConfigError`] - Errors

pub use crate::api::{Api, Mutation, MutationResult, MutationState, Query, QueryResult, QueryState};
pub use crate::auth::{AuthSession, MemoryStorage, TokenStorage};
pub use crate::cache::StoreConfig;
pub use crate::config::ApiConfig;
pub use crate::endpoint::{Endpoint, Registry};
pub use crate::error::{ApiError, ConfigError};
pub use crate::http::{Method, RequestDescriptor};
pub use crate::notify::{ErrorMessageMap, ExtraOptions, Notification, NotifierType};

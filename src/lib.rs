//! # Querykit - declarative data fetching with a tag-aware cache
//!
//! Querykit is the data layer of a single-page console: endpoints are
//! declared once, results are cached and shared between every consumer of
//! the same endpoint and arguments, and mutations keep the cache coherent by
//! invalidating tags.
//!
//! ## Architecture
//!
//! Requests flow through four layers, leaves first:
//!
//! 1. **Request Executor** ([`http`]): one HTTP request, normalized response
//! 2. **Auth Interceptor** ([`auth`]): bearer token, one refresh and one replay on `401`
//! 3. **Notification Bridge** ([`notify`]): turns outcomes into user notifications
//! 4. **Cache Store** ([`cache`]): keyed entries, tags, request coalescing, eviction
//!
//! The [`endpoint`] registry declares what can be fetched and validates the
//! tag graph at startup. The [`api::Api`] facade ties everything together.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use querykit::prelude::*;
//! use serde_json::Value;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::builder()
//!     .tag_types(["Incidents"])
//!     .endpoint(
//!         Endpoint::query("listIncidents", |_| RequestDescriptor::get("incidents"))
//!             .provides_tags(["Incidents"]),
//!     )
//!     .endpoint(
//!         Endpoint::mutation("closeIncident", |args| {
//!             RequestDescriptor::post(format!("incidents/{}/close", args["id"]), Value::Null)
//!         })
//!         .invalidates_tags(["Incidents"])
//!         .extra_options(ExtraOptions::notifier().with_success("Incident closed")),
//!     )
//!     .build()?;
//!
//! let api = Api::new(
//!     ApiConfig::new("https://console.example.com/api/"),
//!     registry,
//!     Arc::new(MemoryStorage::new()),
//!     ErrorMessageMap::new(),
//! )?;
//!
//! let mut incidents = api.query::<Vec<Value>>("listIncidents", &())?;
//! incidents.settled().await;
//!
//! // refetches `incidents` once the server accepts the change
//! api.mutation::<Value>("closeIncident")?
//!     .trigger(&serde_json::json!({ "id": 7 }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod notify;
pub mod prelude;

pub use error::{ApiError, ConfigError};

//! Endpoint definitions and their registry.
//!
//! An [`Endpoint`] describes how to turn JSON arguments into a request, which
//! cache tags its results carry (queries) or invalidate (mutations), an
//! optional response transformation and its notification policy. A
//! [`Registry`] validates a whole set of them once, at startup:
//!
//! ```
//! use querykit::endpoint::{Endpoint, Registry};
//! use querykit::http::RequestDescriptor;
//! use querykit::ConfigError;
//!
//! let result = Registry::builder()
//!     .endpoint(
//!         Endpoint::mutation("closeIncident", |_| RequestDescriptor::default())
//!             .invalidates_tags(["Incident"]),
//!     )
//!     .build();
//!
//! assert!(matches!(result, Err(ConfigError::DanglingTag { .. })));
//! ```

mod definition;
pub mod incidents;
mod registry;

pub use definition::{Endpoint, EndpointKind};
pub use registry::{Registry, RegistryBuilder};

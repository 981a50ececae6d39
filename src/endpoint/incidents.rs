//! Incident endpoints of the console.

use serde_json::Value;

use crate::error::ConfigError;
use crate::http::{Method, RequestDescriptor};

use super::definition::Endpoint;
use super::registry::Registry;

/// Tag carried by the incident list.
pub const INCIDENTS_LIST_TAG: &str = "GetIncidentsList";

/// Query name of the incident list.
pub const GET_INCIDENTS_LIST: &str = "getIncidentsList";

/// Mutation name of the status update.
pub const UPDATE_INCIDENT_STATUS: &str = "updateIncidentStatus";

/// Returns the incident endpoints, ready to be injected into a registry.
#[must_use]
pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::query(GET_INCIDENTS_LIST, |_| {
            RequestDescriptor::get("/all?fields=name")
        })
        .provides_tags([INCIDENTS_LIST_TAG]),
        // args: {"id": .., "status": ..}
        Endpoint::mutation(UPDATE_INCIDENT_STATUS, |args| {
            let id = match &args["id"] {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            };
            RequestDescriptor::new(Method::Patch, format!("incidents/{id}"))
                .with_body(serde_json::json!({ "status": args["status"] }))
        })
        .invalidates_tags([INCIDENTS_LIST_TAG]),
    ]
}

/// Builds a registry holding only the incident endpoints.
pub fn registry() -> Result<Registry, ConfigError> {
    Registry::builder()
        .tag_types([INCIDENTS_LIST_TAG])
        .inject(endpoints(), false)
        .build()
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::cache::Tag;
use crate::error::ConfigError;

use super::definition::{Endpoint, EndpointKind};

/// Collects endpoint definitions and validates them into a [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tag_types: BTreeSet<Tag>,
    endpoints: Vec<Endpoint>,
    duplicates: Vec<String>,
}

impl RegistryBuilder {
    /// Declares the tag vocabulary. Once any tag type is declared, every tag
    /// an endpoint uses must be one of them.
    #[must_use]
    pub fn tag_types<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.tag_types.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds one endpoint.
    #[must_use]
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.push(endpoint, false);
        self
    }

    /// Adds several endpoints.
    #[must_use]
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = Endpoint>) -> Self {
        for endpoint in endpoints {
            self.push(endpoint, false);
        }
        self
    }

    /// Injects a group of endpoints defined elsewhere.
    ///
    /// With `override_existing`, an injected endpoint replaces an earlier one
    /// of the same name instead of being reported as a duplicate.
    #[must_use]
    pub fn inject(
        mut self,
        group: impl IntoIterator<Item = Endpoint>,
        override_existing: bool,
    ) -> Self {
        for endpoint in group {
            self.push(endpoint, override_existing);
        }
        self
    }

    fn push(&mut self, endpoint: Endpoint, replace: bool) {
        match self
            .endpoints
            .iter()
            .position(|existing| existing.name() == endpoint.name())
        {
            Some(index) if replace => {
                debug!(endpoint = endpoint.name(), "Overriding endpoint.");
                self.endpoints[index] = endpoint;
            }
            Some(_) => self.duplicates.push(endpoint.name().to_string()),
            None => self.endpoints.push(endpoint),
        }
    }

    /// Validates the definitions and builds the registry.
    ///
    /// Checks, in order: duplicate names, tags used in the wrong role
    /// (a query invalidating or a mutation providing), tags missing from the
    /// declared tag types, and invalidation tags no query provides.
    pub fn build(self) -> Result<Registry, ConfigError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(ConfigError::DuplicateEndpoint(name));
        }

        for endpoint in &self.endpoints {
            let misplaced = match endpoint.kind() {
                EndpointKind::Query => {
                    (!endpoint.invalidated_tags().is_empty()).then_some("invalidate")
                }
                EndpointKind::Mutation => {
                    (!endpoint.provided_tags().is_empty()).then_some("provide")
                }
            };
            if let Some(role) = misplaced {
                return Err(ConfigError::TagRole {
                    endpoint: endpoint.name().to_string(),
                    kind: endpoint.kind().as_str(),
                    role,
                });
            }
        }

        if !self.tag_types.is_empty() {
            for endpoint in &self.endpoints {
                let used = endpoint.provided_tags().iter().chain(endpoint.invalidated_tags());
                for tag in used {
                    if !self.tag_types.contains(tag) {
                        return Err(ConfigError::UndeclaredTag {
                            endpoint: endpoint.name().to_string(),
                            tag: tag.to_string(),
                        });
                    }
                }
            }
        }

        let provided: BTreeSet<&Tag> = self
            .endpoints
            .iter()
            .flat_map(|endpoint| endpoint.provided_tags())
            .collect();
        for endpoint in &self.endpoints {
            if let Some(tag) = endpoint
                .invalidated_tags()
                .iter()
                .find(|tag| !provided.contains(tag))
            {
                return Err(ConfigError::DanglingTag {
                    endpoint: endpoint.name().to_string(),
                    tag: tag.to_string(),
                });
            }
        }

        debug!(endpoints = self.endpoints.len(), "Endpoint registry built.");
        let endpoints = self
            .endpoints
            .into_iter()
            .map(|endpoint| (endpoint.name().to_string(), endpoint))
            .collect();
        Ok(Registry {
            endpoints: Arc::new(endpoints),
            tag_types: Arc::new(self.tag_types),
        })
    }
}

/// Validated, immutable set of endpoint definitions.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct Registry {
    endpoints: Arc<HashMap<String, Endpoint>>,
    tag_types: Arc<BTreeSet<Tag>>,
}

impl Registry {
    /// Starts a new registry definition.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Looks up `name`, requiring it to be of `kind`.
    pub fn get(&self, name: &str, kind: EndpointKind) -> Result<&Endpoint, ConfigError> {
        let endpoint = self
            .endpoints
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))?;
        if endpoint.kind() != kind {
            return Err(ConfigError::KindMismatch {
                name: name.to_string(),
                expected: kind.as_str(),
                actual: endpoint.kind().as_str(),
            });
        }
        Ok(endpoint)
    }

    /// Looks up a query endpoint.
    pub fn query(&self, name: &str) -> Result<&Endpoint, ConfigError> {
        self.get(name, EndpointKind::Query)
    }

    /// Looks up a mutation endpoint.
    pub fn mutation(&self, name: &str) -> Result<&Endpoint, ConfigError> {
        self.get(name, EndpointKind::Mutation)
    }

    /// Returns the declared tag types.
    #[must_use]
    pub fn tag_types(&self) -> &BTreeSet<Tag> {
        &self.tag_types
    }

    /// Iterates over registered endpoint names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Returns the number of endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if no endpoint is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::Tag;
use crate::http::RequestDescriptor;
use crate::notify::ExtraOptions;

/// Whether an endpoint reads (query) or writes (mutation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// Cached, subscribed to, refetched on invalidation.
    Query,
    /// Triggered on demand, invalidates tags on success.
    Mutation,
}

impl EndpointKind {
    /// Returns the lowercase kind name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type RequestFn = Arc<dyn Fn(&Value) -> RequestDescriptor + Send + Sync>;
type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Declarative definition of one query or mutation.
///
/// Built with [`Endpoint::query`] or [`Endpoint::mutation`] and the chained
/// setters, then registered in a [`Registry`](super::Registry). Immutable
/// once registered.
///
/// # Example
///
/// ```
/// use querykit::endpoint::Endpoint;
/// use querykit::http::RequestDescriptor;
/// use querykit::notify::ExtraOptions;
///
/// let incidents = Endpoint::query("getIncidentsList", |_| RequestDescriptor::get("/all?fields=name"))
///     .provides_tags(["GetIncidentsList"])
///     .extra_options(ExtraOptions::notifier().with_failure("Failed to load incidents"));
///
/// assert_eq!(incidents.name(), "getIncidentsList");
/// ```
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    kind: EndpointKind,
    request: RequestFn,
    provides: BTreeSet<Tag>,
    invalidates: BTreeSet<Tag>,
    transform: TransformFn,
    options: ExtraOptions,
}

impl Endpoint {
    fn new(
        name: impl Into<String>,
        kind: EndpointKind,
        request: impl Fn(&Value) -> RequestDescriptor + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            request: Arc::new(request),
            provides: BTreeSet::new(),
            invalidates: BTreeSet::new(),
            transform: Arc::new(|value| value),
            options: ExtraOptions::default(),
        }
    }

    /// Defines a query. `request` maps the JSON arguments to a request.
    pub fn query(
        name: impl Into<String>,
        request: impl Fn(&Value) -> RequestDescriptor + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, EndpointKind::Query, request)
    }

    /// Defines a mutation. `request` maps the JSON arguments to a request.
    pub fn mutation(
        name: impl Into<String>,
        request: impl Fn(&Value) -> RequestDescriptor + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, EndpointKind::Mutation, request)
    }

    /// Adds tags this query's results carry.
    #[must_use]
    pub fn provides_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.provides.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds tags this mutation invalidates on success.
    #[must_use]
    pub fn invalidates_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Tag>,
    {
        self.invalidates.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets a pure transformation applied to every successful response body.
    #[must_use]
    pub fn transform_response(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// Sets the notification policy.
    #[must_use]
    pub fn extra_options(mut self, options: ExtraOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the endpoint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the endpoint kind.
    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Returns the tags this endpoint provides.
    #[must_use]
    pub const fn provided_tags(&self) -> &BTreeSet<Tag> {
        &self.provides
    }

    /// Returns the tags this endpoint invalidates.
    #[must_use]
    pub const fn invalidated_tags(&self) -> &BTreeSet<Tag> {
        &self.invalidates
    }

    /// Returns the notification policy.
    #[must_use]
    pub const fn options(&self) -> &ExtraOptions {
        &self.options
    }

    /// Builds the request for `args`.
    #[must_use]
    pub fn build_request(&self, args: &Value) -> RequestDescriptor {
        (self.request)(args)
    }

    /// Applies the response transformation.
    #[must_use]
    pub fn apply_transform(&self, body: Value) -> Value {
        (self.transform)(body)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("provides", &self.provides)
            .field("invalidates", &self.invalidates)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

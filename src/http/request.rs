use std::fmt;

use serde_json::Value;

/// HTTP method of a [`RequestDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// `GET`
    #[default]
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
            Method::Put => Self::PUT,
            Method::Patch => Self::PATCH,
            Method::Delete => Self::DELETE,
        }
    }
}

/// A single request, produced per call and never persisted.
///
/// `url` may be absolute or relative to the executor's base URL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDescriptor {
    /// Target URL, usually relative to the base URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Optional JSON body.
    pub body: Option<Value>,
    /// Extra request headers, in insertion order.
    pub headers: Vec<(String, String)>,
}

impl RequestDescriptor {
    /// Creates a descriptor for the given method and URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    /// Creates a `GET` descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a `POST` descriptor with a JSON body.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a header, replacing any previous value with the same
    /// (case-insensitive) name.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a header in place.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Returns the value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        Self::get(url)
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        Self::get(url)
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// Status code.
    pub status: u16,
    /// Body parsed as JSON; plain text becomes a JSON string, empty becomes `null`.
    pub body: Value,
}

impl RawResponse {
    /// Creates a `200 OK` response with the given body.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

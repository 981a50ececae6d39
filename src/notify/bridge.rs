use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ApiError;

/// Visual category of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierType {
    /// Green, operation succeeded.
    Success,
    /// Red, operation failed.
    Error,
    /// Amber.
    Warning,
    /// Neutral.
    Info,
}

impl fmt::Display for NotifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// Per-endpoint notification policy.
///
/// Deserializes from the camelCase shape the console uses, e.g.
/// `{"showNotifier": true, "failure": "Failed to load"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtraOptions {
    /// Master switch; nothing is emitted when `false`.
    pub show_notifier: bool,
    /// Message shown when the call succeeds.
    pub success: Option<String>,
    /// Message shown when the call fails.
    pub failure: Option<String>,
    /// Always show `failure` verbatim, ignoring what the error body says.
    pub show_custom_message: bool,
    /// Overrides [`NotifierType::Success`].
    pub success_notifier_type: Option<NotifierType>,
    /// Overrides [`NotifierType::Error`].
    pub failure_notifier_type: Option<NotifierType>,
}

impl ExtraOptions {
    /// Options with the notifier switched on and no messages yet.
    #[must_use]
    pub fn notifier() -> Self {
        Self {
            show_notifier: true,
            ..Self::default()
        }
    }

    /// Sets the success message.
    #[must_use]
    pub fn with_success(mut self, message: impl Into<String>) -> Self {
        self.success = Some(message.into());
        self
    }

    /// Sets the failure message.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Shows the failure message verbatim.
    #[must_use]
    pub const fn with_custom_message(mut self) -> Self {
        self.show_custom_message = true;
        self
    }
}

/// Maps machine-readable error codes from the server to display strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMessageMap(HashMap<String, String>);

impl ErrorMessageMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.0.insert(code.into(), message.into());
    }

    /// Looks up the message for a code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<&str> {
        self.0.get(code).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ErrorMessageMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A user-facing message emitted for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Text to display.
    pub message: String,
    /// Visual category.
    #[serde(rename = "type")]
    pub kind: NotifierType,
}

/// Shown for failures that never reached the server, when the endpoint has
/// no failure text of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";

/// Decides which notification, if any, a request outcome produces.
///
/// Pure: the result is only read. On failure the message starts as
/// `options.failure`; unless `show_custom_message` is set, a server error
/// code found in `map` replaces it, or failing that the server's `details`
/// joined with `,`. Fields of `{error: {message, details}}` that do not
/// have the expected shape are ignored one by one. Client-side failures
/// (bad URL, undecodable body) without a `failure` text fall back to
/// [`GENERIC_ERROR_MESSAGE`].
pub fn notify<T>(
    result: &Result<T, ApiError>,
    options: &ExtraOptions,
    map: &ErrorMessageMap,
) -> Option<Notification> {
    if !options.show_notifier {
        return None;
    }
    match result {
        Err(error) => {
            let failure = match (&options.failure, error) {
                (Some(failure), _) => failure,
                (None, ApiError::Decode(_) | ApiError::InvalidUrl(_)) => {
                    return Some(Notification {
                        message: GENERIC_ERROR_MESSAGE.to_string(),
                        kind: options.failure_notifier_type.unwrap_or(NotifierType::Error),
                    });
                }
                (None, _) => return None,
            };
            let message = if options.show_custom_message {
                failure.clone()
            } else {
                error
                    .body()
                    .and_then(|body| server_message(body, map))
                    .unwrap_or_else(|| failure.clone())
            };
            Some(Notification {
                message,
                kind: options.failure_notifier_type.unwrap_or(NotifierType::Error),
            })
        }
        Ok(_) => options.success.as_ref().map(|success| Notification {
            message: success.clone(),
            kind: options.success_notifier_type.unwrap_or(NotifierType::Success),
        }),
    }
}

fn server_message(body: &Value, map: &ErrorMessageMap) -> Option<String> {
    let error = body.get("error")?;
    let code = match error.get("message") {
        Some(Value::String(code)) => Some(code.clone()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => None,
    };
    if let Some(mapped) = code.as_deref().and_then(|code| map.get(code)) {
        return Some(mapped.to_string());
    }

    let details = error.get("details")?.as_array()?;
    if details.is_empty() {
        return None;
    }
    details
        .iter()
        .map(|detail| detail.as_str())
        .collect::<Option<Vec<_>>>()
        .map(|details| details.join(","))
}

/// Applies [`notify`] to every request outcome and broadcasts the result.
#[derive(Debug, Clone)]
pub struct NotificationBridge {
    map: ErrorMessageMap,
    sender: broadcast::Sender<Notification>,
}

impl NotificationBridge {
    /// Creates a bridge that resolves server error codes through `map`.
    #[must_use]
    pub fn new(map: ErrorMessageMap) -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { map, sender }
    }

    /// Emits the notification for `result`, if any, and returns it.
    ///
    /// Having no listeners is not an error.
    pub fn observe<T>(
        &self,
        result: &Result<T, ApiError>,
        options: &ExtraOptions,
    ) -> Option<Notification> {
        let notification = notify(result, options, &self.map)?;
        debug!(kind = %notification.kind, message = %notification.message, "Emitting notification.");
        let _ = self.sender.send(notification.clone());
        Some(notification)
    }

    /// Subscribes to emitted notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

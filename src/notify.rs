//! User-facing notifications for request outcomes.
//!
//! Every request carries an [`ExtraOptions`] policy. After the request
//! settles, the [`NotificationBridge`] turns the outcome and the policy into
//! at most one [`Notification`] without touching the result itself. The
//! [`NotificationCenter`] keeps the list the console renders.
//!
//! # Example
//!
//! ```
//! use querykit::ApiError;
//! use querykit::notify::{ErrorMessageMap, ExtraOptions, notify};
//! use serde_json::json;
//!
//! let map: ErrorMessageMap = [("ERR_X", "Quota exceeded")].into_iter().collect();
//! let options = ExtraOptions::notifier().with_failure("Failed to load");
//! let result: Result<(), ApiError> = Err(ApiError::Http {
//!     status: 429,
//!     body: json!({"error": {"message": "ERR_X"}}),
//! });
//!
//! let notification = notify(&result, &options, &map).unwrap();
//! assert_eq!(notification.message, "Quota exceeded");
//! ```

mod bridge;
mod center;

pub use bridge::{
    ErrorMessageMap, ExtraOptions, GENERIC_ERROR_MESSAGE, Notification, NotificationBridge,
    NotifierType, notify,
};
pub use center::{JOB_NOTIFIER, Notice, NoticePatch, NotificationCenter};

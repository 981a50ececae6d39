use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use super::bridge::{Notification, NotifierType};

/// Reserved id of the long-running job notification.
///
/// At most one notice with this id exists, and it always sorts last.
pub const JOB_NOTIFIER: &str = "JOB_NOTIFIER";

/// A notification currently on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Identifier used by `update` and `hide`.
    pub id: String,
    /// Text to display.
    pub message: String,
    /// Visual category.
    pub kind: NotifierType,
    /// Keeps the notice visible until it is hidden explicitly.
    pub auto_hide_disabled: bool,
}

/// Fields to change on an existing [`Notice`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticePatch {
    /// New text.
    pub message: Option<String>,
    /// New category.
    pub kind: Option<NotifierType>,
    /// New auto-hide setting.
    pub auto_hide_disabled: Option<bool>,
}

#[derive(Debug, Default)]
struct Inner {
    notices: Mutex<Vec<Notice>>,
    next_id: AtomicU64,
}

/// The ordered list of notices the console displays.
///
/// Cloning shares the list.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl NotificationCenter {
    /// Creates an empty center.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a notification and returns its id.
    pub fn show(&self, notification: Notification) -> String {
        let id = format!("notice-{}", self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.show_notice(Notice {
            id: id.clone(),
            message: notification.message,
            kind: notification.kind,
            auto_hide_disabled: false,
        });
        id
    }

    /// Shows a fully specified notice.
    ///
    /// A notice with [`JOB_NOTIFIER`] as id replaces the previous job
    /// notice; any other notice is inserted before the job notice.
    pub fn show_notice(&self, notice: Notice) {
        let mut notices = self.lock();
        let job = notices
            .iter()
            .position(|n| n.id == JOB_NOTIFIER)
            .map(|index| notices.remove(index));

        let replaces_job = notice.id == JOB_NOTIFIER;
        notices.push(notice);
        if !replaces_job {
            notices.extend(job);
        }
    }

    /// Applies `patch` to the notice with `id`. Returns `false` if absent.
    pub fn update(&self, id: &str, patch: NoticePatch) -> bool {
        let mut notices = self.lock();
        let Some(notice) = notices.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if let Some(message) = patch.message {
            notice.message = message;
        }
        if let Some(kind) = patch.kind {
            notice.kind = kind;
        }
        if let Some(auto_hide_disabled) = patch.auto_hide_disabled {
            notice.auto_hide_disabled = auto_hide_disabled;
        }
        true
    }

    /// Removes the notice with `id`. Returns `false` if absent.
    pub fn hide(&self, id: &str) -> bool {
        let mut notices = self.lock();
        let before = notices.len();
        notices.retain(|n| n.id != id);
        notices.len() != before
    }

    /// Returns the notices in display order.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.lock().clone()
    }

    /// Shows every notification received on `rx` until the sender closes.
    pub fn attach(&self, mut rx: broadcast::Receiver<Notification>) -> JoinHandle<()> {
        let center = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notification) => {
                        center.show(notification);
                    }
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notice>> {
        self.inner
            .notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

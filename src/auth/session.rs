use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::storage::{ACCESS_TOKEN, REFRESH_TOKEN, TokenStorage};

type LogoutHook = Arc<dyn Fn() + Send + Sync>;

struct Inner {
    storage: Arc<dyn TokenStorage>,
    authenticated: watch::Sender<bool>,
    on_logout: Option<LogoutHook>,
}

/// The access/refresh token pair and the side effects of losing it.
///
/// Tokens live in the injected [`TokenStorage`]; the session only changes
/// them when a refresh succeeds or the session is invalidated. Clones share
/// state.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<Inner>,
}

impl AuthSession {
    /// Creates a session over `storage`.
    ///
    /// The session starts authenticated if an access token is already stored.
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self::build(storage, None)
    }

    /// Creates a session that runs `hook` every time it is invalidated.
    pub fn with_logout_hook(
        storage: Arc<dyn TokenStorage>,
        hook: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self::build(storage, Some(Arc::new(hook)))
    }

    fn build(storage: Arc<dyn TokenStorage>, on_logout: Option<LogoutHook>) -> Self {
        let authenticated = read_token(storage.as_ref(), ACCESS_TOKEN).is_some();
        let (tx, _) = watch::channel(authenticated);
        Self {
            inner: Arc::new(Inner {
                storage,
                authenticated: tx,
                on_logout,
            }),
        }
    }

    /// Returns the stored access token without surrounding quotes.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        read_token(self.inner.storage.as_ref(), ACCESS_TOKEN)
    }

    /// Returns the stored refresh token without surrounding quotes.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        read_token(self.inner.storage.as_ref(), REFRESH_TOKEN)
    }

    /// Persists a fresh token pair.
    pub fn store_tokens(&self, access_token: &str, refresh_token: &str) {
        self.inner.storage.set(ACCESS_TOKEN, access_token);
        self.inner.storage.set(REFRESH_TOKEN, refresh_token);
        self.inner.authenticated.send_replace(true);
    }

    /// Clears both tokens, marks the session logged out and runs the logout hook.
    pub fn invalidate(&self) {
        info!("Invalidating session.");
        self.inner.storage.remove(ACCESS_TOKEN);
        self.inner.storage.remove(REFRESH_TOKEN);
        self.inner.authenticated.send_replace(false);
        if let Some(hook) = &self.inner.on_logout {
            hook();
        }
    }

    /// Returns `true` while the session holds valid tokens.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self.inner.authenticated.borrow()
    }

    /// Watches the authenticated flag.
    #[must_use]
    pub fn watch_authenticated(&self) -> watch::Receiver<bool> {
        self.inner.authenticated.subscribe()
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

// Tokens written by a JSON-stringifying storage come back quoted.
fn read_token(storage: &dyn TokenStorage, key: &str) -> Option<String> {
    storage
        .get(key)
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.is_empty())
}

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{RawResponse, RequestDescriptor, Transport};
use crate::notify::{ExtraOptions, NotificationBridge};

use super::session::AuthSession;

/// Default path of the token refresh endpoint, relative to the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh";

/// Where a single call stands in the reauthentication sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// First attempt with whatever token is stored.
    Normal,
    /// Tokens were refreshed; the replay's result is final.
    Reauthenticating,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    data: TokenPair,
}

/// Wraps a [`Transport`] with bearer authentication and a bounded
/// refresh-and-replay on `401`.
///
/// Per call: at most one refresh request and at most one replay. When the
/// refresh is impossible or fails, the session is invalidated and the
/// original `401` is returned. Every final result is handed to the
/// [`NotificationBridge`].
#[derive(Clone)]
pub struct AuthInterceptor {
    transport: Arc<dyn Transport>,
    session: AuthSession,
    bridge: NotificationBridge,
    refresh_path: String,
}

impl AuthInterceptor {
    /// Creates an interceptor.
    pub fn new(
        transport: Arc<dyn Transport>,
        session: AuthSession,
        bridge: NotificationBridge,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            session,
            bridge,
            refresh_path: refresh_path.into(),
        }
    }

    /// Returns the session this interceptor authenticates with.
    #[must_use]
    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Returns the bridge results are reported to.
    #[must_use]
    pub const fn bridge(&self) -> &NotificationBridge {
        &self.bridge
    }

    /// Executes `request`, reauthenticating once on `401`, then notifies.
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        options: &ExtraOptions,
    ) -> Result<RawResponse, ApiError> {
        let result = self.execute_with_auth(request).await;
        self.bridge.observe(&result, options);
        result
    }

    async fn execute_with_auth(&self, request: &RequestDescriptor) -> Result<RawResponse, ApiError> {
        let mut phase = Phase::Normal;
        loop {
            let result = self.transport.execute(&self.authorize(request)).await;

            let unauthorized = matches!(&result, Err(err) if err.is_unauthorized());
            if phase == Phase::Reauthenticating || !unauthorized {
                return result;
            }

            let Some(refresh_token) = self.session.refresh_token() else {
                warn!(url = %request.url, "Unauthorized and no refresh token is stored.");
                self.session.invalidate();
                return result;
            };

            match self.refresh(&refresh_token).await {
                Ok(()) => {
                    debug!(url = %request.url, "Tokens refreshed, replaying request.");
                    phase = Phase::Reauthenticating;
                }
                Err(err) => {
                    warn!(error = %err, url = %request.url, "Token refresh failed.");
                    self.session.invalidate();
                    return result;
                }
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<(), ApiError> {
        let request = RequestDescriptor::post(
            self.refresh_path.clone(),
            json!({ "refreshToken": refresh_token }),
        );
        let response = self.transport.execute(&request).await?;
        let refreshed = RefreshResponse::deserialize(&response.body)
            .map_err(|err| ApiError::Decode(format!("refresh response: {err}")))?;
        self.session
            .store_tokens(&refreshed.data.access_token, &refreshed.data.refresh_token);
        Ok(())
    }

    fn authorize(&self, request: &RequestDescriptor) -> RequestDescriptor {
        let mut request = request.clone();
        if let Some(token) = self.session.access_token() {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        request
    }
}

impl fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("session", &self.session)
            .field("refresh_path", &self.refresh_path)
            .finish_non_exhaustive()
    }
}

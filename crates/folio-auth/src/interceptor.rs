//! Authenticated API client with silent token refresh.
//!
//! Every request sent through [`ApiClient::send`] carries the current bearer
//! credential. A 401 on a first attempt triggers one token refresh and one
//! retry of the same request with the new token. Concurrent 401s share a
//! single in-flight refresh. When the refresh fails, the stored session is
//! cleared and the session-expired hook fires.

use crate::endpoints;
use crate::http::{ApiRequest, ApiResponse, HttpTransport};
use crate::models::{RefreshRequest, RefreshResponse};
use crate::{AuthError, AuthResult};
use folio_storage::TokenStore;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Callback fired after a failed refresh has cleared the session.
pub type SessionExpiredHook = Box<dyn Fn() + Send + Sync>;

/// Why a shared refresh failed. Cloned to every waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<RefreshFailure> for AuthError {
    fn from(failure: RefreshFailure) -> Self {
        match failure {
            RefreshFailure::NoRefreshToken => AuthError::NoRefreshToken,
            other => AuthError::RefreshFailed(other.to_string()),
        }
    }
}

type PendingRefresh = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

/// One try of a request. A retry is a new value with `retried` set.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub request: ApiRequest,
    pub retried: bool,
}

impl Attempt {
    pub fn first(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    /// The same request, re-issued with `token`.
    pub fn retry_with(&self, token: impl Into<String>) -> Self {
        Self {
            request: self.request.clone().with_bearer(token),
            retried: true,
        }
    }

    /// Whether `response` should trigger a refresh and retry of this attempt.
    pub fn should_refresh(&self, response: &ApiResponse) -> bool {
        response.is_unauthorized() && !self.retried
    }
}

struct Inner {
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<TokenStore>,
    /// Bearer credential attached to outgoing requests.
    authorization: RwLock<Option<String>>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
    refresh_timeout: Duration,
    on_session_expired: Mutex<Option<SessionExpiredHook>>,
}

impl Inner {
    fn set_authorization(&self, token: Option<&str>) {
        *self.authorization.write() = token.map(str::to_string);
    }

    fn clear_session(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
        self.set_authorization(None);
    }

    fn notify_session_expired(&self) {
        let hook = self.on_session_expired.lock();
        if let Some(callback) = hook.as_ref() {
            callback();
        }
    }
}

/// Shared API client. Cloning is cheap; clones share tokens, header and the
/// pending refresh.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<TokenStore>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                tokens,
                authorization: RwLock::new(None),
                pending_refresh: Mutex::new(None),
                refresh_timeout,
                on_session_expired: Mutex::new(None),
            }),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    /// Current bearer credential.
    pub fn authorization(&self) -> Option<String> {
        self.inner.authorization.read().clone()
    }

    /// Replace the bearer credential. Requests already sent are unaffected.
    pub fn set_authorization(&self, token: Option<&str>) {
        self.inner.set_authorization(token);
    }

    /// Install the callback fired when a refresh fails.
    pub fn set_session_expired_hook(&self, hook: SessionExpiredHook) {
        *self.inner.on_session_expired.lock() = Some(hook);
    }

    /// Persist a new session and start sending its access token. Without a
    /// refresh token, any previously stored one is dropped.
    pub fn store_session(&self, access: &str, refresh: Option<&str>) -> AuthResult<()> {
        match refresh {
            Some(refresh) => self.inner.tokens.save(access, refresh)?,
            None => {
                self.inner.tokens.clear()?;
                self.inner.tokens.set_access_token(access)?;
            }
        }
        self.inner.set_authorization(Some(access));
        Ok(())
    }

    /// Erase stored tokens and the bearer credential. Storage failures are
    /// logged.
    pub fn clear_session(&self) {
        self.inner.clear_session();
    }

    /// Send a request with the bearer credential, refreshing and retrying
    /// once on 401.
    ///
    /// The returned response may still be a 401 if the retry was rejected
    /// too; callers decide what that means.
    pub async fn send(&self, mut request: ApiRequest) -> AuthResult<ApiResponse> {
        if request.bearer.is_none() {
            request.bearer = self.authorization();
        }

        let attempt = Attempt::first(request);
        let response = self.inner.transport.send(&attempt.request).await?;
        if !attempt.should_refresh(&response) {
            return Ok(response);
        }

        debug!(
            request_id = %attempt.request.id,
            path = %attempt.request.path,
            "Unauthorized, refreshing access token"
        );

        let token = self.refresh().await?;
        let retry = attempt.retry_with(token);

        debug!(request_id = %retry.request.id, "Retrying request with refreshed token");
        self.inner.transport.send(&retry.request).await
    }

    /// Send a request as is, without bearer injection or refresh handling.
    pub async fn send_raw(&self, request: ApiRequest) -> AuthResult<ApiResponse> {
        self.inner.transport.send(&request).await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Joins the in-flight refresh if there is one. On failure, every waiter
    /// gets the error, the session is cleared and the session-expired hook
    /// fires once.
    pub async fn refresh(&self) -> AuthResult<String> {
        let pending = {
            let mut slot = self.inner.pending_refresh.lock();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = Self::run_refresh(Arc::clone(&self.inner))
                        .boxed()
                        .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await.map_err(AuthError::from)
    }

    async fn run_refresh(inner: Arc<Inner>) -> Result<String, RefreshFailure> {
        let result = match tokio::time::timeout(inner.refresh_timeout, Self::exchange(&inner)).await
        {
            Ok(result) => result,
            Err(_) => Err(RefreshFailure::Timeout(inner.refresh_timeout)),
        };

        match &result {
            Ok(_) => info!("Access token refreshed"),
            Err(failure) => {
                warn!(reason = %failure, "Token refresh failed, clearing session");
                inner.clear_session();
            }
        }

        inner.pending_refresh.lock().take();

        if result.is_err() {
            inner.notify_session_expired();
        }
        result
    }

    async fn exchange(inner: &Inner) -> Result<String, RefreshFailure> {
        let refresh = inner
            .tokens
            .refresh_token()
            .map_err(|e| RefreshFailure::Storage(e.to_string()))?
            .ok_or(RefreshFailure::NoRefreshToken)?;

        let request = ApiRequest::post_json(endpoints::REFRESH, &RefreshRequest { refresh: &refresh })
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;

        debug!(request_id = %request.id, "Requesting new access token");

        let response = inner
            .transport
            .send(&request)
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;

        if !response.is_success() {
            let message = response
                .detail()
                .unwrap_or_else(|| "refresh rejected".to_string());
            return Err(RefreshFailure::Rejected {
                status: response.status,
                message,
            });
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;
        let access = body
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RefreshFailure::Malformed("No access token received".to_string()))?;

        let stored = match body.refresh.as_deref() {
            Some(rotated) => inner.tokens.save(&access, rotated),
            None => inner.tokens.set_access_token(&access),
        };
        stored.map_err(|e| RefreshFailure::Storage(e.to_string()))?;
        inner.set_authorization(Some(&access));

        Ok(access)
    }
}

//! Session controller.
//!
//! [`SessionController`] owns the session state machine and drives the
//! credential calls. Consumers read [`SessionSnapshot`]s, either on demand or
//! through a `watch` subscription. Errors stop at this boundary as state
//! transitions plus notices; the session is never left half-cleared.

use crate::http::{HttpTransport, ReqwestTransport};
use crate::models::{AuthSession, LoginCredentials, RegisterCredentials, User};
use crate::ports::{Destination, Navigator, Notice, Notifier};
use crate::session_fsm::{SessionMachine, SessionMachineInput, SessionStatus};
use crate::transport::{CredentialTransport, LOGIN_FAILED_MESSAGE, REGISTER_FAILED_MESSAGE};
use crate::{ApiClient, AuthError, AuthResult};
use folio_config::Config;
use folio_storage::TokenStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What consumers see of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    /// Only ever set while `status` is `Authenticated`.
    pub user: Option<User>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    fn initial() -> Self {
        Self {
            status: SessionStatus::Unknown,
            user: None,
            is_loading: true,
        }
    }
}

/// FSM plus the published snapshot. Shared with the session-expired hook.
struct SessionCell {
    fsm: Mutex<SessionMachine>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl SessionCell {
    fn new() -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::initial());
        Self {
            fsm: Mutex::new(SessionMachine::new()),
            snapshot,
        }
    }

    /// Apply `input` and publish the new status. `user` is kept only if the
    /// machine lands in `Authenticated`.
    fn transition(
        &self,
        input: SessionMachineInput,
        user: Option<User>,
    ) -> AuthResult<SessionStatus> {
        let mut fsm = self.fsm.lock();
        let from = SessionStatus::from(fsm.state());

        fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let to = SessionStatus::from(fsm.state());
        self.snapshot.send_modify(|snapshot| {
            snapshot.status = to;
            snapshot.user = if to.is_authenticated() { user } else { None };
        });
        drop(fsm);

        info!(from = %from, to = %to, input = ?input, "Session transition");
        Ok(to)
    }

    /// Apply `input`, falling back to `SessionExpired` if the machine has
    /// already moved on (e.g. a refresh failure expired it meanwhile).
    fn settle_anonymous(&self, input: SessionMachineInput) -> SessionStatus {
        match self.transition(input, None) {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Settling session through expiry");
                self.expire()
            }
        }
    }

    fn expire(&self) -> SessionStatus {
        self.transition(SessionMachineInput::SessionExpired, None)
            .unwrap_or(SessionStatus::Anonymous)
    }

    fn set_loading(&self, is_loading: bool) {
        self.snapshot.send_if_modified(|snapshot| {
            let changed = snapshot.is_loading != is_loading;
            snapshot.is_loading = is_loading;
            changed
        });
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }
}

/// Orchestrates bootstrap, login, registration and logout.
pub struct SessionController {
    transport: CredentialTransport,
    cell: Arc<SessionCell>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl SessionController {
    /// Create a controller and install the interceptor's session-expired
    /// hook: a failed refresh moves the session to `Anonymous` and navigates
    /// to the login entry point.
    pub fn new(
        transport: CredentialTransport,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let cell = Arc::new(SessionCell::new());

        let hook_cell = Arc::clone(&cell);
        let hook_navigator = Arc::clone(&navigator);
        transport.api().set_session_expired_hook(Box::new(move || {
            warn!("Session expired");
            hook_cell.expire();
            hook_navigator.navigate(Destination::Login);
        }));

        Self {
            transport,
            cell,
            navigator,
            notifier,
        }
    }

    /// Wire a controller against the real API described by `config`.
    pub fn from_config(
        config: &Config,
        tokens: Arc<TokenStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> AuthResult<Self> {
        let api_url = config
            .api_url()
            .map_err(|e| AuthError::Config(e.to_string()))?;
        let backend_url = config
            .backend_url()
            .map_err(|e| AuthError::Config(e.to_string()))?;

        let http: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(api_url, config.request_timeout())?);
        let api = ApiClient::new(http, tokens, config.refresh_timeout());

        Ok(Self::new(
            CredentialTransport::new(api, backend_url),
            navigator,
            notifier,
        ))
    }

    /// Restore the stored session, if any.
    ///
    /// Without a stored access token the session becomes `Anonymous`.
    /// Otherwise the user is fetched (refreshing once on 401); any failure
    /// clears the stored tokens.
    pub async fn bootstrap(&self) -> AuthResult<SessionStatus> {
        self.cell.set_loading(true);
        let result = self.restore().await;
        self.cell.set_loading(false);
        result
    }

    async fn restore(&self) -> AuthResult<SessionStatus> {
        let api = self.transport.api();

        let access = match api.tokens().access_token() {
            Ok(access) => access,
            Err(e) => {
                warn!(error = %e, "Could not read stored session");
                None
            }
        };

        let Some(access) = access else {
            info!("No stored session found");
            return self.cell.transition(SessionMachineInput::NoSession, None);
        };

        api.set_authorization(Some(&access));

        match self.transport.fetch_current_user().await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                self.cell
                    .transition(SessionMachineInput::SessionRestored, Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Stored session is not usable, clearing it");
                api.clear_session();
                Ok(self.cell.settle_anonymous(SessionMachineInput::NoSession))
            }
        }
    }

    /// Log in. On failure the local session is cleared, an error notice is
    /// emitted and the error is returned.
    pub async fn login(&self, credentials: LoginCredentials) -> AuthResult<Option<User>> {
        self.cell
            .transition(SessionMachineInput::LoginAttempt, None)?;
        self.cell.set_loading(true);

        let result = self.transport.login(&credentials).await;
        let outcome = self.finish_sign_in(result, "Successfully logged in", LOGIN_FAILED_MESSAGE);

        self.cell.set_loading(false);
        outcome
    }

    /// Register a new account and sign in with it.
    pub async fn register(&self, credentials: RegisterCredentials) -> AuthResult<Option<User>> {
        self.cell
            .transition(SessionMachineInput::LoginAttempt, None)?;
        self.cell.set_loading(true);

        let result = self.transport.register(&credentials).await;
        let outcome =
            self.finish_sign_in(result, "Successfully registered", REGISTER_FAILED_MESSAGE);

        self.cell.set_loading(false);
        outcome
    }

    fn finish_sign_in(
        &self,
        result: AuthResult<AuthSession>,
        success: &str,
        failure: &str,
    ) -> AuthResult<Option<User>> {
        let completed = result.and_then(|session| {
            self.cell
                .transition(SessionMachineInput::LoginSucceeded, session.user.clone())
                .map(|_| session.user)
        });

        match completed {
            Ok(user) => {
                self.notifier.notify(Notice::success(success));
                self.navigator.navigate(Destination::Home);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                self.transport.api().clear_session();
                self.cell.settle_anonymous(SessionMachineInput::LoginFailed);
                self.notifier.notify(Notice::error(failure));
                Err(e)
            }
        }
    }

    /// Log out. Always ends `Anonymous` and navigates to the login entry
    /// point, whatever the server says.
    pub async fn logout(&self) -> SessionStatus {
        if let Err(e) = self
            .cell
            .transition(SessionMachineInput::LogoutRequested, None)
        {
            debug!(error = %e, "Logout requested while another operation is running");
        }
        self.cell.set_loading(true);

        self.transport.logout().await;
        let status = self
            .cell
            .settle_anonymous(SessionMachineInput::LogoutComplete);

        self.cell.set_loading(false);
        self.notifier
            .notify(Notice::success("Successfully logged out"));
        self.navigator.navigate(Destination::Login);
        status
    }

    /// Start the Google OAuth flow. The session status is not touched; the
    /// next bootstrap picks up the resulting session.
    pub fn login_with_google(&self) -> AuthResult<()> {
        self.transport
            .redirect_to_oauth_provider(self.navigator.as_ref())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.cell.snapshot()
    }

    /// Receive every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.cell.snapshot.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.cell.snapshot.borrow().user.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.cell.snapshot.borrow().status
    }

    pub fn is_loading(&self) -> bool {
        self.cell.snapshot.borrow().is_loading
    }

    /// Whether an access token is stored, without asking the server.
    pub fn has_stored_session(&self) -> AuthResult<bool> {
        Ok(self.transport.api().tokens().has_access_token()?)
    }

    /// The shared client for other API calls; they get the same refresh
    /// handling.
    pub fn api(&self) -> &ApiClient {
        self.transport.api()
    }

    pub fn transport(&self) -> &CredentialTransport {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints;
    use crate::http::{ApiRequest, HttpMethod};
    use crate::ports::NoticeLevel;
    use crate::test_support::{
        fixture, user_json, Fixture, RecordingNavigator, RecordingNotifier, Reply,
    };
    use folio_storage::StoredTokens;
    use serde_json::json;
    use url::Url;

    struct Harness {
        fx: Fixture,
        navigator: Arc<RecordingNavigator>,
        notifier: Arc<RecordingNotifier>,
        controller: SessionController,
    }

    fn harness() -> Harness {
        let fx = fixture();
        let navigator = Arc::new(RecordingNavigator::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let transport = CredentialTransport::new(
            fx.api.clone(),
            Url::parse("http://127.0.0.1:8000").unwrap(),
        );
        let controller = SessionController::new(
            transport,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        Harness {
            fx,
            navigator,
            notifier,
            controller,
        }
    }

    fn me_accepts(token: &'static str) -> impl Fn(&ApiRequest) -> Reply + Send + Sync {
        move |request| {
            if request.bearer.as_deref() == Some(token) {
                Reply::json(200, user_json(7, "ana"))
            } else {
                Reply::json(401, json!({"detail": "Given token not valid for any token type"}))
            }
        }
    }

    #[test]
    fn test_initial_snapshot() {
        let h = harness();
        assert_eq!(
            h.controller.snapshot(),
            SessionSnapshot {
                status: SessionStatus::Unknown,
                user: None,
                is_loading: true,
            }
        );
    }

    #[tokio::test]
    async fn test_bootstrap_without_token_is_anonymous() {
        let h = harness();

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Anonymous);
        assert!(!h.controller.is_loading());
        assert_eq!(h.fx.transport.calls().len(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_restores_user() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Authenticated);
        assert_eq!(h.controller.current_user().map(|u| u.id), Some(7));
        assert!(!h.controller.is_loading());
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));

        h.controller.bootstrap().await.unwrap();
        let first = h.controller.snapshot();
        h.controller.bootstrap().await.unwrap();

        assert_eq!(h.controller.snapshot(), first);
        assert_eq!(
            h.fx.transport.count(HttpMethod::Get, endpoints::CURRENT_USER),
            2
        );
    }

    #[tokio::test]
    async fn test_bootstrap_with_stale_token_refreshes() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A2"));
        h.fx.transport.on(HttpMethod::Post, endpoints::REFRESH, |_| {
            Reply::json(200, json!({"access": "A2"}))
        });

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Authenticated);
        let tokens = h.fx.tokens.load().unwrap();
        assert_eq!(tokens.access.as_deref(), Some("A2"));
        assert_eq!(tokens.refresh.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_bootstrap_with_rejected_refresh_clears_session() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A2"));
        h.fx.transport.on(HttpMethod::Post, endpoints::REFRESH, |_| {
            Reply::json(401, json!({"detail": "Token is invalid or expired"}))
        });

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(h.fx.tokens.load().unwrap(), StoredTokens::default());
        assert_eq!(h.navigator.last(), Some(Destination::Login));
        assert!(!h.controller.has_stored_session().unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_server_error_clears_session() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport.on(HttpMethod::Get, endpoints::CURRENT_USER, |_| {
            Reply::json(500, json!({}))
        });

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Anonymous);
        assert!(!h.fx.tokens.has_access_token().unwrap());
    }

    #[tokio::test]
    async fn test_bootstrap_network_failure_is_anonymous() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport.on(HttpMethod::Get, endpoints::CURRENT_USER, |_| {
            Reply::NetworkError("connection refused")
        });

        let status = h.controller.bootstrap().await.unwrap();

        assert_eq!(status, SessionStatus::Anonymous);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.user, None);
        assert!(!snapshot.is_loading);
        assert_eq!(h.fx.tokens.load().unwrap(), StoredTokens::default());
        assert_eq!(h.controller.api().authorization(), None);
        assert_eq!(h.fx.transport.count(HttpMethod::Post, endpoints::REFRESH), 0);
    }

    #[tokio::test]
    async fn test_login_success() {
        let h = harness();
        h.controller.bootstrap().await.unwrap();
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGIN, |_| {
            Reply::json(200, json!({"access": "A1", "refresh": "R1"}))
        });
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));

        let user = h
            .controller
            .login(LoginCredentials::new("ana", "x"))
            .await
            .unwrap();

        assert_eq!(user.map(|u| u.id), Some(7));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Authenticated);
        assert_eq!(snapshot.user.map(|u| u.id), Some(7));
        assert!(!snapshot.is_loading);

        let tokens = h.fx.tokens.load().unwrap();
        assert_eq!(tokens.access.as_deref(), Some("A1"));
        assert_eq!(tokens.refresh.as_deref(), Some("R1"));

        assert_eq!(h.navigator.last(), Some(Destination::Home));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::success("Successfully logged in")]
        );
    }

    #[tokio::test]
    async fn test_login_profile_failure_still_authenticated() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGIN, |_| {
            Reply::json(200, json!({"access": "A1", "refresh": "R1"}))
        });
        h.fx.transport.on(HttpMethod::Get, endpoints::CURRENT_USER, |_| {
            Reply::json(503, json!({}))
        });

        let user = h
            .controller
            .login(LoginCredentials::new("ana", "x"))
            .await
            .unwrap();

        assert_eq!(user, None);
        assert_eq!(h.controller.status(), SessionStatus::Authenticated);
        assert_eq!(h.controller.current_user(), None);
    }

    #[tokio::test]
    async fn test_login_profile_unauthorized_after_refresh_keeps_session() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGIN, |_| {
            Reply::json(200, json!({"access": "A1", "refresh": "R1"}))
        });
        h.fx.transport.on(HttpMethod::Get, endpoints::CURRENT_USER, |_| {
            Reply::json(401, json!({"detail": "Given token not valid for any token type"}))
        });
        h.fx.transport.on(HttpMethod::Post, endpoints::REFRESH, |_| {
            Reply::json(200, json!({"access": "A2"}))
        });

        let user = h
            .controller
            .login(LoginCredentials::new("ana", "x"))
            .await
            .unwrap();

        assert_eq!(user, None);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Authenticated);
        assert_eq!(snapshot.user, None);
        assert!(!snapshot.is_loading);

        let tokens = h.fx.tokens.load().unwrap();
        assert_eq!(tokens.access.as_deref(), Some("A2"));
        assert_eq!(tokens.refresh.as_deref(), Some("R1"));
        assert_eq!(h.controller.api().authorization().as_deref(), Some("A2"));

        assert_eq!(h.fx.transport.count(HttpMethod::Post, endpoints::REFRESH), 1);
        assert_eq!(h.fx.transport.count(HttpMethod::Get, endpoints::CURRENT_USER), 2);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::success("Successfully logged in")]
        );
        assert_eq!(h.navigator.visited(), vec![Destination::Home]);
    }

    #[tokio::test]
    async fn test_login_failure_clears_previous_session() {
        let h = harness();
        h.fx.tokens.save("A0", "R0").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A0"));
        h.controller.bootstrap().await.unwrap();
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGIN, |_| {
            Reply::json(401, json!({"detail": "No active account found"}))
        });

        let err = h
            .controller
            .login(LoginCredentials::new("ana", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials(_)));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Anonymous);
        assert_eq!(snapshot.user, None);
        assert!(!snapshot.is_loading);
        assert_eq!(h.fx.tokens.load().unwrap(), StoredTokens::default());

        let notices = h.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].description, LOGIN_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_register_success() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::REGISTER, |_| {
            Reply::json(
                201,
                json!({"access": "A1", "refresh": "R1", "user": user_json(11, "dee")}),
            )
        });

        let user = h
            .controller
            .register(RegisterCredentials::new("dee", "dee@x", "pw"))
            .await
            .unwrap();

        assert_eq!(user.map(|u| u.username), Some("dee".to_string()));
        assert_eq!(h.controller.status(), SessionStatus::Authenticated);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::success("Successfully registered")]
        );
    }

    #[tokio::test]
    async fn test_register_without_user_fetches_profile() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::REGISTER, |_| {
            Reply::json(201, json!({"access": "A1", "refresh": "R1"}))
        });
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));

        let user = h
            .controller
            .register(RegisterCredentials::new("ana", "ana@x", "pw"))
            .await
            .unwrap();

        assert_eq!(user.map(|u| u.id), Some(7));
        assert_eq!(h.fx.transport.count(HttpMethod::Get, endpoints::CURRENT_USER), 1);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Authenticated);
        assert_eq!(snapshot.user.map(|u| u.username), Some("ana".to_string()));
    }

    #[tokio::test]
    async fn test_register_profile_failure_still_authenticated() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::REGISTER, |_| {
            Reply::json(201, json!({"access": "A1", "refresh": "R1"}))
        });
        h.fx.transport.on(HttpMethod::Get, endpoints::CURRENT_USER, |_| {
            Reply::json(502, json!({}))
        });

        let user = h
            .controller
            .register(RegisterCredentials::new("ana", "ana@x", "pw"))
            .await
            .unwrap();

        assert_eq!(user, None);
        assert_eq!(h.controller.status(), SessionStatus::Authenticated);
        assert_eq!(h.controller.current_user(), None);
        assert_eq!(h.fx.tokens.load().unwrap().access.as_deref(), Some("A1"));
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::success("Successfully registered")]
        );
    }

    #[tokio::test]
    async fn test_register_failure() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::REGISTER, |_| {
            Reply::json(400, json!({"email": ["Enter a valid email address."]}))
        });

        let err = h
            .controller
            .register(RegisterCredentials::new("dee", "nope", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::ValidationFailed(_)));
        assert_eq!(h.controller.status(), SessionStatus::Anonymous);
        assert_eq!(
            h.notifier.notices(),
            vec![Notice::error(REGISTER_FAILED_MESSAGE)]
        );
    }

    #[tokio::test]
    async fn test_logout_always_ends_anonymous() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGOUT, |_| {
            Reply::json(500, json!({"detail": "boom"}))
        });
        h.controller.bootstrap().await.unwrap();

        let status = h.controller.logout().await;

        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(h.controller.current_user(), None);
        assert!(!h.controller.is_loading());
        assert_eq!(h.fx.tokens.load().unwrap(), StoredTokens::default());
        assert_eq!(h.fx.api.authorization(), None);
        assert_eq!(h.navigator.last(), Some(Destination::Login));
    }

    #[tokio::test]
    async fn test_logout_before_bootstrap() {
        let h = harness();

        let status = h.controller.logout().await;

        assert_eq!(status, SessionStatus::Anonymous);
        assert_eq!(h.fx.transport.count(HttpMethod::Post, endpoints::LOGOUT), 0);
    }

    #[tokio::test]
    async fn test_login_with_google_keeps_status() {
        let h = harness();
        h.controller.bootstrap().await.unwrap();

        h.controller.login_with_google().unwrap();

        assert_eq!(h.controller.status(), SessionStatus::Anonymous);
        assert_eq!(
            h.navigator.last(),
            Some(Destination::External(
                Url::parse("http://127.0.0.1:8000/api/users/google/login/").unwrap()
            ))
        );
        assert!(h.fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_on_later_request_expires_session() {
        let h = harness();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));
        h.controller.bootstrap().await.unwrap();
        assert_eq!(h.controller.status(), SessionStatus::Authenticated);

        h.fx.transport.on(HttpMethod::Get, "/api/books/", |_| {
            Reply::json(401, json!({"detail": "expired"}))
        });
        h.fx.transport.on(HttpMethod::Post, endpoints::REFRESH, |_| {
            Reply::json(401, json!({"detail": "Token is invalid or expired"}))
        });

        let result = h.controller.api().send(ApiRequest::get("/api/books/")).await;

        assert!(matches!(result, Err(AuthError::RefreshFailed(_))));
        assert_eq!(h.controller.status(), SessionStatus::Anonymous);
        assert_eq!(h.controller.current_user(), None);
        assert_eq!(h.navigator.last(), Some(Destination::Login));
        assert!(!h.controller.has_stored_session().unwrap());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let h = harness();
        let mut updates = h.controller.subscribe();
        h.fx.tokens.save("A1", "R1").unwrap();
        h.fx.transport
            .on(HttpMethod::Get, endpoints::CURRENT_USER, me_accepts("A1"));

        h.controller.bootstrap().await.unwrap();

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.status, SessionStatus::Authenticated);
        assert!(!latest.is_loading);
    }

    #[tokio::test]
    async fn test_concurrent_login_is_rejected() {
        let h = harness();
        h.fx.transport.on(HttpMethod::Post, endpoints::LOGIN, |_| {
            Reply::delayed(
                std::time::Duration::from_millis(20),
                200,
                json!({"access": "A1", "refresh": "R1", "user": user_json(7, "ana")}),
            )
        });

        let (first, second) = tokio::join!(
            h.controller.login(LoginCredentials::new("ana", "x")),
            h.controller.login(LoginCredentials::new("ana", "x")),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(AuthError::InvalidStateTransition(_))));
        assert_eq!(h.controller.status(), SessionStatus::Authenticated);
    }
}

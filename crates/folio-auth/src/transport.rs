//! Credential calls against the users API.

use crate::endpoints;
use crate::http::{ApiRequest, ApiResponse};
use crate::models::{AuthResponse, AuthSession, LoginCredentials, RegisterCredentials, User};
use crate::ports::{Destination, Navigator};
use crate::{ApiClient, AuthError, AuthResult};
use tracing::{debug, info, warn};
use url::Url;

pub const LOGIN_FAILED_MESSAGE: &str = "Failed to login. Please check your credentials.";
pub const REGISTER_FAILED_MESSAGE: &str = "Failed to register. Please try again.";

/// Login, registration, logout, refresh and who-am-I.
///
/// Login, register and logout go out without refresh handling: a 401 there
/// is a rejection, not an expired token.
#[derive(Clone)]
pub struct CredentialTransport {
    api: ApiClient,
    backend_url: Url,
}

impl CredentialTransport {
    pub fn new(api: ApiClient, backend_url: Url) -> Self {
        Self { api, backend_url }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in and store the returned tokens.
    pub async fn login(&self, credentials: &LoginCredentials) -> AuthResult<AuthSession> {
        debug!(credentials = ?credentials, "Login attempt");

        let request = ApiRequest::post_json(endpoints::LOGIN, credentials)?;
        let response = self.api.send_raw(request).await?;

        if response.is_client_error() {
            let message = response
                .detail()
                .unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string());
            warn!(status = response.status, "Login rejected");
            return Err(AuthError::InvalidCredentials(message));
        }

        self.establish(response).await
    }

    /// Create an account and store the returned tokens.
    pub async fn register(&self, credentials: &RegisterCredentials) -> AuthResult<AuthSession> {
        debug!(credentials = ?credentials, "Registration attempt");

        let request = ApiRequest::post_json(endpoints::REGISTER, credentials)?;
        let response = self.api.send_raw(request).await?;

        if response.is_client_error() {
            let message = response
                .detail()
                .unwrap_or_else(|| REGISTER_FAILED_MESSAGE.to_string());
            warn!(status = response.status, "Registration rejected");
            return Err(AuthError::ValidationFailed(message));
        }

        self.establish(response).await
    }

    async fn establish(&self, response: ApiResponse) -> AuthResult<AuthSession> {
        if !response.is_success() {
            return Err(response.into_error());
        }

        let body: AuthResponse = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let access = body
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("No access token received".to_string()))?;

        self.api.store_session(&access, body.refresh.as_deref())?;

        let user = match body.user {
            Some(user) => Some(user),
            None => match self.fetch_current_user().await {
                Ok(user) => Some(user),
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Signed in but could not fetch user profile");
                    None
                }
            },
        };

        info!(user_id = ?user.as_ref().map(|u| u.id), "Signed in");

        Ok(AuthSession {
            access,
            refresh: body.refresh,
            user,
        })
    }

    /// Invalidate the session remotely (best effort) and always clear it
    /// locally. Returns whether the server acknowledged the logout.
    pub async fn logout(&self) -> bool {
        let token = match self.api.tokens().access_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored access token");
                None
            }
        };

        let acknowledged = match token {
            None => {
                debug!("No stored access token, skipping remote logout");
                false
            }
            Some(token) => {
                let request = ApiRequest::post(endpoints::LOGOUT).with_bearer(token);
                match self.api.send_raw(request).await {
                    Ok(response) if response.is_success() => true,
                    Ok(response) => {
                        warn!(status = response.status, "Remote logout rejected");
                        false
                    }
                    Err(e) => {
                        warn!(error = %e, "Remote logout failed");
                        false
                    }
                }
            }
        };

        self.api.clear_session();
        info!(acknowledged, "Logged out");
        acknowledged
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&self) -> AuthResult<String> {
        self.api.refresh().await
    }

    /// Fetch the signed-in user.
    pub async fn fetch_current_user(&self) -> AuthResult<User> {
        let response = self.api.send(ApiRequest::get(endpoints::CURRENT_USER)).await?;

        if response.is_unauthorized() {
            return Err(AuthError::Unauthorized);
        }
        if !response.is_success() {
            return Err(AuthError::ProfileFetch(format!("HTTP {}", response.status)));
        }

        response
            .json()
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))
    }

    /// Where the OAuth flow starts.
    pub fn oauth_login_url(&self) -> AuthResult<Url> {
        Ok(endpoints::resolve(&self.backend_url, endpoints::GOOGLE_LOGIN)?)
    }

    /// Send the user agent to the OAuth provider. Completion happens outside
    /// this process.
    pub fn redirect_to_oauth_provider(&self, navigator: &dyn Navigator) -> AuthResult<()> {
        let url = self.oauth_login_url()?;
        info!(url = %url, "Redirecting to OAuth provider");
        navigator.navigate(Destination::External(url));
        Ok(())
    }
}

//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login rejected by the server
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Registration rejected by the server
    #[error("Registration rejected: {0}")]
    ValidationFailed(String),

    /// No refresh token is stored
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Refresh rejected or timed out; the session has been cleared
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Transport-level failure (connection, DNS, TLS, client timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Who-am-I request failed
    #[error("Failed to fetch user profile: {0}")]
    ProfileFetch(String),

    /// Request still unauthorized after refresh and retry
    #[error("Unauthorized")]
    Unauthorized,

    /// Unexpected response status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Success response with an unusable body
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] folio_storage::StorageError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true if a failed token refresh has cleared the stored session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AuthError::NoRefreshToken | AuthError::RefreshFailed(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

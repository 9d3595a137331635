//! Authentication session management for the Folio client.
//!
//! This crate provides:
//! - Token acquisition (login, registration) and best-effort logout
//! - An API client that attaches bearer credentials and silently refreshes
//!   expired access tokens, sharing one refresh across concurrent callers
//! - An explicit FSM-based session controller publishing session snapshots
//! - Navigation and notification ports for the host application

mod controller;
pub mod endpoints;
mod error;
mod http;
mod interceptor;
mod models;
mod ports;
mod session_fsm;
mod transport;

#[cfg(test)]
mod test_support;

pub use controller::{SessionController, SessionSnapshot};
pub use error::{AuthError, AuthResult};
pub use http::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
pub use interceptor::{ApiClient, Attempt, RefreshFailure, SessionExpiredHook};
pub use models::{AuthSession, LoginCredentials, RegisterCredentials, User};
pub use ports::{Destination, Navigator, Notice, NoticeLevel, Notifier};
pub use session_fsm::session_machine;
pub use session_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionStatus};
pub use transport::{CredentialTransport, LOGIN_FAILED_MESSAGE, REGISTER_FAILED_MESSAGE};

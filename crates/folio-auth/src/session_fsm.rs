//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                ┌───────────┐
//!                │  Unknown  │ (initial)
//!                └─────┬─────┘
//!   SessionRestored    │    NoSession
//!        ┌─────────────┼──────────────┐
//!        ▼             │              ▼
//! ┌───────────────┐    │      ┌───────────────┐
//! │ Authenticated │    │      │   Anonymous   │
//! └───────┬───────┘    │      └───────┬───────┘
//!         │ LoginAttempt / LogoutRequested (from any settled state)
//!         ▼            ▼              ▼
//!        ┌──────────────────────────────┐
//!        │        Authenticating        │
//!        └──────────────┬───────────────┘
//!   LoginSucceeded ──► Authenticated
//!   LoginFailed / LogoutComplete ──► Anonymous
//!
//!   SessionExpired: any state ──► Anonymous
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unknown)

    Unknown => {
        SessionRestored => Authenticated,
        NoSession => Anonymous,
        LoginAttempt => Authenticating,
        LogoutRequested => Authenticating,
        SessionExpired => Anonymous
    },
    Authenticating => {
        LoginSucceeded => Authenticated,
        LoginFailed => Anonymous,
        LogoutComplete => Anonymous,
        SessionExpired => Anonymous
    },
    Authenticated => {
        // Repeated bootstrap
        SessionRestored => Authenticated,
        NoSession => Anonymous,
        LoginAttempt => Authenticating,
        LogoutRequested => Authenticating,
        SessionExpired => Anonymous
    },
    Anonymous => {
        SessionRestored => Authenticated,
        NoSession => Anonymous,
        LoginAttempt => Authenticating,
        LogoutRequested => Authenticating,
        SessionExpired => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session status for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup, before the stored session has been checked.
    Unknown,
    /// Login, registration or logout in progress.
    Authenticating,
    Authenticated,
    Anonymous,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated)
    }

    /// Returns true while the status is expected to change without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionStatus::Unknown | SessionStatus::Authenticating)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionStatus::Unknown => "unknown",
            SessionStatus::Authenticating => "authenticating",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::Anonymous => "anonymous",
        };
        f.write_str(name)
    }
}

impl From<&SessionMachineState> for SessionStatus {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unknown => SessionStatus::Unknown,
            SessionMachineState::Authenticating => SessionStatus::Authenticating,
            SessionMachineState::Authenticated => SessionStatus::Authenticated,
            SessionMachineState::Anonymous => SessionStatus::Anonymous,
        }
    }
}

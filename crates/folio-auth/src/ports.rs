//! Navigation and notification ports.
//!
//! The session controller reports outcomes through these traits; the host
//! application decides what "navigate" and "notify" mean.

use serde::Serialize;
use url::Url;

/// Where the user should be sent next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Home,
    /// The login entry point.
    Login,
    /// A page outside the application, such as an OAuth provider.
    External(Url),
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: "Success".to_string(),
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

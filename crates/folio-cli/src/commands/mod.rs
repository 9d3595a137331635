//! CLI command implementations.

mod auth;

pub use auth::{google, login, logout, register, status, whoami};

use crate::output::OutputFormat;
use crate::terminal::{BrowserNavigator, TerminalNotifier};
use anyhow::Result;
use folio_auth::SessionController;
use folio_config::{Config, Paths};
use folio_auth::AuthError;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// A sign-in failure the controller's notifier has already printed. The
/// process still exits non-zero, but the message is not shown twice.
#[derive(Debug)]
pub struct Reported(pub AuthError);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Reported {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Whether `error` still needs to be printed before exiting.
pub fn needs_report(error: &anyhow::Error) -> bool {
    error.downcast_ref::<Reported>().is_none()
}

/// Build the session controller over the persisted token store.
pub fn connect(paths: &Paths, config: &Config, format: OutputFormat) -> Result<SessionController> {
    let tokens = folio_storage::open_token_store(paths.session_file())?;

    let controller = SessionController::from_config(
        config,
        Arc::new(tokens),
        Arc::new(BrowserNavigator::new(format)),
        Arc::new(TerminalNotifier::new(format)),
    )?;
    Ok(controller)
}

/// Use `value` if given, otherwise prompt for it. Returns `None` for an
/// empty answer.
fn value_or_prompt(value: Option<String>, label: &str) -> Result<Option<String>> {
    if let Some(value) = value {
        return Ok(Some(value));
    }

    print!("{}: ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();
    Ok((!input.is_empty()).then_some(input))
}

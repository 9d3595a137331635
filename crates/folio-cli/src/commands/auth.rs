//! Authentication commands.

use super::{value_or_prompt, Reported};
use crate::output::{self, row, OutputFormat};
use anyhow::{bail, Result};
use folio_auth::{LoginCredentials, RegisterCredentials, SessionController, SessionStatus, User};
use serde::Serialize;
use std::fmt;

/// Session status as printed by `folio status`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    pub logged_in: bool,
    pub user: Option<User>,
}

impl StatusReport {
    pub fn from_controller(controller: &SessionController) -> Self {
        let snapshot = controller.snapshot();
        Self {
            logged_in: snapshot.status.is_authenticated(),
            status: snapshot.status,
            user: snapshot.user,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auth = if self.logged_in {
            "logged in"
        } else {
            "not logged in"
        };
        write!(f, "{}", row("Auth", auth))?;
        if let Some(user) = &self.user {
            write!(f, "\n{}", row("User", &describe(user)))?;
            write!(f, "\n{}", row("Email", &user.email))?;
        }
        Ok(())
    }
}

fn describe(user: &User) -> String {
    format!("{} (#{})", user.username, user.id)
}

fn print_user(user: &User, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", row("User", &describe(user)));
            println!("{}", row("Email", &user.email));
            if let Some(bio) = &user.bio {
                println!("{}", row("Bio", bio));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(user)?),
    }
    Ok(())
}

/// Login with username and password.
pub async fn login(
    controller: &SessionController,
    username: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    if controller.bootstrap().await? == SessionStatus::Authenticated {
        let who = controller
            .current_user()
            .map(|user| user.username)
            .unwrap_or_else(|| "unknown".to_string());
        output::print_success(&format!("Already logged in as {}", who), format);
        return Ok(());
    }

    let Some(username) = value_or_prompt(username, "Username")? else {
        bail!("Username is required");
    };

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }

    let user = controller
        .login(LoginCredentials::new(username, password))
        .await
        .map_err(Reported)?;
    if let Some(user) = user {
        print_user(&user, format)?;
    }
    Ok(())
}

/// Create an account and sign in with it.
pub async fn register(
    controller: &SessionController,
    username: Option<String>,
    email: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let Some(username) = value_or_prompt(username, "Username")? else {
        bail!("Username is required");
    };
    let Some(email) = value_or_prompt(email, "Email")? else {
        bail!("Email is required");
    };

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        bail!("Password is required");
    }
    let confirmation = rpassword::prompt_password("Confirm password: ")?;
    if confirmation != password {
        bail!("Passwords do not match");
    }

    let user = controller
        .register(RegisterCredentials::new(username, email, password))
        .await
        .map_err(Reported)?;
    if let Some(user) = user {
        print_user(&user, format)?;
    }
    Ok(())
}

/// Logout and clear the stored session.
pub async fn logout(controller: &SessionController) -> Result<()> {
    controller.logout().await;
    Ok(())
}

/// Check authentication status.
pub async fn status(controller: &SessionController, format: OutputFormat) -> Result<()> {
    controller.bootstrap().await?;
    output::print(&StatusReport::from_controller(controller), format);
    Ok(())
}

/// Print the signed-in user.
pub async fn whoami(controller: &SessionController, format: OutputFormat) -> Result<()> {
    controller.bootstrap().await?;

    match controller.current_user() {
        Some(user) => print_user(&user, format),
        None if controller.status().is_authenticated() => {
            bail!("Logged in, but the user profile is unavailable")
        }
        None => bail!("Not logged in"),
    }
}

/// Start Google sign-in in the browser.
pub async fn google(controller: &SessionController, format: OutputFormat) -> Result<()> {
    controller.login_with_google()?;
    output::print_success(
        "Complete sign-in in your browser, then run 'folio status'.",
        format,
    );
    Ok(())
}

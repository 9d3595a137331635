//! Terminal implementations of the session controller's ports.

use crate::output::{self, OutputFormat};
use folio_auth::{Destination, Navigator, Notice, NoticeLevel, Notifier};
use tracing::{debug, warn};

/// Opens external destinations in the default browser.
pub struct BrowserNavigator {
    format: OutputFormat,
}

impl BrowserNavigator {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&self, destination: Destination) {
        match destination {
            Destination::Home => debug!("Navigate home"),
            Destination::Login => {
                output::print_hint("Run 'folio login' to sign in.", self.format);
            }
            Destination::External(url) => {
                output::print_hint(&format!("Opening {}", url), self.format);
                if let Err(e) = open::that(url.as_str()) {
                    warn!(error = %e, url = %url, "Failed to open browser");
                    output::print_hint(
                        &format!("Could not open a browser. Visit {} to continue.", url),
                        self.format,
                    );
                }
            }
        }
    }
}

/// Prints notices as success/error lines.
pub struct TerminalNotifier {
    format: OutputFormat,
}

impl TerminalNotifier {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => output::print_success(&notice.description, self.format),
            NoticeLevel::Error => output::print_error(&notice.description, self.format),
        }
    }
}

//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default API base URL (can be overridden at compile time via FOLIO_API_URL).
pub const DEFAULT_API_URL: &str = match option_env!("FOLIO_API_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:8000",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Upper bound on a single token refresh round trip.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

/// Upper bound on any other API request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_LOG_LEVEL: &str = "FOLIO_LOG_LEVEL";
const ENV_API_URL: &str = "FOLIO_API_URL";
const ENV_BACKEND_URL: &str = "FOLIO_BACKEND_URL";
const ENV_REFRESH_TIMEOUT: &str = "FOLIO_REFRESH_TIMEOUT_SECS";
const ENV_REQUEST_TIMEOUT: &str = "FOLIO_REQUEST_TIMEOUT_SECS";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Backend origin that owns the OAuth entry point.
    #[serde(default = "default_api_url")]
    pub backend_url: String,
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_refresh_timeout_secs() -> u64 {
    DEFAULT_REFRESH_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_url: default_api_url(),
            backend_url: default_api_url(),
            refresh_timeout_secs: DEFAULT_REFRESH_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load `config.json` from the paths' base directory (defaults when the
    /// file does not exist), then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup. Empty values are ignored, as
    /// are timeouts that do not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(secs) = lookup(ENV_REFRESH_TIMEOUT).and_then(|raw| raw.parse().ok()) {
            self.refresh_timeout_secs = secs;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT).and_then(|raw| raw.parse().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    /// Reject configurations the session client cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        self.backend_url()?;
        if self.refresh_timeout_secs == 0 {
            return Err(CoreError::Config(
                "refresh_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// API base URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// OAuth backend origin as a parsed URL.
    pub fn backend_url(&self) -> CoreResult<Url> {
        Url::parse(&self.backend_url).map_err(CoreError::from)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend_url, DEFAULT_API_URL);
        assert_eq!(config.refresh_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.refresh_timeout_secs, DEFAULT_REFRESH_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_load_reads_file_from_base_dir() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(
            paths.config_file(),
            r#"{ "api_url": "https://api.folio.test", "request_timeout_secs": 15 }"#,
        )
        .unwrap();

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.api_url, "https://api.folio.test");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        assert!(!paths.config_file().exists());
        let config = Config::load(&paths).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.refresh_timeout_secs > 0);
    }

    #[test]
    fn test_overrides_apply_and_ignore_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("FOLIO_LOG_LEVEL", "debug"),
            ("FOLIO_API_URL", "https://api.folio.test"),
            ("FOLIO_BACKEND_URL", "   "),
            ("FOLIO_REFRESH_TIMEOUT_SECS", "3"),
            ("FOLIO_REQUEST_TIMEOUT_SECS", "45"),
        ]));

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_url, "https://api.folio.test");
        assert_eq!(config.backend_url, DEFAULT_API_URL);
        assert_eq!(config.refresh_timeout_secs, 3);
        assert_eq!(config.request_timeout_secs, 45);
    }

    #[test]
    fn test_unparseable_timeout_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[("FOLIO_REFRESH_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.refresh_timeout_secs, DEFAULT_REFRESH_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config {
            api_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_rejects_zero_refresh_timeout() {
        let config = Config {
            refresh_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_request_timeout() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }
}

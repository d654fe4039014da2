use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DashboardError, Result};
use crate::notifications::ReconnectPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws/notifications";
const ENV_PREFIX: &str = "MINIBOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base address of the REST API
    pub api_url: String,
    /// Address of the push notification endpoint
    pub ws_url: String,
    pub request_timeout_secs: u64,
    /// Directory of the sled database holding the session token
    pub session_path: String,
    pub reconnect: ReconnectSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout_secs: 15,
            session_path: ".minibot/session".to_string(),
            reconnect: ReconnectSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl Settings {
    /// Loads defaults, then the optional config file, then `MINIBOT_*`
    /// environment variables (a `.env` file is read first).
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_file.display());
        }

        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("ws_url", defaults.ws_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("session_path", defaults.session_path)?
            .set_default("reconnect.max_attempts", defaults.reconnect.max_attempts)?
            .set_default("reconnect.initial_delay_ms", defaults.reconnect.initial_delay_ms)?
            .set_default("reconnect.max_delay_ms", defaults.reconnect.max_delay_ms)?;

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings
            .validate()
            .map_err(|errors| DashboardError::Config(errors.join(", ")))?;

        info!("Using API {} and channel {}", settings.api_url, settings.ws_url);
        Ok(settings)
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            errors.push(format!("api_url must be an http(s) address, got '{}'", self.api_url));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            errors.push(format!("ws_url must be a ws(s) address, got '{}'", self.ws_url));
        }
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be > 0".to_string());
        }
        if self.session_path.trim().is_empty() {
            errors.push("session_path must not be empty".to_string());
        }
        if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
            errors.push("reconnect.initial_delay_ms must be <= reconnect.max_delay_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Applies command line overrides and re-validates
    pub fn with_overrides(mut self, api_url: Option<String>, ws_url: Option<String>) -> Result<Self> {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if let Some(ws_url) = ws_url {
            self.ws_url = ws_url;
        }
        self.validate()
            .map_err(|errors| DashboardError::Config(errors.join(", ")))?;
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.reconnect.max_attempts,
            initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
            max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.request_timeout(), Duration::from_secs(15));
        assert_eq!(settings.reconnect_policy().max_attempts, 0);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let settings = Settings {
            api_url: "localhost:8000".to_string(),
            ws_url: "http://localhost:8000/ws".to_string(),
            request_timeout_secs: 0,
            ..Settings::default()
        };

        let errors = settings.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_overrides_replace_urls() {
        let settings = Settings::default()
            .with_overrides(
                Some("https://bots.example.com".to_string()),
                Some("wss://bots.example.com/ws".to_string()),
            )
            .unwrap();

        assert_eq!(settings.api_url, "https://bots.example.com");
        assert_eq!(settings.ws_url, "wss://bots.example.com/ws");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = Settings::default().with_overrides(None, Some("localhost".to_string()));
        assert!(matches!(result, Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_load_reads_config_file() {
        let dir = std::env::temp_dir().join(format!("minibot-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("minibot.toml");
        std::fs::write(
            &file,
            "api_url = \"https://api.example.com\"\nrequest_timeout_secs = 3\n\n[reconnect]\nmax_attempts = 4\n",
        )
        .unwrap();

        let settings = Settings::load(file.to_str()).unwrap();
        assert_eq!(settings.api_url, "https://api.example.com");
        assert_eq!(settings.request_timeout_secs, 3);
        assert_eq!(settings.reconnect.max_attempts, 4);
        assert_eq!(settings.reconnect.initial_delay_ms, 500);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Runtime configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL of the backend that owns the AI chat endpoint.
    /// `None` selects the offline completion service.
    pub backend_url: Option<String>,
    /// Optional bearer token sent to the backend.
    pub backend_token: Option<SecretString>,
    /// Ask the backend for its primary (reasoning) model.
    pub use_primary_model: bool,
    /// Timeout for a single completion request.
    pub request_timeout: Duration,
    /// Location of the libSQL session database.
    pub db_path: PathBuf,
    /// Port for the HTTP server.
    pub http_port: u16,
    /// Honor reveal delays when presenting assistant messages.
    pub pacing: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            backend_token: None,
            use_primary_model: true,
            request_timeout: Duration::from_secs(30),
            db_path: PathBuf::from("./data/ellen.db"),
            http_port: 8080,
            pacing: true,
        }
    }
}

impl ChatConfig {
    /// Build config from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend_url = std::env::var("ELLEN_BACKEND_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let backend_token = std::env::var("ELLEN_BACKEND_TOKEN")
            .ok()
            .filter(|s| !s.is_empty())
            .map(SecretString::from);

        let use_primary_model = std::env::var("ELLEN_USE_PRIMARY_MODEL")
            .ok()
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.use_primary_model);

        let request_timeout = std::env::var("ELLEN_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let db_path = std::env::var("ELLEN_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let http_port: u16 = std::env::var("ELLEN_HTTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.http_port);

        let pacing = std::env::var("ELLEN_PACING")
            .ok()
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.pacing);

        Self {
            backend_url,
            backend_token,
            use_primary_model,
            request_timeout,
            db_path,
            http_port,
            pacing,
        }
    }
}

impl ChatConfig {
    /// Full URL of the guest chat endpoint, if a backend is configured.
    pub fn chat_endpoint(&self) -> Result<Option<reqwest::Url>, ConfigError> {
        let Some(ref base) = self.backend_url else {
            return Ok(None);
        };
        let url = reqwest::Url::parse(&format!("{base}/api/chat/guest")).map_err(|e| {
            ConfigError::InvalidValue {
                key: "ELLEN_BACKEND_URL".to_string(),
                message: e.to_string(),
            }
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidValue {
                key: "ELLEN_BACKEND_URL".to_string(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(Some(url))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ChatConfig::default();
        assert!(config.backend_url.is_none());
        assert!(config.use_primary_model);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.http_port, 8080);
        assert!(config.pacing);
    }

    #[test]
    fn chat_endpoint_appends_guest_path() {
        let config = ChatConfig {
            backend_url: Some("https://api.example.com".to_string()),
            ..Default::default()
        };
        let url = config.chat_endpoint().unwrap().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/chat/guest");

        assert!(ChatConfig::default().chat_endpoint().unwrap().is_none());
    }

    #[test]
    fn chat_endpoint_rejects_other_schemes() {
        let config = ChatConfig {
            backend_url: Some("ftp://api.example.com".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.chat_endpoint(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("on"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

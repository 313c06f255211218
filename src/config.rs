//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Tutorial timing and layout configuration.
#[derive(Debug, Clone)]
pub struct TutorialConfig {
    /// Upper bound on how long auto-start waits for the results view to report
    /// that its layout is ready.
    pub start_fallback: Duration,
    /// Upper bound on how long the step-0 advance waits for the details view
    /// to report that it has finished opening.
    pub details_fallback: Duration,
    /// Delay before the single anchor-resolution retry.
    pub anchor_retry_delay: Duration,
    /// Horizontal gap between the anchor's right edge and the tutorial card.
    pub pointer_offset: f64,
    /// Width reserved for the tutorial card when clamping to the viewport.
    pub card_width: f64,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            start_fallback: Duration::from_millis(500),
            details_fallback: Duration::from_millis(300),
            anchor_retry_delay: Duration::from_millis(100),
            pointer_offset: 20.0,
            card_width: 400.0,
        }
    }
}

impl TutorialConfig {
    /// Load overrides from `IELTS_REVIEW_*` environment variables. A set but
    /// unparsable delay is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            start_fallback: env_millis("IELTS_REVIEW_START_DELAY_MS")?
                .unwrap_or(defaults.start_fallback),
            details_fallback: env_millis("IELTS_REVIEW_DETAILS_DELAY_MS")?
                .unwrap_or(defaults.details_fallback),
            anchor_retry_delay: env_millis("IELTS_REVIEW_ANCHOR_RETRY_MS")?
                .unwrap_or(defaults.anchor_retry_delay),
            ..defaults
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the WebSocket + REST server.
    pub port: u16,
    /// Path of the libSQL database holding per-browser settings.
    pub db_path: PathBuf,
    /// Base URL of the external scoring API.
    pub scoring_url: String,
    pub tutorial: TutorialConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            db_path: PathBuf::from("./data/ielts-review.db"),
            scoring_url: "http://localhost:8000".to_string(),
            tutorial: TutorialConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build the server configuration from the environment.
    ///
    /// Unset variables fall back to defaults; a set but unparsable port or
    /// delay is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("IELTS_REVIEW_PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "IELTS_REVIEW_PORT".to_string(),
                message: format!("{e}"),
            })?,
            Err(_) => defaults.port,
        };

        let db_path = std::env::var("IELTS_REVIEW_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let scoring_url = std::env::var("IELTS_REVIEW_SCORING_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.scoring_url);

        Ok(Self {
            port,
            db_path,
            scoring_url,
            tutorial: TutorialConfig::from_env()?,
        })
    }
}

fn env_millis(key: &str) -> Result<Option<Duration>, ConfigError> {
    parse_millis(key, std::env::var(key).ok())
}

fn parse_millis(key: &str, raw: Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tutorial_defaults() {
        let config = TutorialConfig::default();
        assert_eq!(config.start_fallback, Duration::from_millis(500));
        assert_eq!(config.details_fallback, Duration::from_millis(300));
        assert_eq!(config.card_width, 400.0);
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert!(config.db_path.ends_with("ielts-review.db"));
    }

    #[test]
    fn delay_overrides_parse_as_millis() {
        assert_eq!(
            parse_millis("IELTS_REVIEW_START_DELAY_MS", Some("250".to_string())).unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(parse_millis("IELTS_REVIEW_START_DELAY_MS", None).unwrap(), None);
    }

    #[test]
    fn unparsable_delay_is_an_error() {
        let err = parse_millis("IELTS_REVIEW_DETAILS_DELAY_MS", Some("soon".to_string()))
            .unwrap_err();
        let ConfigError::InvalidValue { key, .. } = &err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(key, "IELTS_REVIEW_DETAILS_DELAY_MS");
    }
}

//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Default base URL of the conversation service.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the conversation service, without a trailing slash.
    pub api_base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Capacity of the session event and notification broadcast channels.
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(60),
            event_capacity: 256,
        }
    }
}

impl ClientConfig {
    /// Build configuration from `CAREER_ASSIST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = match lookup("CAREER_ASSIST_API_URL") {
            Some(raw) => normalize_base_url(&raw)?,
            None => defaults.api_base_url,
        };

        let request_timeout = lookup("CAREER_ASSIST_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let event_capacity = lookup("CAREER_ASSIST_EVENT_CAPACITY")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|cap| *cap > 0)
            .unwrap_or(defaults.event_capacity);

        Ok(Self {
            api_base_url,
            request_timeout,
            event_capacity,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: "CAREER_ASSIST_API_URL".to_string(),
        message: format!("{trimmed:?} is not a valid URL: {e}"),
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidValue {
            key: "CAREER_ASSIST_API_URL".to_string(),
            message: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

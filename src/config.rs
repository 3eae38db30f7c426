use crate::domain::{UserId, DEFAULT_EXPECTED_REVIEWERS};
use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub deal_api_url: String,
    pub session_user_id: Option<UserId>,
    pub session_token: Option<String>,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    /// Largest request body accepted by the local upload route.
    pub max_upload_bytes: usize,
    pub expected_reviewers: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let deal_api_url = env_map
            .get("DEAL_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "http://localhost:8000".to_string());
        if !deal_api_url.starts_with("http://") && !deal_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "DEAL_API_URL".to_string(),
                format!("must be an http(s) URL, got {}", deal_api_url),
            ));
        }

        let session_user_id = non_empty(&env_map, "SESSION_USER_ID").map(UserId::new);
        let session_token = non_empty(&env_map, "SESSION_TOKEN");
        if session_user_id.is_some() && session_token.is_none() {
            return Err(ConfigError::MissingEnv("SESSION_TOKEN".to_string()));
        }

        let poll_interval = parse_millis(&env_map, "POLL_INTERVAL_MS", 5_000)?;
        let request_timeout = parse_millis(&env_map, "REQUEST_TIMEOUT_MS", 30_000)?;
        let upload_timeout = parse_millis(&env_map, "UPLOAD_TIMEOUT_MS", 180_000)?;

        let max_upload_bytes = match env_map.get("MAX_UPLOAD_BYTES") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAX_UPLOAD_BYTES".to_string(),
                        format!("must be a positive integer, got {}", raw),
                    ))
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let expected_reviewers = match env_map.get("EXPECTED_REVIEWERS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "EXPECTED_REVIEWERS".to_string(),
                        format!("must be a positive integer, got {}", raw),
                    ))
                }
            },
            None => DEFAULT_EXPECTED_REVIEWERS,
        };

        Ok(Config {
            port,
            deal_api_url,
            session_user_id,
            session_token,
            poll_interval,
            request_timeout,
            upload_timeout,
            max_upload_bytes,
            expected_reviewers,
        })
    }
}

fn non_empty(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_millis(
    env_map: &HashMap<String, String>,
    key: &str,
    default_ms: u64,
) -> Result<Duration, ConfigError> {
    let ms = match env_map.get(key) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        })?,
        None => default_ms,
    };
    if ms == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_millis(ms))
}

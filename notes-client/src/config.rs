use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Environment variable names - single source of truth
pub mod env_vars {
    /// Base URL of the notes API (e.g. "https://notes.example.com/api")
    pub const API_URL: &str = "NOTES_API_URL";
    /// Directory holding the persisted session record
    pub const STATE_DIR: &str = "NOTES_STATE_DIR";
    pub const HTTP_TIMEOUT_SECS: &str = "NOTES_HTTP_TIMEOUT_SECS";
}

/// Default values
pub mod defaults {
    pub const API_URL: &str = "http://localhost:8000";
    pub const STATE_DIR_NAME: &str = "notes-client";
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
    /// Fixed key of the persisted session record
    pub const STORAGE_KEY: &str = "auth-storage";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },
    #[error("{var} must use http or https, got {scheme}")]
    UnsupportedScheme { var: &'static str, scheme: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL without a trailing slash
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = env::var(env_vars::API_URL).unwrap_or_else(|_| defaults::API_URL.to_string());

        let state_dir = env::var(env_vars::STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_state_dir());

        let http_timeout = match env::var(env_vars::HTTP_TIMEOUT_SECS) {
            Ok(raw) => parse_timeout_secs(&raw),
            Err(_) => defaults::HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url: normalize_base_url(&raw_url)?,
            state_dir,
            http_timeout: Duration::from_secs(http_timeout),
        })
    }

    /// Config pointing at an explicit API, used by tests and embedders.
    pub fn new(api_base_url: &str, state_dir: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url(api_base_url)?,
            state_dir,
            http_timeout: Duration::from_secs(defaults::HTTP_TIMEOUT_SECS),
        })
    }
}

/// `<platform data dir>/notes-client`, or `./.notes-client` when the platform has none
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(defaults::STATE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", defaults::STATE_DIR_NAME)))
}

/// Seconds from `NOTES_HTTP_TIMEOUT_SECS`. Zero or garbage falls back to the default.
fn parse_timeout_secs(raw: &str) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        Ok(_) => {
            log::warn!(
                "Ignoring {}=0, using {}s",
                env_vars::HTTP_TIMEOUT_SECS,
                defaults::HTTP_TIMEOUT_SECS
            );
            defaults::HTTP_TIMEOUT_SECS
        }
        Err(e) => {
            log::warn!(
                "Ignoring {}={:?} ({}), using {}s",
                env_vars::HTTP_TIMEOUT_SECS,
                raw,
                e,
                defaults::HTTP_TIMEOUT_SECS
            );
            defaults::HTTP_TIMEOUT_SECS
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        var: env_vars::API_URL,
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ConfigError::UnsupportedScheme {
                var: env_vars::API_URL,
                scheme: other.to_string(),
            });
        }
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

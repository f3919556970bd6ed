//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_STORE_PATH: &str = ".elimubuddy/session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub store_path: PathBuf,
    pub timeouts: RequestTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            timeouts: RequestTimeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `ELIMU_API_URL`: backend base URL, default `http://localhost:5000/api`
    /// - `ELIMU_STORE_PATH`: session store file, default `.elimubuddy/session.json`
    /// - `ELIMU_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ELIMU_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is set but is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("ELIMU_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let store_path = std::env::var("ELIMU_STORE_PATH").map_or_else(|_| PathBuf::from(DEFAULT_STORE_PATH), PathBuf::from);
        let timeouts = RequestTimeouts {
            request_secs: env_parse_secs("ELIMU_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_secs("ELIMU_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        Ok(Self { api_url, store_path, timeouts })
    }
}

fn env_parse_secs(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue { var, value: raw }),
    }
}

//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_FILE: &str = ".missionlink-session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin (and optional path prefix) that API paths are joined onto.
    /// Empty means paths are sent as given.
    pub api_base_url: String,
    pub timeouts: Timeouts,
    /// File backing the persisted `token`/`user` entries.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Config pointing at `api_base_url` with default timeouts and session file.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base(&api_base_url.into()),
            timeouts: Timeouts::default(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `MISSIONLINK_API_BASE_URL`: API origin (falls back to `MISSIONLINK_API_URL`,
    ///   then to `http://127.0.0.1:5001`)
    /// - `MISSIONLINK_REQUEST_TIMEOUT_SECS`: default 30
    /// - `MISSIONLINK_CONNECT_TIMEOUT_SECS`: default 10
    /// - `MISSIONLINK_SESSION_FILE`: default `.missionlink-session.json`
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = env_non_empty("MISSIONLINK_API_BASE_URL")
            .or_else(|| env_non_empty("MISSIONLINK_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let timeouts = Timeouts {
            request_secs: env_parse_u64("MISSIONLINK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("MISSIONLINK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_file =
            env_non_empty("MISSIONLINK_SESSION_FILE").map_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE), PathBuf::from);

        Self { api_base_url: normalize_base(&api_base_url), timeouts, session_file }
    }
}

fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

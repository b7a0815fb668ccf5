//! Runtime configuration read from the environment (after `.env` is loaded).

use std::env;
use std::num::NonZeroU64;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_YTDLP_PATH: &str = "yt-dlp";
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    /// Register slash commands to this guild only instead of globally.
    pub guild_id: Option<u64>,
    pub ytdlp_path: String,
    /// Upper bound on opening or stopping a playback session.
    pub session_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let guild_id = match get("GUILD_ID") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<NonZeroU64>()
                    .map_err(|e| ConfigError::Invalid {
                        key: "GUILD_ID",
                        reason: e.to_string(),
                    })?
                    .get(),
            ),
            None => None,
        };

        let ytdlp_path = get("YTDLP_PATH").unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string());

        let session_timeout = match get("SESSION_TIMEOUT") {
            Some(raw) => humantime::parse_duration(raw.trim()).map_err(|e| {
                ConfigError::Invalid {
                    key: "SESSION_TIMEOUT",
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_SESSION_TIMEOUT,
        };

        if session_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SESSION_TIMEOUT",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            discord_token,
            guild_id,
            ytdlp_path,
            session_timeout,
        })
    }
}

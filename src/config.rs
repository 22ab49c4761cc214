//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_DATA_FILE: &str = "hookah_data.json";
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 86_400;

/// Which chat adapter the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    /// stdin/stdout, for local testing.
    Cli,
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "telegram" => Ok(Self::Telegram),
            "cli" => Ok(Self::Cli),
            other => Err(format!("unknown channel '{other}' (expected telegram or cli)")),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Telegram => write!(f, "telegram"),
            Self::Cli => write!(f, "cli"),
        }
    }
}

/// Bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel: ChannelKind,
    /// Chat-platform access token. Always present for the Telegram channel.
    pub telegram_token: Option<SecretString>,
    /// Skip updates queued while the bot was offline.
    pub drop_pending_updates: bool,
    /// Backing file for the user document.
    pub data_file: PathBuf,
    /// Port for the liveness endpoint; disabled when `None`.
    pub health_port: Option<u16>,
    /// Sessions idle longer than this are forgotten.
    pub session_idle_timeout: Duration,
}

impl BotConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let channel = match lookup("TASTE_BOT_CHANNEL") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "TASTE_BOT_CHANNEL".into(),
                message,
            })?,
            None => ChannelKind::Telegram,
        };

        // TELEGRAM_TOKEN is the older name, still set by existing deployments.
        let telegram_token = ["TELEGRAM_BOT_TOKEN", "TELEGRAM_TOKEN"]
            .into_iter()
            .filter_map(&lookup)
            .find(|t| !t.trim().is_empty())
            .map(SecretString::from);
        if channel == ChannelKind::Telegram && telegram_token.is_none() {
            return Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()));
        }

        let drop_pending_updates = match lookup("TELEGRAM_DROP_PENDING") {
            Some(raw) => parse_bool("TELEGRAM_DROP_PENDING", &raw)?,
            None => true,
        };

        let data_file = lookup("TASTE_BOT_DATA_FILE")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE));

        let health_port = lookup("TASTE_BOT_HEALTH_PORT")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "TASTE_BOT_HEALTH_PORT".into(),
                        message: e.to_string(),
                    })
            })
            .transpose()?;

        let idle_secs = lookup("TASTE_BOT_SESSION_IDLE_SECS")
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "TASTE_BOT_SESSION_IDLE_SECS".into(),
                        message: e.to_string(),
                    })
            })
            .transpose()?
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);

        Ok(Self {
            channel,
            telegram_token,
            drop_pending_updates,
            data_file,
            health_port,
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

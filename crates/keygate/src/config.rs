//! Keygate configuration.
//!
//! Every section has a `Default`. [`KeygateConfig::from_env`] layers the
//! `KEYGATE_*` environment variables on top of the defaults and loads the
//! signing secret, which has no default.

use std::path::PathBuf;
use std::time::Duration;

use keygate_core::{CoreError, ServerSecret, SubjectId, MAX_VALID_DAYS};
use keygate_guard::{RateLimitConfig, SweeperConfig};
use thiserror::Error;

use crate::command::DEFAULT_VALID_DAYS;

/// Subject allowed to issue keys.
pub const ENV_ADMIN_ID: &str = "KEYGATE_ADMIN_ID";
/// Hex-encoded 32-byte signing secret.
pub const ENV_SECRET: &str = "KEYGATE_SECRET";
/// Path of the SQLite database.
pub const ENV_DATABASE: &str = "KEYGATE_DATABASE";
/// Failed redemptions allowed per cooldown window.
pub const ENV_MAX_ATTEMPTS: &str = "KEYGATE_MAX_ATTEMPTS";
/// Cooldown window length in seconds.
pub const ENV_COOLDOWN_SECS: &str = "KEYGATE_COOLDOWN_SECS";
/// Security sweep interval in seconds.
pub const ENV_SWEEP_INTERVAL_SECS: &str = "KEYGATE_SWEEP_INTERVAL_SECS";
/// Upper bound on a single storage call, in milliseconds.
pub const ENV_STORAGE_TIMEOUT_MS: &str = "KEYGATE_STORAGE_TIMEOUT_MS";
/// Validity in days for issuance commands that give none.
pub const ENV_DEFAULT_VALID_DAYS: &str = "KEYGATE_DEFAULT_VALID_DAYS";

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} is not set")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    /// The signing secret could not be loaded.
    #[error("signing secret unavailable: {0}")]
    Secret(#[from] CoreError),
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct KeygateConfig {
    /// Who may issue keys. `None` means nobody.
    pub admin: Option<SubjectId>,
    /// Where the SQLite database lives.
    pub database: PathBuf,
    /// Validity used when an issuance request does not give one.
    pub default_valid_days: u32,
    /// Upper bound on any single storage call.
    pub storage_timeout: Duration,
    /// Redemption rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Background sweeper.
    pub sweeper: SweeperConfig,
}

impl Default for KeygateConfig {
    fn default() -> Self {
        Self {
            admin: None,
            database: PathBuf::from("keygate.db"),
            default_valid_days: DEFAULT_VALID_DAYS,
            storage_timeout: Duration::from_secs(5),
            rate_limit: RateLimitConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl KeygateConfig {
    /// Load configuration and the signing secret from the process environment.
    pub fn from_env() -> Result<(Self, ServerSecret), ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration and the signing secret through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<(Self, ServerSecret), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        let admin = get(ENV_ADMIN_ID).ok_or(ConfigError::Missing(ENV_ADMIN_ID))?;
        config.admin = Some(SubjectId::new(admin.trim()));

        let secret = get(ENV_SECRET).ok_or(ConfigError::Missing(ENV_SECRET))?;
        let secret = ServerSecret::from_hex(&secret)?;

        if let Some(path) = get(ENV_DATABASE) {
            config.database = PathBuf::from(path);
        }
        if let Some(raw) = get(ENV_MAX_ATTEMPTS) {
            config.rate_limit.max_attempts = parse_positive(ENV_MAX_ATTEMPTS, &raw)? as u32;
        }
        if let Some(raw) = get(ENV_COOLDOWN_SECS) {
            config.rate_limit.cooldown =
                Duration::from_secs(parse_positive(ENV_COOLDOWN_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_SWEEP_INTERVAL_SECS) {
            config.sweeper.interval =
                Duration::from_secs(parse_positive(ENV_SWEEP_INTERVAL_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_DEFAULT_VALID_DAYS) {
            let days = parse_positive(ENV_DEFAULT_VALID_DAYS, &raw)?;
            if days > MAX_VALID_DAYS as u64 {
                return Err(ConfigError::Invalid {
                    var: ENV_DEFAULT_VALID_DAYS,
                    reason: format!("{days} exceeds {MAX_VALID_DAYS} days"),
                });
            }
            config.default_valid_days = days as u32;
        }
        if let Some(raw) = get(ENV_STORAGE_TIMEOUT_MS) {
            config.storage_timeout =
                Duration::from_millis(parse_positive(ENV_STORAGE_TIMEOUT_MS, &raw)?);
        }

        Ok((config, secret))
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("{e}"),
    })?;
    if value == 0 || value > u32::MAX as u64 {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("{value} is out of range"),
        });
    }
    Ok(value)
}

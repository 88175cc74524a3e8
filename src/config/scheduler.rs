//! Scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{
    SchedulerLimits, DEFAULT_EVENT_TIMEOUT, DEFAULT_IDLE_DELAY, DEFAULT_UPDATE_INTERVAL,
    MAX_UPDATE_INTERVAL,
};

/// Environment variable overriding [`SchedulerConfig::event_timeout_secs`].
pub const ENV_EVENT_TIMEOUT_SECS: &str = "EVENT_QUEUE_EVENT_TIMEOUT_SECS";
/// Environment variable overriding [`SchedulerConfig::idle_delay_secs`].
pub const ENV_IDLE_DELAY_SECS: &str = "EVENT_QUEUE_IDLE_DELAY_SECS";
/// Environment variable overriding [`SchedulerConfig::update_interval_secs`].
pub const ENV_UPDATE_INTERVAL_SECS: &str = "EVENT_QUEUE_UPDATE_INTERVAL_SECS";

/// Timing configuration for one worker's event queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Default event deadline in seconds.
    pub event_timeout_secs: u64,
    /// Quiet period before the worker counts as idle, in seconds. Zero fires
    /// idle on the first tick after the worker goes quiet.
    pub idle_delay_secs: u64,
    /// Period of the status update timer in seconds.
    pub update_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_timeout_secs: DEFAULT_EVENT_TIMEOUT.as_secs(),
            idle_delay_secs: DEFAULT_IDLE_DELAY.as_secs(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL.as_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_timeout_secs == 0 {
            return Err("event_timeout_secs must be greater than 0".into());
        }
        if self.update_interval_secs == 0 {
            return Err("update_interval_secs must be greater than 0".into());
        }
        if self.update_interval_secs > MAX_UPDATE_INTERVAL.as_secs() {
            return Err(format!(
                "update_interval_secs must be at most {}",
                MAX_UPDATE_INTERVAL.as_secs()
            ));
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the process environment, after loading a
    /// `.env` file if one is present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let fields = [
            (ENV_EVENT_TIMEOUT_SECS, &mut cfg.event_timeout_secs),
            (ENV_IDLE_DELAY_SECS, &mut cfg.idle_delay_secs),
            (ENV_UPDATE_INTERVAL_SECS, &mut cfg.update_interval_secs),
        ];
        for (key, slot) in fields {
            if let Some(raw) = lookup(key) {
                *slot = raw
                    .trim()
                    .parse()
                    .map_err(|e| format!("{key}: invalid value `{raw}`: {e}"))?;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Timing values for the scheduler.
    pub const fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            event_timeout: Duration::from_secs(self.event_timeout_secs),
            idle_delay: Duration::from_secs(self.idle_delay_secs),
            update_interval: Duration::from_secs(self.update_interval_secs),
        }
    }
}

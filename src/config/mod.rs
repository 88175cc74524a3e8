//! Configuration models for scheduler timeouts.

pub mod scheduler;

pub use scheduler::{
    SchedulerConfig, ENV_EVENT_TIMEOUT_SECS, ENV_IDLE_DELAY_SECS, ENV_UPDATE_INTERVAL_SECS,
};

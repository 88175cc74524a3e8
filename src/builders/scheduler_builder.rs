//! Builders to construct schedulers from configuration.

use anyhow::Context;

use crate::config::SchedulerConfig;
use crate::core::{AppResult, PeriodicTimer, Scheduler, SchedulerError};
use crate::util::clock::Clock;

/// Build a scheduler from configuration.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] if `cfg` fails validation.
pub fn build_scheduler<C, T, F>(
    cfg: &SchedulerConfig,
    clock: C,
    timer: T,
    idle_callback: F,
) -> Result<Scheduler, SchedulerError>
where
    C: Clock + 'static,
    T: PeriodicTimer + 'static,
    F: FnMut() + 'static,
{
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;
    let limits = cfg.limits();
    tracing::debug!(?limits, "building event queue");
    Ok(Scheduler::new(limits, clock, timer, idle_callback))
}

/// Build a scheduler from environment configuration (see
/// [`SchedulerConfig::from_env`]).
///
/// # Errors
///
/// Fails if the environment holds an unparsable or invalid value.
pub fn build_scheduler_from_env<C, T, F>(clock: C, timer: T, idle_callback: F) -> AppResult<Scheduler>
where
    C: Clock + 'static,
    T: PeriodicTimer + 'static,
    F: FnMut() + 'static,
{
    let cfg = SchedulerConfig::from_env()
        .map_err(SchedulerError::InvalidConfig)
        .context("loading event queue configuration from the environment")?;
    let scheduler = build_scheduler(&cfg, clock, timer, idle_callback)?;
    Ok(scheduler)
}

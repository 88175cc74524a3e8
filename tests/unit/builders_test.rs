//! Tests for builder modules

use std::time::Duration;

use prometheus_event_queue::builders::{build_scheduler, build_scheduler_from_env};
use prometheus_event_queue::config::SchedulerConfig;
use prometheus_event_queue::core::{Lifecycle, ManualTimer, SchedulerError, SchedulerLimits};
use prometheus_event_queue::util::ManualClock;

#[test]
fn test_build_scheduler_uses_config_limits() {
    let cfg = SchedulerConfig {
        event_timeout_secs: 60,
        idle_delay_secs: 5,
        update_interval_secs: 2,
    };
    let timer = ManualTimer::new();

    let scheduler = build_scheduler(&cfg, ManualClock::new(), timer.clone(), || {}).unwrap();

    assert_eq!(scheduler.limits().event_timeout, Duration::from_secs(60));
    assert_eq!(scheduler.limits().idle_delay, Duration::from_secs(5));
    assert_eq!(scheduler.lifecycle(), Lifecycle::Created);

    scheduler.start().unwrap();
    assert_eq!(timer.interval(), Some(Duration::from_secs(2)));
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let cfg = SchedulerConfig {
        update_interval_secs: 0,
        ..SchedulerConfig::default()
    };

    let err = build_scheduler(&cfg, ManualClock::new(), ManualTimer::new(), || {}).unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidConfig(_)));
}

#[test]
fn test_build_scheduler_from_env_defaults() {
    // Nothing in this test binary sets the EVENT_QUEUE_* variables.
    let scheduler = build_scheduler_from_env(ManualClock::new(), ManualTimer::new(), || {});
    assert!(scheduler.is_ok());
    assert_eq!(scheduler.unwrap().limits(), SchedulerLimits::default());
}

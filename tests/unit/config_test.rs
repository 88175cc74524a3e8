//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use prometheus_event_queue::config::{
    SchedulerConfig, ENV_EVENT_TIMEOUT_SECS, ENV_IDLE_DELAY_SECS, ENV_UPDATE_INTERVAL_SECS,
};
use prometheus_event_queue::core::{SchedulerError, SchedulerLimits, MAX_UPDATE_INTERVAL};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config_matches_documented_constants() {
    let cfg = SchedulerConfig::default();
    assert!(cfg.validate().is_ok());

    let limits = cfg.limits();
    assert_eq!(limits.event_timeout, Duration::from_secs(300));
    assert_eq!(limits.idle_delay, Duration::from_secs(30));
    assert_eq!(limits.update_interval, Duration::from_secs(30));
}

#[test]
fn test_config_invalid_event_timeout() {
    let cfg = SchedulerConfig {
        event_timeout_secs: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_invalid_update_interval() {
    let cfg = SchedulerConfig {
        update_interval_secs: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_zero_idle_delay_allowed() {
    let cfg = SchedulerConfig {
        idle_delay_secs: 0,
        ..SchedulerConfig::default()
    };
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.limits().idle_delay, Duration::ZERO);
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "event_timeout_secs": 60,
        "idle_delay_secs": 10,
        "update_interval_secs": 5
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.event_timeout_secs, 60);
    assert_eq!(cfg.idle_delay_secs, 10);
    assert_eq!(cfg.update_interval_secs, 5);
}

#[test]
fn test_config_from_json_fills_defaults() {
    let cfg = SchedulerConfig::from_json_str(r#"{ "idle_delay_secs": 5 }"#).unwrap();
    assert_eq!(cfg.idle_delay_secs, 5);
    assert_eq!(cfg.event_timeout_secs, 300);
    assert_eq!(cfg.update_interval_secs, 30);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "update_interval_secs": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_from_lookup_overrides() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[
        (ENV_EVENT_TIMEOUT_SECS, "120"),
        (ENV_IDLE_DELAY_SECS, " 15 "),
        (ENV_UPDATE_INTERVAL_SECS, "10"),
    ]))
    .unwrap();

    assert_eq!(
        cfg,
        SchedulerConfig {
            event_timeout_secs: 120,
            idle_delay_secs: 15,
            update_interval_secs: 10,
        }
    );
}

#[test]
fn test_config_from_lookup_keeps_defaults_when_unset() {
    let cfg = SchedulerConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, SchedulerConfig::default());
}

#[test]
fn test_config_from_lookup_rejects_garbage() {
    let err = SchedulerConfig::from_lookup(lookup(&[(ENV_IDLE_DELAY_SECS, "soon")])).unwrap_err();
    assert!(err.contains(ENV_IDLE_DELAY_SECS));
}

#[test]
fn test_config_update_interval_upper_bound() {
    let at_bound = SchedulerConfig {
        update_interval_secs: MAX_UPDATE_INTERVAL.as_secs(),
        ..SchedulerConfig::default()
    };
    assert!(at_bound.validate().is_ok());

    let too_large = SchedulerConfig {
        update_interval_secs: u64::MAX,
        ..SchedulerConfig::default()
    };
    assert!(too_large.validate().is_err());

    let from_env = SchedulerConfig::from_lookup(lookup(&[(
        ENV_UPDATE_INTERVAL_SECS,
        "18446744073709551615",
    )]));
    assert!(from_env.is_err());
}

#[test]
fn test_limits_validate() {
    assert!(SchedulerLimits::default().validate().is_ok());

    let zero_timeout = SchedulerLimits {
        event_timeout: Duration::ZERO,
        ..SchedulerLimits::default()
    };
    assert!(matches!(
        zero_timeout.validate(),
        Err(SchedulerError::InvalidConfig(_))
    ));

    let zero_interval = SchedulerLimits {
        update_interval: Duration::ZERO,
        ..SchedulerLimits::default()
    };
    assert!(zero_interval.validate().is_err());

    let zero_idle = SchedulerLimits {
        idle_delay: Duration::ZERO,
        ..SchedulerLimits::default()
    };
    assert!(zero_idle.validate().is_ok());
}

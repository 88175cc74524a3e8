//! Tests for error types

use prometheus_event_queue::core::{EventStatus, SchedulerError};

#[test]
fn test_terminated_error() {
    let err = SchedulerError::Terminated;
    assert_eq!(format!("{}", err), "scheduler terminated");
}

#[test]
fn test_already_started_error() {
    let err = SchedulerError::AlreadyStarted;
    assert_eq!(format!("{}", err), "scheduler already started");
}

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("update_interval_secs must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: update_interval_secs must be greater than 0"
    );
}

#[test]
fn test_event_status_display_and_serde() {
    assert_eq!(EventStatus::Timeout.to_string(), "timeout");
    assert_eq!(EventStatus::Aborted.to_string(), "aborted");
    assert_eq!(serde_json::to_string(&EventStatus::Timeout).unwrap(), "\"timeout\"");
    let parsed: EventStatus = serde_json::from_str("\"aborted\"").unwrap();
    assert_eq!(parsed, EventStatus::Aborted);
}

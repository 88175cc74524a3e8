//! Tests for utility functions

use std::time::Duration;

use prometheus_event_queue::util::{init_tracing, now_ms, Clock, ManualClock, SystemClock};

#[test]
fn test_manual_clock_advances_only_when_told() {
    let clock = ManualClock::new();
    let start = clock.now();
    assert_eq!(clock.now(), start);

    clock.advance(Duration::from_millis(1500));
    assert_eq!(clock.now().duration_since(start), Duration::from_millis(1500));
}

#[test]
fn test_system_clock_moves_forward() {
    let clock = SystemClock;
    let earlier = clock.now();
    assert!(clock.now() >= earlier);
}

#[test]
fn test_now_ms_is_after_epoch() {
    assert!(now_ms() > 0);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::debug!("tracing initialized twice without panicking");
}

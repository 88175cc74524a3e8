//! Log output for the event queue.
//!
//! Scheduler spans and events are emitted under the
//! `prometheus_event_queue::core::scheduler` and
//! `prometheus_event_queue::runtime::tokio_timer` targets.

/// Print event queue logs to stderr, filtered by `RUST_LOG`
/// (`prometheus_event_queue=debug` shows every event start, end and timeout).
/// Does nothing when the host already installed a subscriber.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .try_init();
}

//! Tokio-backed clock and update timer.
//!
//! The scheduler is single-threaded, so the timer runs its ticks through
//! [`tokio::task::spawn_local`]: it must be armed from inside a
//! [`tokio::task::LocalSet`].

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{PeriodicTimer, TickCallback};
use crate::util::clock::Clock;

/// Clock reading [`tokio::time::Instant`], so paused or auto-advanced tokio test
/// time drives the scheduler too.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Update timer built on [`tokio::time::interval`]. The first tick arrives one
/// interval after arming.
#[derive(Debug, Default)]
pub struct TokioIntervalTimer {
    task: Option<JoinHandle<()>>,
}

impl TokioIntervalTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a tick loop is currently running.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl PeriodicTimer for TokioIntervalTimer {
    /// A zero `interval`, or one too large to schedule, leaves the timer
    /// disarmed.
    fn start(&mut self, interval: Duration, mut on_tick: TickCallback) {
        self.stop();
        if interval.is_zero() {
            tracing::warn!("tokio update timer not armed: zero interval");
            return;
        }
        let Some(first) = tokio::time::Instant::now().checked_add(interval) else {
            tracing::warn!(?interval, "tokio update timer not armed: interval overflows");
            return;
        };
        self.task = Some(tokio::task::spawn_local(async move {
            let mut ticker = tokio::time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        }));
        tracing::debug!(?interval, "tokio update timer armed");
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("tokio update timer stopped");
        }
    }
}

impl Drop for TokioIntervalTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Idle detection state machine.
//!
//! The tracker never looks at the event map or the stay-awake count itself;
//! the scheduler tells it when the worker became quiescent and when it stopped
//! being quiescent, and asks it whether the idle callback is due.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Observable idle phase of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleState {
    /// Events or stay-awake tokens are outstanding.
    Active,
    /// Nothing is outstanding; waiting out the idle delay.
    CountingDown,
    /// The idle callback has fired and no event has started since.
    Fired,
}

/// Idle timestamp, zero-delay override and fired flag.
#[derive(Debug, Clone, Default)]
pub struct IdleTracker {
    idle_since: Option<Instant>,
    zero_delay: bool,
    fired: bool,
}

impl IdleTracker {
    /// Create a tracker in the `Active` phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// An event is starting. Leaves `CountingDown` and, if idle had already
    /// fired, rearms both the fired flag and the zero-delay override.
    pub fn on_event_started(&mut self) {
        self.idle_since = None;
        if self.fired {
            self.fired = false;
            self.zero_delay = false;
        }
    }

    /// Something became outstanding (e.g. a stay-awake token). Cancels any
    /// countdown without touching the fired flag.
    pub fn on_busy(&mut self) {
        self.idle_since = None;
    }

    /// Outstanding counts just reached zero.
    pub fn on_quiescent(&mut self, now: Instant) {
        self.idle_since = Some(now);
    }

    /// Force the next idle decision to skip the delay.
    pub fn set_zero_delay(&mut self) {
        self.zero_delay = true;
    }

    /// Whether the zero-delay override is set.
    pub const fn zero_delay(&self) -> bool {
        self.zero_delay
    }

    /// Whether the idle callback has fired since the last event started.
    pub const fn fired(&self) -> bool {
        self.fired
    }

    /// When the worker became quiescent, if it currently is.
    pub const fn idle_since(&self) -> Option<Instant> {
        self.idle_since
    }

    /// Whether the countdown has started.
    pub const fn is_counting(&self) -> bool {
        self.idle_since.is_some()
    }

    /// Whether a tick at `now` should fire the idle callback.
    pub fn is_due(&self, now: Instant, idle_delay: Duration) -> bool {
        self.idle_since
            .is_some_and(|since| self.zero_delay || now.saturating_duration_since(since) >= idle_delay)
    }

    /// Whether a zero-delay override should fire right now, outside a tick.
    pub const fn is_due_immediately(&self) -> bool {
        self.zero_delay && self.idle_since.is_some()
    }

    /// Record that the idle callback is being invoked.
    pub fn mark_fired(&mut self) {
        self.fired = true;
    }

    /// Current phase.
    pub const fn state(&self) -> IdleState {
        if self.idle_since.is_none() {
            IdleState::Active
        } else if self.fired {
            IdleState::Fired
        } else {
            IdleState::CountingDown
        }
    }
}

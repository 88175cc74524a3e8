//! In-flight event bookkeeping and per-event deadlines.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::EventStatus;

/// Process-wide source of event ids. Ids are never reused, so an id held by a
/// caller can never alias a newer event.
static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of a started event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(u64);

impl EventId {
    fn next() -> Self {
        Self(NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handler invoked at most once when an event is aborted.
pub type AbortCallback = Box<dyn FnOnce(EventId, EventStatus)>;

struct EventInfo {
    /// `None` when `now + timeout` overflows; such an event never expires.
    expiration: Option<Instant>,
    abort: AbortCallback,
}

/// An event removed by [`EventTracker::sweep_expired`]. The caller owes it one
/// `abort(id, EventStatus::Timeout)` call.
pub struct ExpiredEvent {
    /// Id of the expired event.
    pub id: EventId,
    /// Its abort handler, not yet invoked.
    pub abort: AbortCallback,
}

impl ExpiredEvent {
    /// Invoke the abort handler with `status`.
    pub fn abort(self, status: EventStatus) {
        (self.abort)(self.id, status);
    }
}

impl fmt::Debug for ExpiredEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiredEvent").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Map of in-flight events to their deadlines and abort handlers.
#[derive(Default)]
pub struct EventTracker {
    events: HashMap<EventId, EventInfo>,
}

impl EventTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new event expiring at `now + timeout`.
    pub fn start(&mut self, abort: AbortCallback, now: Instant, timeout: Duration) -> EventId {
        let id = EventId::next();
        let expiration = now.checked_add(timeout);
        self.events.insert(id, EventInfo { expiration, abort });
        id
    }

    /// Stop tracking `id`. Returns the handler that will now never run, or
    /// `None` if the id was not in flight.
    pub fn end(&mut self, id: EventId) -> Option<AbortCallback> {
        self.events.remove(&id).map(|info| info.abort)
    }

    /// Whether `id` was started and has not ended.
    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// Number of in-flight events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are in flight.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Ids of in-flight events, ascending.
    pub fn ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self.events.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Earliest deadline among in-flight events.
    pub fn next_expiration(&self) -> Option<Instant> {
        self.events.values().filter_map(|info| info.expiration).min()
    }

    /// Remove every event whose deadline is at or before `now`, in id order.
    pub fn sweep_expired(&mut self, now: Instant) -> Vec<ExpiredEvent> {
        let mut ids: Vec<EventId> = self
            .events
            .iter()
            .filter(|(_, info)| info.expiration.is_some_and(|at| at <= now))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();

        ids.into_iter()
            .filter_map(|id| {
                self.events
                    .remove(&id)
                    .map(|info| ExpiredEvent { id, abort: info.abort })
            })
            .collect()
    }

    /// Abort every remaining event with `status`, in id order.
    pub fn abort_all(self, status: EventStatus) {
        let mut remaining: Vec<(EventId, EventInfo)> = self.events.into_iter().collect();
        remaining.sort_unstable_by_key(|(id, _)| *id);
        for (id, info) in remaining {
            (info.abort)(id, status);
        }
    }
}

impl fmt::Debug for EventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTracker")
            .field("inflight", &self.events.len())
            .finish()
    }
}

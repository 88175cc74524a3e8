//! Audit trail of event queue lifecycle transitions.
//!
//! Attached with [`Scheduler::with_audit`](super::Scheduler::with_audit). Each
//! record names the [`AuditAction`] and, when it concerns one, the event.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::EventId;
use crate::util::clock::now_ms;

/// Lifecycle transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A task was appended to the queue.
    TaskQueued,
    /// A task became an in-flight event.
    EventStarted,
    /// The event owner reported completion.
    EventEnded,
    /// The event outlived its deadline.
    EventTimedOut,
    /// The event was aborted at teardown.
    EventAborted,
    /// The idle callback was invoked.
    IdleFired,
    /// The scheduler was torn down.
    Shutdown,
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Related event, if the action concerns one.
    pub event_id: Option<EventId>,
    /// Action taken.
    pub action: AuditAction,
    /// Wall-clock timestamp in milliseconds.
    pub created_at_ms: u128,
}

/// Receiver for the scheduler's transition records.
///
/// Records are delivered after the scheduler has released its internal state,
/// so an implementation may query the scheduler or drop a stay-awake token.
pub trait AuditSink {
    /// Receive one record.
    fn record(&mut self, event: AuditEvent);
}

/// Audit sink keeping the most recent `max_events` records in memory.
///
/// Clones share the same buffer, so a clone kept outside the scheduler can
/// read what the scheduler recorded.
#[derive(Debug, Clone)]
pub struct InMemoryAuditSink {
    events: Rc<RefCell<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Rc::new(RefCell::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.borrow().iter().cloned().collect()
    }

    /// Actions in recording order.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events.borrow().iter().map(|e| e.action).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.borrow_mut();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event stamped with the current wall-clock time.
pub fn build_audit_event(event_id: Option<EventId>, action: AuditAction) -> AuditEvent {
    AuditEvent {
        event_id,
        action,
        created_at_ms: now_ms(),
    }
}

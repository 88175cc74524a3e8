//! Tests for audit sink

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use prometheus_event_queue::core::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, IdleState, InMemoryAuditSink,
    ManualTimer, Scheduler, SchedulerHandle, SchedulerLimits, StayAwakeToken, Task,
};
use prometheus_event_queue::util::ManualClock;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(build_audit_event(None, AuditAction::TaskQueued));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].event_id, None);
    assert_eq!(events[0].action, AuditAction::TaskQueued);
    assert!(events[0].created_at_ms > 0);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(None, AuditAction::TaskQueued));
    sink.record(build_audit_event(None, AuditAction::IdleFired));
    sink.record(build_audit_event(None, AuditAction::Shutdown));

    assert_eq!(sink.actions(), vec![AuditAction::IdleFired, AuditAction::Shutdown]);
}

#[test]
fn test_audit_sink_clones_share_buffer() {
    let sink = InMemoryAuditSink::new(4);
    let mut writer = sink.clone();
    writer.record(build_audit_event(None, AuditAction::Shutdown));
    assert_eq!(sink.actions(), vec![AuditAction::Shutdown]);
}

#[test]
fn test_scheduler_records_lifecycle_in_order() {
    let clock = ManualClock::new();
    let timer = ManualTimer::new();
    let sink = InMemoryAuditSink::new(64);
    let scheduler = Scheduler::new(SchedulerLimits::default(), clock.clone(), timer.clone(), || {})
        .with_audit(sink.clone());
    scheduler.start().unwrap();

    let first = Rc::new(Cell::new(None));
    let slot = Rc::clone(&first);
    scheduler
        .push_task(Task::normal(move |id| slot.set(Some(id)), |_, _| {}))
        .unwrap();
    let first = first.get().unwrap();
    scheduler.end_event(first);

    scheduler
        .push_task(Task::normal(|_| {}, |_, _| {}).with_timeout(Duration::from_secs(5)))
        .unwrap();
    scheduler.push_task(Task::normal(|_| {}, |_, _| {})).unwrap();
    clock.advance(Duration::from_secs(6));
    timer.fire();
    scheduler.shutdown();

    assert_eq!(
        sink.actions(),
        vec![
            AuditAction::TaskQueued,
            AuditAction::EventStarted,
            AuditAction::EventEnded,
            AuditAction::TaskQueued,
            AuditAction::EventStarted,
            AuditAction::TaskQueued,
            AuditAction::EventStarted,
            AuditAction::EventTimedOut,
            AuditAction::EventAborted,
            AuditAction::Shutdown,
        ]
    );

    let events = sink.events();
    assert_eq!(events[1].event_id, Some(first));
    assert_eq!(events[2].event_id, Some(first));
}

/// Sink that queries the scheduler from inside `record`.
struct QueryingSink {
    handle: SchedulerHandle,
    seen: Rc<RefCell<Vec<(AuditAction, bool)>>>,
}

impl AuditSink for QueryingSink {
    fn record(&mut self, event: AuditEvent) {
        let in_flight = event.event_id.is_some_and(|id| self.handle.has_event(id));
        if event.action == AuditAction::EventEnded {
            // Acquire and release a token from inside the sink.
            drop(self.handle.create_stay_awake_token());
        }
        self.seen.borrow_mut().push((event.action, in_flight));
    }
}

#[test]
fn test_sink_may_reenter_scheduler() {
    let scheduler = Scheduler::new(
        SchedulerLimits::default(),
        ManualClock::new(),
        ManualTimer::new(),
        || {},
    );
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handle = scheduler.handle();
    let scheduler = scheduler.with_audit(QueryingSink {
        handle,
        seen: Rc::clone(&seen),
    });
    scheduler.start().unwrap();

    let started = Rc::new(Cell::new(None));
    let slot = Rc::clone(&started);
    scheduler
        .push_task(Task::normal(move |id| slot.set(Some(id)), |_, _| {}))
        .unwrap();
    let id = started.get().unwrap();
    scheduler.end_event(id);

    assert_eq!(
        *seen.borrow(),
        vec![
            (AuditAction::TaskQueued, false),
            (AuditAction::EventStarted, true),
            (AuditAction::EventEnded, false),
        ]
    );
    assert_eq!(scheduler.stats().stay_awake_tokens, 0);
    assert_eq!(scheduler.idle_state(), IdleState::CountingDown);
}

/// Sink owning a token, so dropping the sink releases it.
struct TokenSink {
    _token: StayAwakeToken,
}

impl AuditSink for TokenSink {
    fn record(&mut self, _event: AuditEvent) {}
}

#[test]
fn test_replacing_sink_releases_its_token() {
    let scheduler = Scheduler::new(
        SchedulerLimits::default(),
        ManualClock::new(),
        ManualTimer::new(),
        || {},
    );
    let token = scheduler.create_stay_awake_token();
    let memory = InMemoryAuditSink::new(8);
    let scheduler = scheduler
        .with_audit(TokenSink { _token: token })
        .with_audit(memory.clone());

    assert_eq!(scheduler.stats().stay_awake_tokens, 0);

    scheduler.push_task(Task::normal(|_| {}, |_, _| {})).unwrap();
    assert_eq!(
        memory.actions(),
        vec![AuditAction::TaskQueued, AuditAction::EventStarted]
    );
}

//! The event queue scheduler.
//!
//! [`Scheduler`] manages two kinds of timeouts for one worker:
//!
//! 1. **Event timeout.** Every started event gets a deadline
//!    (`event_timeout`, or the task's own override). An event still in flight
//!    when a tick observes its deadline is removed and its abort handler runs
//!    with [`EventStatus::Timeout`]. A timeout also forces the idle delay to
//!    zero: a worker with a stuck event may be in a bad state, so it should be
//!    reclaimed as soon as it goes quiet.
//! 2. **Idle timeout.** Once no events are in flight and no
//!    [`StayAwakeToken`] is alive for `idle_delay`, the idle callback runs. It
//!    keeps running on every tick until the next event starts, so the host can
//!    keep reconsidering whether to terminate the worker.
//!
//! Everything happens on one thread. Callbacks are always invoked with no
//! internal borrow held, so a callback may call back into the scheduler (for
//! example to push another task or end its own event).
//!
//! Dropping the [`Scheduler`] shuts it down: every in-flight event is aborted
//! with [`EventStatus::Aborted`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audit::{build_audit_event, AuditAction, AuditEvent, AuditSink};
use super::event_tracker::{EventId, EventTracker};
use super::idle_tracker::{IdleState, IdleTracker};
use super::stay_awake::{StayAwakeRegistry, StayAwakeToken};
use super::task_queue::{Task, TaskQueue};
use super::timer::PeriodicTimer;
use super::{EventStatus, SchedulerError};
use crate::util::clock::Clock;

/// Default deadline for an event since it started.
pub const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default quiet period after which the worker counts as idle.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_secs(30);
/// Default period of the status update timer.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
/// Longest accepted period of the status update timer.
pub const MAX_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Callback invoked while the worker is idle.
pub type IdleCallback = Box<dyn FnMut()>;

/// Timing values for one scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Deadline applied to events whose task carries no custom timeout.
    pub event_timeout: Duration,
    /// Quiet period before the idle callback fires.
    pub idle_delay: Duration,
    /// Period of the status update timer.
    pub update_interval: Duration,
}

impl SchedulerLimits {
    /// Check that the limits can drive a scheduler: a positive event timeout
    /// and an update interval in `(0, MAX_UPDATE_INTERVAL]`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.event_timeout.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "event_timeout must be greater than 0".into(),
            ));
        }
        if self.update_interval.is_zero() {
            return Err(SchedulerError::InvalidConfig(
                "update_interval must be greater than 0".into(),
            ));
        }
        if self.update_interval > MAX_UPDATE_INTERVAL {
            return Err(SchedulerError::InvalidConfig(format!(
                "update_interval must be at most {}s",
                MAX_UPDATE_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            event_timeout: DEFAULT_EVENT_TIMEOUT,
            idle_delay: DEFAULT_IDLE_DELAY,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

/// Lifecycle of a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Built but the update timer is not armed yet.
    Created,
    /// Update timer armed.
    Running,
    /// Shut down; accepts no further work.
    Terminated,
}

/// Point-in-time view of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Events started and not yet ended, timed out or aborted.
    pub inflight_events: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Live stay-awake tokens.
    pub stay_awake_tokens: usize,
    /// Idle phase.
    pub idle_state: IdleState,
    /// Whether the idle callback has fired since the last event started.
    pub did_idle_timeout: bool,
    /// Lifecycle phase.
    pub lifecycle: Lifecycle,
}

struct State {
    limits: SchedulerLimits,
    lifecycle: Lifecycle,
    events: EventTracker,
    idle: IdleTracker,
    stay_awake: StayAwakeRegistry,
    queue: TaskQueue,
    timer: Option<Box<dyn PeriodicTimer>>,
    /// Audit records waiting to be handed to the sink once no borrow is held.
    audit_backlog: Option<Vec<AuditEvent>>,
}

impl State {
    fn is_terminated(&self) -> bool {
        self.lifecycle == Lifecycle::Terminated
    }

    fn has_outstanding(&self) -> bool {
        !self.events.is_empty() || self.stay_awake.live() > 0
    }

    fn record(&mut self, event_id: Option<EventId>, action: AuditAction) {
        if let Some(backlog) = self.audit_backlog.as_mut() {
            backlog.push(build_audit_event(event_id, action));
        }
    }
}

/// State shared between the scheduler, its handles, its tokens and the timer
/// callback. Only the [`Scheduler`] holds a strong reference.
pub(crate) struct Shared {
    state: RefCell<State>,
    clock: Box<dyn Clock>,
    /// Kept outside `state` so it can be taken out and invoked without a borrow.
    idle_callback: RefCell<Option<IdleCallback>>,
    audit: RefCell<Option<Box<dyn AuditSink>>>,
}

impl Shared {
    fn is_terminated(&self) -> bool {
        self.state.borrow().is_terminated()
    }

    // Entry points: run the operation, then deliver its audit records.

    fn start(self: &Rc<Self>) -> Result<(), SchedulerError> {
        let result = self.start_inner();
        self.flush_audit();
        result
    }

    fn push_task(&self, task: Task) -> Result<(), SchedulerError> {
        let result = self.push_task_inner(task);
        self.flush_audit();
        result
    }

    fn end_event(&self, id: EventId) {
        self.end_event_inner(id);
        self.flush_audit();
    }

    pub(crate) fn release_stay_awake(&self) {
        self.release_stay_awake_inner();
        self.flush_audit();
    }

    fn set_idle_delay_to_zero(&self) {
        self.set_idle_delay_to_zero_inner();
        self.flush_audit();
    }

    fn tick(&self) {
        self.tick_inner();
        self.flush_audit();
    }

    fn shutdown(&self) {
        self.shutdown_inner();
        self.flush_audit();
    }

    fn start_inner(self: &Rc<Self>) -> Result<(), SchedulerError> {
        let (mut timer, interval) = {
            let mut state = self.state.borrow_mut();
            match state.lifecycle {
                Lifecycle::Terminated => return Err(SchedulerError::Terminated),
                Lifecycle::Running => return Err(SchedulerError::AlreadyStarted),
                Lifecycle::Created => {}
            }
            state.limits.validate()?;
            state.lifecycle = Lifecycle::Running;
            (state.timer.take(), state.limits.update_interval)
        };

        if let Some(timer) = timer.as_mut() {
            let weak = Rc::downgrade(self);
            timer.start(
                interval,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.tick();
                    }
                }),
            );
        }

        let quiescent = {
            let mut state = self.state.borrow_mut();
            state.timer = timer;
            !state.has_outstanding() && !state.idle.is_counting()
        };
        info!(?interval, "event queue started");
        if quiescent {
            self.on_no_outstanding();
        }
        Ok(())
    }

    fn push_task_inner(&self, task: Task) -> Result<(), SchedulerError> {
        if self.is_terminated() {
            return Err(SchedulerError::Terminated);
        }
        let drain = {
            let mut state = self.state.borrow_mut();
            state.record(None, AuditAction::TaskQueued);
            state.queue.push(task)
        };
        if drain {
            self.process_tasks();
        }
        Ok(())
    }

    fn process_tasks(&self) {
        let entered = self.state.borrow_mut().queue.begin_processing();
        if !entered {
            return;
        }

        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.is_terminated() {
                    None
                } else {
                    state.queue.pop()
                }
            };
            let Some(task) = next else {
                break;
            };
            self.start_task(task);
        }

        let quiescent = {
            let mut state = self.state.borrow_mut();
            state.queue.end_processing();
            !state.has_outstanding()
        };
        // Events that ended during the drain deferred their idle decision to here.
        if quiescent {
            self.on_no_outstanding();
        }
    }

    fn start_task(&self, task: Task) {
        let Task {
            start_callback,
            abort_callback,
            custom_timeout,
            ..
        } = task;

        let (id, timeout) = {
            let mut state = self.state.borrow_mut();
            let timeout = custom_timeout.unwrap_or(state.limits.event_timeout);
            state.idle.on_event_started();
            let id = state.events.start(abort_callback, self.clock.now(), timeout);
            state.record(Some(id), AuditAction::EventStarted);
            (id, timeout)
        };
        debug!(event_id = %id, ?timeout, "event started");
        start_callback(id);
    }

    fn end_event_inner(&self, id: EventId) {
        let removed = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() {
                debug!(event_id = %id, "end_event ignored after shutdown");
                return;
            }
            let removed = state.events.end(id);
            if removed.is_some() {
                state.record(Some(id), AuditAction::EventEnded);
            }
            removed
        };

        let Some(abort) = removed else {
            warn!(event_id = %id, "end_event for an event that is not in flight");
            return;
        };
        drop(abort);
        debug!(event_id = %id, "event ended");

        let quiescent = !self.state.borrow().has_outstanding();
        if quiescent {
            self.on_no_outstanding();
        }
    }

    fn has_event(&self, id: EventId) -> bool {
        self.state.borrow().events.contains(id)
    }

    fn create_stay_awake_token(self: &Rc<Self>) -> StayAwakeToken {
        let mut state = self.state.borrow_mut();
        if state.is_terminated() {
            return StayAwakeToken::inert();
        }
        state.stay_awake.acquire();
        state.idle.on_busy();
        debug!(live = state.stay_awake.live(), "stay-awake token acquired");
        StayAwakeToken::new(Rc::downgrade(self))
    }

    fn release_stay_awake_inner(&self) {
        let quiescent = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() {
                return;
            }
            let last = state.stay_awake.release();
            debug!(live = state.stay_awake.live(), "stay-awake token released");
            last && state.events.is_empty()
        };
        if quiescent {
            self.on_no_outstanding();
        }
    }

    fn set_idle_delay_to_zero_inner(&self) {
        let quiescent = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() {
                return;
            }
            state.idle.set_zero_delay();
            !state.has_outstanding()
        };
        debug!(quiescent, "idle delay set to zero");
        if quiescent {
            self.on_no_outstanding();
        }
    }

    /// Outstanding counts just reached zero: start the idle countdown, and
    /// fire right away if the delay was forced to zero.
    fn on_no_outstanding(&self) {
        let fire = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() || state.has_outstanding() {
                return;
            }
            state.idle.on_quiescent(self.clock.now());
            state.idle.is_due_immediately() && !state.queue.is_processing()
        };
        if fire {
            self.fire_idle();
        }
    }

    fn fire_idle(&self) {
        // An empty slot means we are inside the idle callback already, or shut down.
        let Some(mut callback) = self.idle_callback.borrow_mut().take() else {
            return;
        };
        {
            let mut state = self.state.borrow_mut();
            state.idle.mark_fired();
            state.record(None, AuditAction::IdleFired);
        }
        debug!("idle callback fired");
        callback();

        if !self.is_terminated() {
            let mut slot = self.idle_callback.borrow_mut();
            if slot.is_none() {
                *slot = Some(callback);
                return;
            }
        }
        drop(callback);
    }

    fn tick_inner(&self) {
        let now = self.clock.now();
        let expired = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() {
                return;
            }
            let expired = state.events.sweep_expired(now);
            for event in &expired {
                state.record(Some(event.id), AuditAction::EventTimedOut);
            }
            expired
        };

        if !expired.is_empty() {
            for event in expired {
                warn!(event_id = %event.id, "event timed out");
                event.abort(EventStatus::Timeout);
            }

            let became_quiescent = {
                let mut state = self.state.borrow_mut();
                if state.is_terminated() {
                    return;
                }
                state.idle.set_zero_delay();
                !state.has_outstanding() && !state.idle.is_counting()
            };
            if became_quiescent {
                self.on_no_outstanding();
                return;
            }
        }

        let fire = {
            let state = self.state.borrow();
            !state.is_terminated()
                && !state.has_outstanding()
                && !state.queue.is_processing()
                && state.idle.is_due(now, state.limits.idle_delay)
        };
        if fire {
            self.fire_idle();
        }
    }

    fn shutdown_inner(&self) {
        let (timer, events, queued) = {
            let mut state = self.state.borrow_mut();
            if state.is_terminated() {
                return;
            }
            state.lifecycle = Lifecycle::Terminated;
            state.stay_awake.invalidate();
            for id in state.events.ids() {
                state.record(Some(id), AuditAction::EventAborted);
            }
            state.record(None, AuditAction::Shutdown);
            (
                state.timer.take(),
                std::mem::take(&mut state.events),
                state.queue.take_all(),
            )
        };
        let idle_callback = self.idle_callback.borrow_mut().take();

        if let Some(mut timer) = timer {
            timer.stop();
        }
        info!(
            inflight = events.len(),
            queued = queued.len(),
            "event queue shutting down"
        );
        events.abort_all(EventStatus::Aborted);
        drop(queued);
        drop(idle_callback);
    }

    /// Hand queued audit records to the sink with no state borrow held. A
    /// sink that reenters the scheduler adds to the backlog, which the running
    /// flush drains before it returns.
    fn flush_audit(&self) {
        let Ok(mut slot) = self.audit.try_borrow_mut() else {
            return;
        };
        let Some(sink) = slot.as_mut() else {
            return;
        };
        loop {
            let batch = match self.state.borrow_mut().audit_backlog.as_mut() {
                Some(backlog) if !backlog.is_empty() => std::mem::take(backlog),
                _ => break,
            };
            for event in batch {
                sink.record(event);
            }
        }
    }

    fn stats(&self) -> SchedulerStats {
        let state = self.state.borrow();
        SchedulerStats {
            inflight_events: state.events.len(),
            queued_tasks: state.queue.len(),
            stay_awake_tokens: state.stay_awake.live(),
            idle_state: state.idle.state(),
            did_idle_timeout: state.idle.fired(),
            lifecycle: state.lifecycle,
        }
    }
}

/// Event and idle lifecycle scheduler for a single worker.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// use prometheus_event_queue::core::{ManualTimer, Scheduler, SchedulerLimits, Task};
/// use prometheus_event_queue::util::ManualClock;
///
/// let clock = ManualClock::new();
/// let timer = ManualTimer::new();
/// let idle = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&idle);
///
/// let scheduler = Scheduler::new(
///     SchedulerLimits::default(),
///     clock.clone(),
///     timer.clone(),
///     move || counter.set(counter.get() + 1),
/// );
/// scheduler.start()?;
///
/// let started = Rc::new(Cell::new(None));
/// let slot = Rc::clone(&started);
/// scheduler.push_task(Task::normal(move |id| slot.set(Some(id)), |_, _| {}))?;
/// let id = started.get().expect("task started synchronously");
/// scheduler.end_event(id);
///
/// clock.advance(Duration::from_secs(30));
/// timer.fire();
/// assert_eq!(idle.get(), 1);
/// # Ok::<(), prometheus_event_queue::core::SchedulerError>(())
/// ```
pub struct Scheduler {
    shared: Rc<Shared>,
}

impl Scheduler {
    /// Create a scheduler. Nothing ticks until [`Scheduler::start`] arms `timer`.
    pub fn new(
        limits: SchedulerLimits,
        clock: impl Clock + 'static,
        timer: impl PeriodicTimer + 'static,
        idle_callback: impl FnMut() + 'static,
    ) -> Self {
        let state = State {
            limits,
            lifecycle: Lifecycle::Created,
            events: EventTracker::new(),
            idle: IdleTracker::new(),
            stay_awake: StayAwakeRegistry::new(),
            queue: TaskQueue::new(),
            timer: Some(Box::new(timer)),
            audit_backlog: None,
        };
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(state),
                clock: Box::new(clock),
                idle_callback: RefCell::new(Some(Box::new(idle_callback))),
                audit: RefCell::new(None),
            }),
        }
    }

    /// Attach an audit sink, replacing any earlier one. Records reach the sink
    /// after the operation that produced them has released its internal
    /// state, so the sink may call back into the scheduler.
    #[must_use]
    pub fn with_audit(self, sink: impl AuditSink + 'static) -> Self {
        self.shared
            .state
            .borrow_mut()
            .audit_backlog
            .get_or_insert_with(Vec::new);
        let previous = self.shared.audit.borrow_mut().replace(Box::new(sink));
        drop(previous);
        self
    }

    /// Arm the update timer. If nothing is outstanding and the idle countdown
    /// has not started yet, it starts now.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyStarted`] on a second call,
    /// [`SchedulerError::Terminated`] after shutdown.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.shared.start()
    }

    /// Queue a task. A `Normal` task also drains the queue, starting every
    /// queued task in push order; a `Pending` task waits for the next drain.
    ///
    /// Calling this from inside a start callback only appends; the running
    /// drain picks the task up once the current callback returns.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Terminated`] after shutdown.
    pub fn push_task(&self, task: Task) -> Result<(), SchedulerError> {
        self.shared.push_task(task)
    }

    /// Report that event `id` finished. Unknown or already finished ids are
    /// logged and ignored.
    pub fn end_event(&self, id: EventId) {
        self.shared.end_event(id);
    }

    /// Whether `id` was started and has not finished.
    pub fn has_event(&self, id: EventId) -> bool {
        self.shared.has_event(id)
    }

    /// Create a token that keeps the worker from going idle while alive.
    pub fn create_stay_awake_token(&self) -> StayAwakeToken {
        self.shared.create_stay_awake_token()
    }

    /// Skip the idle delay from now on: fire the idle callback immediately if
    /// nothing is outstanding, otherwise as soon as that becomes true. The
    /// override is cleared when an event starts after idle has fired.
    pub fn set_idle_delay_to_zero(&self) {
        self.shared.set_idle_delay_to_zero();
    }

    /// Whether the idle callback has fired since the last event started.
    pub fn did_idle_timeout(&self) -> bool {
        self.shared.state.borrow().idle.fired()
    }

    /// Current idle phase.
    pub fn idle_state(&self) -> IdleState {
        self.shared.state.borrow().idle.state()
    }

    /// When the current idle countdown started.
    pub fn idle_since(&self) -> Option<Instant> {
        self.shared.state.borrow().idle.idle_since()
    }

    /// Number of in-flight events.
    pub fn inflight_events(&self) -> usize {
        self.shared.state.borrow().events.len()
    }

    /// Number of queued tasks.
    pub fn queued_tasks(&self) -> usize {
        self.shared.state.borrow().queue.len()
    }

    /// Lifecycle phase.
    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.state.borrow().lifecycle
    }

    /// Timing values in use.
    pub fn limits(&self) -> SchedulerLimits {
        self.shared.state.borrow().limits
    }

    /// Snapshot of counters and phases.
    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats()
    }

    /// Run one status update: abort overdue events, then decide on idle.
    /// Normally called by the update timer.
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Tear down: stop the timer, abort in-flight events with
    /// [`EventStatus::Aborted`], drop queued tasks unstarted and make
    /// outstanding tokens inert. Idempotent.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    /// A weak handle for use inside callbacks.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Weak reference to a [`Scheduler`].
///
/// Callbacks stored inside the scheduler should hold this rather than the
/// scheduler itself. Once the scheduler is shut down or dropped, every
/// operation becomes a no-op or returns [`SchedulerError::Terminated`].
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Weak<Shared>,
}

impl SchedulerHandle {
    /// See [`Scheduler::push_task`].
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Terminated`] if the scheduler is gone or shut down.
    pub fn push_task(&self, task: Task) -> Result<(), SchedulerError> {
        match self.shared.upgrade() {
            Some(shared) => shared.push_task(task),
            None => Err(SchedulerError::Terminated),
        }
    }

    /// See [`Scheduler::end_event`].
    pub fn end_event(&self, id: EventId) {
        if let Some(shared) = self.shared.upgrade() {
            shared.end_event(id);
        }
    }

    /// See [`Scheduler::has_event`].
    pub fn has_event(&self, id: EventId) -> bool {
        self.shared.upgrade().is_some_and(|shared| shared.has_event(id))
    }

    /// See [`Scheduler::create_stay_awake_token`].
    pub fn create_stay_awake_token(&self) -> StayAwakeToken {
        self.shared
            .upgrade()
            .map_or_else(StayAwakeToken::inert, |shared| shared.create_stay_awake_token())
    }

    /// See [`Scheduler::set_idle_delay_to_zero`].
    pub fn set_idle_delay_to_zero(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.set_idle_delay_to_zero();
        }
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

//! Core scheduling abstractions: event tracking, idle detection, stay-awake
//! tokens, the task queue and the scheduler that composes them.

pub mod audit;
pub mod error;
pub mod event_tracker;
pub mod idle_tracker;
pub mod scheduler;
pub mod stay_awake;
pub mod task_queue;
pub mod timer;

pub use audit::{build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, EventStatus, SchedulerError};
pub use event_tracker::{AbortCallback, EventId, EventTracker, ExpiredEvent};
pub use idle_tracker::{IdleState, IdleTracker};
pub use scheduler::{
    IdleCallback, Lifecycle, Scheduler, SchedulerHandle, SchedulerLimits, SchedulerStats,
    DEFAULT_EVENT_TIMEOUT, DEFAULT_IDLE_DELAY, DEFAULT_UPDATE_INTERVAL, MAX_UPDATE_INTERVAL,
};
pub use stay_awake::{StayAwakeRegistry, StayAwakeToken};
pub use task_queue::{StartCallback, Task, TaskKind, TaskQueue};
pub use timer::{ManualTimer, PeriodicTimer, TickCallback};

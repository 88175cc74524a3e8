//! # Prometheus Event Queue
//!
//! An event and idle lifecycle scheduler for single-threaded Prometheus workers.
//!
//! A worker receives units of asynchronous work ("events") from its host. This
//! crate tracks which events are in flight, aborts the ones that overstay their
//! deadline, and tells the host when the worker has been quiet long enough to
//! be shut down.
//!
//! ## Core Problem Solved
//!
//! - **Stuck work**: every event has a deadline; overdue events are aborted with
//!   [`core::EventStatus::Timeout`] and the worker is flagged for prompt reclaim
//! - **Idle detection**: once nothing is in flight for `idle_delay`, an idle
//!   callback fires, and keeps firing on every update tick until new work starts
//! - **Liveness**: [`core::StayAwakeToken`]s hold idle detection off while alive
//! - **Deferred work**: `Pending` tasks wait until a `Normal` task proves the
//!   host still wants this worker
//! - **Reentrancy**: start callbacks may push further tasks; the queue drains in
//!   FIFO order without recursing
//!
//! ## Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use prometheus_event_queue::core::{EventStatus, ManualTimer, Scheduler, SchedulerLimits, Task};
//! use prometheus_event_queue::util::ManualClock;
//!
//! let clock = ManualClock::new();
//! let timer = ManualTimer::new();
//! let scheduler = Scheduler::new(SchedulerLimits::default(), clock.clone(), timer.clone(), || {});
//! scheduler.start()?;
//!
//! let aborted = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&aborted);
//! scheduler.push_task(
//!     Task::normal(|_id| {}, move |id, status| log.borrow_mut().push((id, status)))
//!         .with_timeout(Duration::from_secs(5)),
//! )?;
//!
//! clock.advance(Duration::from_secs(6));
//! timer.fire();
//! assert_eq!(aborted.borrow()[0].1, EventStatus::Timeout);
//! assert!(scheduler.did_idle_timeout());
//! # Ok::<(), prometheus_event_queue::core::SchedulerError>(())
//! ```
//!
//! With the `tokio-runtime` feature (default), [`runtime::TokioIntervalTimer`]
//! and [`runtime::TokioClock`] drive the scheduler from a `LocalSet`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: events, idle detection, tokens and tasks.
pub mod core;
/// Configuration models for scheduler timeouts.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters (Tokio) for the clock and update timer.
pub mod runtime;
/// Shared utilities.
pub mod util;

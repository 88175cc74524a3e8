//! Pending work requests and the single-pass processing guard.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AbortCallback, EventId, EventStatus};

/// Callback run when a task's event starts.
pub type StartCallback = Box<dyn FnOnce(EventId)>;

/// How a pushed task interacts with the processing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Appended and immediately triggers a processing pass.
    Normal,
    /// Appended but inert until a later `Normal` task triggers a pass. Used for
    /// work that arrives after the worker reported idle and should only run
    /// once the host shows it still wants this worker.
    Pending,
}

/// A queued request to start an event.
pub struct Task {
    /// Queue behaviour of this task.
    pub kind: TaskKind,
    /// Runs once with the new event id when the task starts.
    pub start_callback: StartCallback,
    /// Runs at most once if the started event is aborted.
    pub abort_callback: AbortCallback,
    /// Per-task event timeout; the scheduler default applies when `None`.
    pub custom_timeout: Option<Duration>,
}

impl Task {
    /// Build a task of the given kind.
    pub fn new(
        kind: TaskKind,
        start: impl FnOnce(EventId) + 'static,
        abort: impl FnOnce(EventId, EventStatus) + 'static,
    ) -> Self {
        Self {
            kind,
            start_callback: Box::new(start),
            abort_callback: Box::new(abort),
            custom_timeout: None,
        }
    }

    /// Build a `Normal` task.
    pub fn normal(
        start: impl FnOnce(EventId) + 'static,
        abort: impl FnOnce(EventId, EventStatus) + 'static,
    ) -> Self {
        Self::new(TaskKind::Normal, start, abort)
    }

    /// Build a `Pending` task.
    pub fn pending(
        start: impl FnOnce(EventId) + 'static,
        abort: impl FnOnce(EventId, EventStatus) + 'static,
    ) -> Self {
        Self::new(TaskKind::Pending, start, abort)
    }

    /// Override the event timeout for this task.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.custom_timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("custom_timeout", &self.custom_timeout)
            .finish_non_exhaustive()
    }
}

/// FIFO of tasks plus the flag marking a drain in progress.
///
/// The guard is a plain flag: everything runs on one thread, and the only
/// reentrancy is a start callback pushing more work while the loop is running.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
    processing: bool,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `task` and report whether the caller should run a drain: only a
    /// `Normal` task pushed while no drain is running does.
    pub fn push(&mut self, task: Task) -> bool {
        let kind = task.kind;
        self.tasks.push_back(task);
        kind == TaskKind::Normal && !self.processing
    }

    /// Take the guard. Returns `false` if a drain is already running.
    pub fn begin_processing(&mut self) -> bool {
        if self.processing {
            return false;
        }
        self.processing = true;
        true
    }

    /// Release the guard.
    pub fn end_processing(&mut self) {
        self.processing = false;
    }

    /// Whether a drain is running.
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// Pop the oldest task.
    pub fn pop(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Remove every queued task without running it.
    pub fn take_all(&mut self) -> VecDeque<Task> {
        std::mem::take(&mut self.tasks)
    }
}

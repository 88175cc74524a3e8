//! Stay-awake tokens: liveness handles that hold off idle detection.

use std::fmt;
use std::rc::Weak;

use super::scheduler::Shared;

/// Count of live stay-awake tokens.
#[derive(Debug, Default)]
pub struct StayAwakeRegistry {
    live: usize,
}

impl StayAwakeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new live token.
    pub fn acquire(&mut self) {
        self.live += 1;
    }

    /// Unregister a token. Returns `true` when this was the last live one.
    pub fn release(&mut self) -> bool {
        debug_assert!(self.live > 0, "stay-awake release without acquire");
        self.live = self.live.saturating_sub(1);
        self.live == 0
    }

    /// Number of live tokens.
    pub const fn live(&self) -> usize {
        self.live
    }

    /// Forget every live token; used at teardown.
    pub fn invalidate(&mut self) {
        self.live = 0;
    }
}

/// Keeps the scheduler from going idle while alive.
///
/// Dropping the token releases it. After the scheduler has shut down (or been
/// dropped) the token is inert and dropping it does nothing.
#[must_use = "dropping a stay-awake token releases it immediately"]
pub struct StayAwakeToken {
    scheduler: Weak<Shared>,
}

impl StayAwakeToken {
    pub(crate) fn new(scheduler: Weak<Shared>) -> Self {
        Self { scheduler }
    }

    /// A token that was never registered, issued after teardown.
    pub(crate) fn inert() -> Self {
        Self {
            scheduler: Weak::new(),
        }
    }

    /// Release the token now. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for StayAwakeToken {
    fn drop(&mut self) {
        if let Some(shared) = self.scheduler.upgrade() {
            shared.release_stay_awake();
        }
    }
}

impl fmt::Debug for StayAwakeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StayAwakeToken")
            .field("bound", &(self.scheduler.strong_count() > 0))
            .finish()
    }
}

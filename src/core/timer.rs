//! Periodic timer seam driving [`Scheduler::tick`](super::Scheduler::tick).

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Callback a timer runs on every tick.
pub type TickCallback = Box<dyn FnMut()>;

/// A repeating timer delivering ticks on the scheduler's thread.
pub trait PeriodicTimer {
    /// Arm the timer to call `on_tick` every `interval`, replacing any previous
    /// callback.
    fn start(&mut self, interval: Duration, on_tick: TickCallback);
    /// Disarm the timer. No further ticks are delivered.
    fn stop(&mut self);
}

#[derive(Default)]
struct ManualTimerState {
    interval: Option<Duration>,
    on_tick: Option<TickCallback>,
    /// Bumped on every start/stop so a tick in progress can tell whether it
    /// was rearmed or disarmed while running.
    generation: u64,
}

/// Timer that ticks only when [`ManualTimer::fire`] is called.
///
/// Clones share state: hand one to the scheduler and keep one to fire.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Rc<RefCell<ManualTimerState>>,
}

impl ManualTimer {
    /// Create a disarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one tick. Returns `false` if the timer is not armed.
    pub fn fire(&self) -> bool {
        let (callback, generation) = {
            let mut state = self.state.borrow_mut();
            (state.on_tick.take(), state.generation)
        };
        let Some(mut callback) = callback else {
            return false;
        };

        callback();

        let mut state = self.state.borrow_mut();
        if state.generation == generation && state.on_tick.is_none() {
            state.on_tick = Some(callback);
        } else {
            drop(state);
            drop(callback);
        }
        true
    }

    /// Whether a callback is armed.
    pub fn is_armed(&self) -> bool {
        self.state.borrow().interval.is_some()
    }

    /// The interval the timer was armed with.
    pub fn interval(&self) -> Option<Duration> {
        self.state.borrow().interval
    }
}

impl PeriodicTimer for ManualTimer {
    fn start(&mut self, interval: Duration, on_tick: TickCallback) {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.interval = Some(interval);
            state.on_tick.replace(on_tick)
        };
        drop(previous);
    }

    fn stop(&mut self) {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.interval = None;
            state.on_tick.take()
        };
        drop(previous);
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer")
            .field("interval", &self.interval())
            .finish()
    }
}

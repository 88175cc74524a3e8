//! Runtime adapters driving the scheduler on an async runtime.

#[cfg(feature = "tokio-runtime")]
pub mod tokio_timer;

#[cfg(feature = "tokio-runtime")]
pub use tokio_timer::{TokioClock, TokioIntervalTimer};

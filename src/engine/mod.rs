//! Progress engine module
//!
//! The engine owns the single countdown slot, derives progress from elapsed
//! monotonic time and publishes progress and completion events.

pub mod progress_engine;

// Re-export main types
pub use progress_engine::{ProgressEngine, DEFAULT_SAMPLE_INTERVAL, MAX_SAMPLE_INTERVAL};
pub(crate) use progress_engine::EngineCore;

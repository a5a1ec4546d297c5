//! Menubar Timer - a countdown progress engine for status-bar timers
//!
//! This library provides the progress engine that turns a requested duration
//! into a restartable, cancellable progress signal with an exactly-once
//! completion event, plus a local HTTP control surface around it.

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use engine::ProgressEngine;
pub use error::EngineError;
pub use state::{AppState, RunHandle, RunState, TimerEvent};
pub use api::create_router;
pub use utils::signals::shutdown_signal;

//! State management module
//!
//! This module contains the timer data model and the application state shared
//! by the HTTP handlers and background tasks.

pub mod app_state;
pub mod timer_run;

// Re-export main types
pub use app_state::AppState;
pub use timer_run::{
    duration_from_minutes, duration_from_seconds, minutes_to_duration, ProgressUpdate, RunHandle,
    RunState, TimerEvent, TimerRun, TimerSnapshot,
};

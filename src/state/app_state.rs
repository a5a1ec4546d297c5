//! Main application state management

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    engine::ProgressEngine,
    error::EngineError,
    state::{duration_from_minutes, minutes_to_duration, RunHandle},
};

/// Application state shared by the HTTP handlers and background tasks
#[derive(Debug)]
pub struct AppState {
    /// The single countdown engine for this process
    pub engine: ProgressEngine,
    /// Preset durations in minutes
    pub presets: Vec<u64>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    last_action: Mutex<Option<(String, DateTime<Utc>)>>,
}

impl AppState {
    /// Create a new AppState around an engine
    pub fn new(engine: ProgressEngine, presets: Vec<u64>, port: u16, host: String) -> Self {
        Self {
            engine,
            presets,
            start_time: Instant::now(),
            port,
            host,
            last_action: Mutex::new(None),
        }
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some((action.to_string(), Utc::now()));
        }
    }

    /// Start a run and remember it as the last action
    pub fn start_timer(&self, duration: Duration) -> Result<RunHandle, EngineError> {
        let handle = self.engine.start(duration)?;
        info!("Timer started for {}s (generation {})", duration.as_secs(), handle.generation());
        self.record_action("start");
        Ok(handle)
    }

    /// Start a run from a whole number of minutes
    pub fn start_minutes(&self, minutes: i64) -> Result<RunHandle, EngineError> {
        self.start_timer(duration_from_minutes(minutes)?)
    }

    /// Start the preset at `index`, or `None` if there is no such preset
    pub fn start_preset(&self, index: usize) -> Option<Result<RunHandle, EngineError>> {
        let minutes = *self.presets.get(index)?;
        Some(minutes_to_duration(minutes).and_then(|duration| self.start_timer(duration)))
    }

    /// Cancel the running timer, returning whether one was running
    pub fn cancel_timer(&self) -> bool {
        let cancelled = self.engine.cancel();
        self.record_action("cancel");
        cancelled
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        match self.last_action.lock().ok().and_then(|a| a.clone()) {
            Some((action, time)) => (Some(action), Some(time)),
            None => (None, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RunState;

    fn app_state() -> AppState {
        AppState::new(ProgressEngine::new(), vec![5, 15, 25, 50], 20554, "127.0.0.1".into())
    }

    #[tokio::test(start_paused = true)]
    async fn preset_starts_with_preset_duration() {
        let state = app_state();

        let handle = state.start_preset(2).unwrap().unwrap();

        assert_eq!(handle.total_duration(), Duration::from_secs(25 * 60));
        assert_eq!(state.engine.state(), RunState::Running);
        assert_eq!(state.get_last_action().0.as_deref(), Some("start"));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_preset_is_none() {
        let state = app_state();
        assert!(state.start_preset(4).is_none());
        assert_eq!(state.engine.state(), RunState::Idle);
        assert_eq!(state.get_last_action(), (None, None));
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_preset_is_rejected() {
        let presets = vec![u64::MAX / 10];
        let state = AppState::new(ProgressEngine::new(), presets, 20554, "127.0.0.1".into());

        let err = state.start_preset(0).unwrap().unwrap_err();

        assert!(err.is_invalid_duration());
        assert_eq!(state.engine.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_minutes_leave_engine_untouched() {
        let state = app_state();
        assert!(state.start_minutes(-5).unwrap_err().is_invalid_duration());
        assert_eq!(state.engine.current_generation(), 0);
    }

    #[test]
    fn uptime_starts_in_seconds() {
        assert!(app_state().get_uptime().ends_with('s'));
    }
}

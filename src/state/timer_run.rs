//! Timer run structure and progress arithmetic

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::EngineError;

/// Lifecycle state of the most recent run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// One countdown, identified by its generation
#[derive(Debug, Clone)]
pub struct TimerRun {
    pub generation: u64,
    pub total_duration: Duration,
    /// Monotonic reference all progress is derived from
    pub start_reference: Instant,
    /// Wall-clock start, informational only
    pub started_at: DateTime<Utc>,
    pub state: RunState,
    /// Last progress value accepted for this generation
    pub progress: f64,
}

impl TimerRun {
    /// Create a running timer that starts at `now`
    pub fn start(generation: u64, total_duration: Duration, now: Instant) -> Self {
        Self {
            generation,
            total_duration,
            start_reference: now,
            started_at: Utc::now(),
            state: RunState::Running,
            progress: 0.0,
        }
    }

    /// Progress at `now`, clamped to [0, 1] and never below the last accepted value.
    /// Runs that are no longer running report their frozen progress.
    pub fn progress_at(&self, now: Instant) -> f64 {
        if self.state != RunState::Running {
            return self.progress;
        }
        let elapsed = now.saturating_duration_since(self.start_reference);
        let fraction = (elapsed.as_secs_f64() / self.total_duration.as_secs_f64()).min(1.0);
        fraction.max(self.progress)
    }

    /// Time left before completion at `now`
    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.state {
            RunState::Running => {
                let elapsed = now.saturating_duration_since(self.start_reference);
                self.total_duration.saturating_sub(elapsed)
            }
            RunState::Completed => Duration::ZERO,
            RunState::Cancelled | RunState::Idle => {
                self.total_duration.mul_f64(1.0 - self.progress)
            }
        }
    }

    /// Handle identifying this run
    pub fn handle(&self) -> RunHandle {
        RunHandle {
            generation: self.generation,
            total_duration: self.total_duration,
        }
    }
}

/// Returned by `start`; correlates later events with the run that produced them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHandle {
    generation: u64,
    total_duration: Duration,
}

impl RunHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    /// Whether an event tagged with `generation` belongs to this run
    pub fn owns(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

/// Latest sampled progress, tagged with the generation that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub generation: u64,
    pub progress: f64,
}

impl ProgressUpdate {
    /// Initial value before any run has started
    pub fn idle() -> Self {
        Self {
            generation: 0,
            progress: 0.0,
        }
    }
}

/// Events published by the engine, in acceptance order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    Started { generation: u64, total_seconds: f64 },
    Progress { generation: u64, progress: f64 },
    Cancelled { generation: u64, progress: f64 },
    Completed { generation: u64 },
}

impl TimerEvent {
    pub fn generation(&self) -> u64 {
        match self {
            TimerEvent::Started { generation, .. }
            | TimerEvent::Progress { generation, .. }
            | TimerEvent::Cancelled { generation, .. }
            | TimerEvent::Completed { generation } => *generation,
        }
    }

    /// Whether this event changes run state, as opposed to a progress sample
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, TimerEvent::Progress { .. })
    }

    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Started { .. } => "started",
            TimerEvent::Progress { .. } => "progress",
            TimerEvent::Cancelled { .. } => "cancelled",
            TimerEvent::Completed { .. } => "completed",
        }
    }
}

/// Point-in-time view of the engine for status reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub generation: u64,
    pub state: RunState,
    pub progress: f64,
    pub total_seconds: Option<f64>,
    pub remaining_seconds: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerSnapshot {
    /// Snapshot of an engine that has never started a run
    pub fn idle() -> Self {
        Self {
            generation: 0,
            state: RunState::Idle,
            progress: 0.0,
            total_seconds: None,
            remaining_seconds: None,
            started_at: None,
        }
    }

    pub fn from_run(run: &TimerRun, now: Instant) -> Self {
        Self {
            generation: run.generation,
            state: run.state,
            progress: run.progress_at(now),
            total_seconds: Some(run.total_duration.as_secs_f64()),
            remaining_seconds: Some(run.remaining_at(now).as_secs()),
            started_at: Some(run.started_at),
        }
    }
}

/// Validate a user-supplied duration in whole minutes
pub fn duration_from_minutes(minutes: i64) -> Result<Duration, EngineError> {
    if minutes <= 0 {
        return Err(EngineError::InvalidDuration(format!("{} minutes", minutes)));
    }
    minutes_to_duration(minutes as u64)
}

/// Convert whole minutes to a duration, rejecting values whose seconds overflow
pub fn minutes_to_duration(minutes: u64) -> Result<Duration, EngineError> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| EngineError::InvalidDuration(format!("{} minutes is too long", minutes)))
}

/// Validate a user-supplied duration in whole seconds
pub fn duration_from_seconds(seconds: i64) -> Result<Duration, EngineError> {
    if seconds <= 0 {
        return Err(EngineError::InvalidDuration(format!("{} seconds", seconds)));
    }
    Ok(Duration::from_secs(seconds as u64))
}

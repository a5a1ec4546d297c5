//! Progress engine: owns the single run slot and publishes its events

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info};

use crate::{
    error::EngineError,
    state::{ProgressUpdate, RunHandle, RunState, TimerEvent, TimerRun, TimerSnapshot},
    tasks::sampler_task,
};

/// Sampling cadence used when none is configured
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Slowest cadence that still counts as continuous progress
pub const MAX_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 256;

// Lifecycle events are a few per run, so this only fills if a subscriber
// ignores dozens of restarts.
const LIFECYCLE_CHANNEL_CAPACITY: usize = 64;

/// The mutable run slot. Only the engine writes it.
#[derive(Debug, Default)]
pub(crate) struct RunSlot {
    pub generation: u64,
    pub run: Option<TimerRun>,
    pub sampler: Option<JoinHandle<()>>,
}

/// State shared between the engine handle and its sampler task
#[derive(Debug)]
pub(crate) struct EngineCore {
    slot: Mutex<RunSlot>,
    progress_tx: watch::Sender<ProgressUpdate>,
    events_tx: broadcast::Sender<TimerEvent>,
    lifecycle_tx: broadcast::Sender<TimerEvent>,
}

impl EngineCore {
    fn new() -> Self {
        let (progress_tx, _) = watch::channel(ProgressUpdate::idle());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (lifecycle_tx, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);

        Self {
            slot: Mutex::new(RunSlot::default()),
            progress_tx,
            events_tx,
            lifecycle_tx,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RunSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Callers hold the slot lock, so delivery order matches acceptance order.
    fn publish(&self, event: TimerEvent) {
        // No subscribers is fine; the slot stays authoritative.
        if event.is_lifecycle() {
            let _ = self.lifecycle_tx.send(event.clone());
        }
        let _ = self.events_tx.send(event);
    }

    fn publish_progress(&self, generation: u64, progress: f64) {
        self.progress_tx.send_replace(ProgressUpdate { generation, progress });
    }

    /// Take one sample for `generation`.
    ///
    /// Returns `false` when the sampler for that generation should stop, either
    /// because the run finished on this tick or because the tick is stale.
    pub(crate) fn sample(&self, generation: u64) -> bool {
        let mut guard = self.lock();
        let slot = &mut *guard;

        if slot.generation != generation {
            debug!(generation, current = slot.generation, "Discarding stale tick");
            return false;
        }

        let run = match slot.run.as_mut() {
            Some(run) if run.state == RunState::Running => run,
            _ => {
                debug!(generation, "Discarding tick for a run that is no longer running");
                return false;
            }
        };

        let progress = run.progress_at(Instant::now());
        run.progress = progress;
        self.publish_progress(generation, progress);
        self.publish(TimerEvent::Progress { generation, progress });

        if progress < 1.0 {
            return true;
        }

        run.state = RunState::Completed;
        // Dropping our own handle detaches it; the task returns right after this.
        slot.sampler = None;
        info!(generation, "Timer completed");
        self.publish(TimerEvent::Completed { generation });
        false
    }

    /// Move the current run to `Cancelled` if it is running
    fn cancel_running(&self, slot: &mut RunSlot) -> bool {
        let Some(run) = slot.run.as_mut() else {
            return false;
        };
        if run.state != RunState::Running {
            return false;
        }

        let progress = run.progress_at(Instant::now());
        run.progress = progress;
        run.state = RunState::Cancelled;
        let generation = run.generation;

        if let Some(sampler) = slot.sampler.take() {
            sampler.abort();
        }

        info!(generation, progress, "Timer cancelled");
        self.publish(TimerEvent::Cancelled { generation, progress });
        true
    }
}

/// Countdown engine with a single active run.
///
/// `start`, `cancel` and the read methods return immediately. Sampling happens
/// on a spawned tokio task, so `start` must be called from within a runtime.
#[derive(Debug)]
pub struct ProgressEngine {
    core: Arc<EngineCore>,
    sample_interval: Duration,
}

impl ProgressEngine {
    /// Create an engine sampling at the default cadence
    pub fn new() -> Self {
        Self {
            core: Arc::new(EngineCore::new()),
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }

    /// Create an engine sampling every `sample_interval`
    pub fn with_sample_interval(sample_interval: Duration) -> Result<Self, EngineError> {
        if sample_interval.is_zero() || sample_interval > MAX_SAMPLE_INTERVAL {
            return Err(EngineError::InvalidSampleInterval(sample_interval));
        }

        Ok(Self {
            core: Arc::new(EngineCore::new()),
            sample_interval,
        })
    }

    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Start a new run, superseding any running one
    pub fn start(&self, duration: Duration) -> Result<RunHandle, EngineError> {
        if duration.is_zero() {
            return Err(EngineError::InvalidDuration(format!("{:?}", duration)));
        }

        let mut guard = self.core.lock();
        let slot = &mut *guard;

        self.core.cancel_running(slot);

        slot.generation += 1;
        let generation = slot.generation;
        let run = TimerRun::start(generation, duration, Instant::now());
        let handle = run.handle();
        slot.run = Some(run);

        self.core.publish_progress(generation, 0.0);
        self.core.publish(TimerEvent::Started {
            generation,
            total_seconds: duration.as_secs_f64(),
        });

        slot.sampler = Some(tokio::spawn(sampler_task(
            Arc::downgrade(&self.core),
            generation,
            self.sample_interval,
        )));

        info!(generation, seconds = duration.as_secs_f64(), "Timer started");
        Ok(handle)
    }

    /// Cancel the running run. Returns whether anything was cancelled.
    pub fn cancel(&self) -> bool {
        let mut guard = self.core.lock();
        let cancelled = self.core.cancel_running(&mut guard);
        if !cancelled {
            debug!("Cancel requested with no running timer");
        }
        cancelled
    }

    /// Progress of the active or most recent run
    pub fn current_progress(&self) -> f64 {
        let slot = self.core.lock();
        slot.run
            .as_ref()
            .map(|run| run.progress_at(Instant::now()))
            .unwrap_or(0.0)
    }

    /// State of the active or most recent run
    pub fn state(&self) -> RunState {
        let slot = self.core.lock();
        slot.run.as_ref().map(|run| run.state).unwrap_or(RunState::Idle)
    }

    /// Generation of the active or most recent run, 0 before the first start
    pub fn current_generation(&self) -> u64 {
        self.core.lock().generation
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let slot = self.core.lock();
        match slot.run.as_ref() {
            Some(run) => TimerSnapshot::from_run(run, Instant::now()),
            None => TimerSnapshot::idle(),
        }
    }

    /// Subscribe to every event, progress samples included.
    ///
    /// Progress arrives at the sampling cadence, so a receiver that stops
    /// polling for a while lags and loses the oldest events. Consumers that
    /// must see every completion use [`ProgressEngine::subscribe_lifecycle`].
    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.core.events_tx.subscribe()
    }

    /// Subscribe to `Started`, `Cancelled` and `Completed` only
    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<TimerEvent> {
        self.core.lifecycle_tx.subscribe()
    }

    /// Watch the latest sampled progress
    pub fn watch_progress(&self) -> watch::Receiver<ProgressUpdate> {
        self.core.progress_tx.subscribe()
    }
}

impl Default for ProgressEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressEngine {
    fn drop(&mut self) {
        if let Some(sampler) = self.core.lock().sampler.take() {
            sampler.abort();
        }
    }
}

//! Periodic progress sampler background task

use std::{sync::Weak, time::Duration};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::engine::EngineCore;

/// Sample the run tagged `generation` every `period` until it completes, is
/// superseded, or the engine is dropped.
///
/// The first sample is taken one period after the task starts; `start` has
/// already published progress 0.0. Missed ticks are skipped rather than
/// replayed, since each sample reads absolute elapsed time.
pub(crate) async fn sampler_task(core: Weak<EngineCore>, generation: u64, period: Duration) {
    debug!(generation, ?period, "Starting progress sampler");

    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        let Some(engine) = core.upgrade() else {
            debug!(generation, "Engine dropped, stopping sampler");
            break;
        };

        if !engine.sample(generation) {
            break;
        }
    }

    debug!(generation, "Progress sampler stopped");
}

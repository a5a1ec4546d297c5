//! Completion notifier background task

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, warn};

use crate::{services::AlertSink, state::TimerEvent};

/// Background task that turns completion events into user alerts.
///
/// `events` should come from `ProgressEngine::subscribe_lifecycle` and be
/// subscribed before any run can complete. Each alert runs on its own task so
/// a slow alert never holds up the receiver.
pub async fn completion_notifier_task<S>(
    mut events: broadcast::Receiver<TimerEvent>,
    sink: Arc<S>,
) where
    S: AlertSink + 'static,
{
    info!("Starting completion notifier task");

    loop {
        match events.recv().await {
            Ok(TimerEvent::Completed { generation }) => {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    if let Err(e) = sink.alert(generation).await {
                        error!("Failed to deliver completion alert: {}", e);
                    }
                });
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Completion notifier lagged behind engine events");
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("Completion notifier task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Mutex, time::Duration};
    use async_trait::async_trait;

    use crate::engine::ProgressEngine;

    #[derive(Default)]
    struct RecordingSink {
        alerted: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn alert(&self, generation: u64) -> Result<(), String> {
            // Slow enough that several completions overlap.
            tokio::time::sleep(Duration::from_secs(90)).await;
            self.alerted.lock().unwrap().push(generation);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn alerts_once_per_completed_run_only() {
        let engine = ProgressEngine::new();
        let sink = Arc::new(RecordingSink::default());
        let task = tokio::spawn(completion_notifier_task(
            engine.subscribe_lifecycle(),
            Arc::clone(&sink),
        ));

        // 1 completes, 2 is cancelled, 3 is superseded by 4, 4 completes.
        engine.start(Duration::from_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.start(Duration::from_secs(5)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(engine.cancel());
        engine.start(Duration::from_secs(5)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        engine.start(Duration::from_secs(5)).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // A second run finishes while the first alert is still in flight.
        engine.start(Duration::from_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(200)).await;

        let mut alerted = sink.alerted.lock().unwrap().clone();
        alerted.sort_unstable();
        assert_eq!(alerted, vec![1, 4, 5]);

        task.abort();
    }
}

//! Completion alert delivery

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

pub const ALERT_TITLE: &str = "Time's Up!";
pub const ALERT_BODY: &str = "Your timer has completed.";

/// How completion alerts are delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notifier {
    /// Only write the alert to the log
    LogOnly,
    /// Run `program <title> <body>`, e.g. `notify-send`
    Command(String),
}

impl Notifier {
    pub fn from_command(command: Option<String>) -> Self {
        match command {
            Some(program) if !program.trim().is_empty() => Notifier::Command(program),
            _ => Notifier::LogOnly,
        }
    }
}

/// Destination for completion alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, generation: u64) -> Result<(), String>;
}

#[async_trait]
impl AlertSink for Notifier {
    async fn alert(&self, generation: u64) -> Result<(), String> {
        notify_completion(self, generation).await
    }
}

/// Deliver the completion alert for `generation`
pub async fn notify_completion(notifier: &Notifier, generation: u64) -> Result<(), String> {
    info!(generation, "{} {}", ALERT_TITLE, ALERT_BODY);

    let Notifier::Command(program) = notifier else {
        return Ok(());
    };

    debug!("Running notification command: {}", program);
    let output = Command::new(program)
        .args([ALERT_TITLE, ALERT_BODY])
        .output()
        .await
        .map_err(|e| format!("Failed to execute {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} failed: {}", program, stderr.trim()));
    }

    info!("Notification command {} executed", program);
    Ok(())
}

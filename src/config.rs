//! Configuration and CLI argument handling

use std::time::Duration;
use clap::Parser;

use crate::{engine::ProgressEngine, error::EngineError, services::Notifier};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "menubar-timer")]
#[command(about = "A countdown progress engine controlled over a local HTTP API")]
#[command(version = "1.0.0")]
pub struct Config {
    /// Port to bind the control server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Progress sampling interval in milliseconds (1-1000)
    #[arg(long, default_value = "100")]
    pub sample_interval_ms: u64,

    /// Preset durations in minutes, comma separated
    #[arg(long, value_delimiter = ',', default_value = "5,15,25,50",
          value_parser = clap::value_parser!(u64).range(1..))]
    pub presets: Vec<u64>,

    /// Start a timer for this many minutes on launch
    #[arg(short, long)]
    pub start: Option<i64>,

    /// Program run as `<program> <title> <body>` when a timer completes
    #[arg(long)]
    pub notify_command: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Build the engine described by this configuration
    pub fn build_engine(&self) -> Result<ProgressEngine, EngineError> {
        ProgressEngine::with_sample_interval(self.sample_interval())
    }

    pub fn notifier(&self) -> Notifier {
        Notifier::from_command(self.notify_command.clone())
    }
}

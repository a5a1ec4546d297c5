//! Background tasks module
//!
//! This module contains the tasks that run alongside the engine and the HTTP server.

pub mod completion_notifier;
pub mod sampler;

// Re-export main functions
pub use completion_notifier::completion_notifier_task;
pub(crate) use sampler::sampler_task;

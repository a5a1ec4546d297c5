//! Utility functions module
//!
//! This module contains utility functions used by the binary entry point.

pub mod signals;

// Re-export main functions
pub use signals::shutdown_signal;

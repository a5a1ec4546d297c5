//! External service integration module
//!
//! This module contains functions that reach outside the process, such as
//! running the user's completion notification command.

pub mod notification;

// Re-export main functions
pub use notification::*;

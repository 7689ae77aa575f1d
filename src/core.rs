//! Core abstractions for the home gateway.
//!
//! Ambient layer shared by every other module: errors, configuration,
//! and the log sink.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{duration_to_ticks, gesture_ticks, HomeConfig};
pub use error::{HgwError, Result};
pub use logging::{LogHandler, LogLevel};

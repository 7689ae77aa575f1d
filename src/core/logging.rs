//! Log sink abstraction for pin-change and diagnostic notices.
//!
//! The poll cycle reports human-readable notices (raw pin transitions,
//! morse entry traces, delayed-write faults) through a single [`LogHandler`]
//! trait so that embedders decide where messages go. Logging is not part of
//! core correctness; handlers must not fail.
//!
//! # Example
//!
//! ```ignore
//! use hgw::core::logging::{LogHandler, LogLevel};
//!
//! struct Stdout;
//!
//! impl LogHandler for Stdout {
//!     fn on_log(&self, level: LogLevel, message: &str) {
//!         println!("[{}] {}", level, message);
//!     }
//! }
//! ```

use std::sync::Mutex;

/// Severity of a log notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Detailed traces (morse entry rendition, timer internals).
    Debug,
    /// Normal notices (raw pin transitions).
    Info,
    /// Degraded but non-fatal conditions (delayed write failed).
    Warn,
    /// Startup-level failures.
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Sink for gateway log notices.
pub trait LogHandler: Send + Sync {
    /// Handle one notice. Must not block the poll cycle.
    fn on_log(&self, level: LogLevel, message: &str);
}

/// Handler that discards everything.
#[derive(Debug, Default)]
pub struct NullLog;

impl LogHandler for NullLog {
    fn on_log(&self, _level: LogLevel, _message: &str) {}
}

/// Handler forwarding to the `tracing` ecosystem.
#[derive(Debug, Default)]
pub struct TracingLog;

impl LogHandler for TracingLog {
    fn on_log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{}", message),
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
    }
}

/// Handler collecting notices in memory, for inspection in tests and
/// embedders that render their own log views.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all collected notices.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages collected at the given level.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Drop all collected notices.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogHandler for MemoryLog {
    fn on_log(&self, level: LogLevel, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_memory_log_collects() {
        let log = MemoryLog::new();
        log.on_log(LogLevel::Info, "front_drzwi=1");
        log.on_log(LogLevel::Warn, "delayed write failed on pin 12");

        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.messages_at(LogLevel::Info), vec!["front_drzwi=1"]);

        log.clear();
        assert!(log.entries().is_empty());
    }
}

//! Error types for the home gateway.

use thiserror::Error;

/// Errors surfaced by the gateway core.
///
/// Bus faults during the poll cycle are deliberately *not* routed through
/// this type: a failed snapshot read keeps the stale value and a failed
/// output write is reported as `false` to the caller. `HgwError` covers the
/// startup path (configuration, I/O) and bus-trait implementations.
#[derive(Debug, Error)]
pub enum HgwError {
    /// Expander bus transfer failed.
    #[error("bus error: {0}")]
    Bus(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Underlying I/O failure (config file, stdin command stream).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl HgwError {
    /// Create a bus error from any message.
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }

    /// Create a configuration error from any message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using [`HgwError`].
pub type Result<T> = std::result::Result<T, HgwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HgwError::bus("nack on 0x21");
        assert_eq!(err.to_string(), "bus error: nack on 0x21");

        let err = HgwError::config("tick_ms must be > 0");
        assert!(err.to_string().starts_with("configuration error"));
    }
}

//! # Home Gateway (hgw)
//!
//! Periodic GPIO change-detection and event-dispatch core for a house wired
//! through a bank of 8 MCP23017 port expanders (128 logical pins), plus the
//! concrete installation that drives it.
//!
//! ## Features
//!
//! - **Double-buffered snapshots**: the whole bank is read once per tick;
//!   edge detection is an XOR of two snapshots, never a live bus read
//! - **Gesture classification**: per-pin press/release run-length counters
//!   feed double-click, long-click and timing-pattern (morse) detection
//! - **Delayed writes**: one-shot scheduled pin writes, at most one pending
//!   per pin, drained at the start of every tick
//! - **Pluggable seams**: the bus, the clock and the log sink are traits;
//!   the in-memory [`bank::bus::LoopbackBus`] backs the demo binary and the
//!   test suite
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hgw::prelude::*;
//!
//! let config = HomeConfig::default();
//! let day = LocalDaylight::from_config(&config.nightlight)?;
//! let mut home = Home::new(
//!     &config,
//!     Box::new(LoopbackBus::new()),
//!     Box::new(day),
//!     Arc::new(TracingLog),
//! )?;
//!
//! // once per tick period (default 100 ms):
//! home.tick();
//!
//! // external commands, e.g. from an HTTP hook:
//! home.dispatch_event("salon=down:10");
//! ```

pub mod bank;
pub mod clock;
pub mod core;
pub mod devices;
pub mod home;
pub mod router;
pub mod sched;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::bank::bus::{ExpanderBus, LoopbackBus};
    pub use crate::bank::names::PinNames;
    pub use crate::bank::states::PinStates;
    pub use crate::clock::{Daylight, FixedDaylight, LocalDaylight, Nightlight};
    pub use crate::core::config::HomeConfig;
    pub use crate::core::error::{HgwError, Result};
    pub use crate::core::logging::{LogHandler, LogLevel, NullLog, TracingLog};
    pub use crate::devices::{Input, InputKind, Output, RollerShutter, ShutterPins};
    pub use crate::home::Home;
    pub use crate::router::Router;
    pub use crate::sched::{DelayedWrites, TimerService};
}

// Re-export the main entry points at crate root for convenience
pub use crate::core::config::HomeConfig;
pub use crate::core::error::{HgwError, Result};
pub use crate::home::Home;

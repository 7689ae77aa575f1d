//! Expander bank layer: bus access, state snapshots, pin labels.
//!
//! One bank is 8 MCP23017 chips, 128 logical pins, sampled whole once per
//! poll tick into [`PinStates`]. Everything above this layer works on the
//! double-buffered snapshots, never on the bus directly.

pub mod bus;
pub mod names;
pub mod states;

pub use bus::{ExpanderBus, LoopbackBus, EXPANDER_COUNT, PINS_PER_EXPANDER, PIN_COUNT};
pub use names::PinNames;
pub use states::PinStates;

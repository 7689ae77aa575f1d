//! Devices bound to expander pins.
//!
//! Inputs observe the snapshot store and classify gestures; outputs drive
//! pins through the bus and the one-shot timer service; the roller shutter
//! composes two of each behind a safety interlock.

pub mod input;
pub mod output;
pub mod shutter;

pub use input::{Input, InputKind};
pub use output::{Output, DEFAULT_BLINK};
pub use shutter::{RollerShutter, ShutterPins};

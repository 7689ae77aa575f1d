//! Expander bus abstraction.
//!
//! The bank is 8 MCP23017 16-bit port expanders on one I2C bus, addressed
//! 0x20..0x27. The core never touches I2C directly; it goes through the
//! [`ExpanderBus`] trait, which a real deployment implements over its bus
//! driver. [`LoopbackBus`] is the in-memory implementation used by the demo
//! binary and the test suite: output writes are reflected into subsequent
//! register reads, input edges and bus faults are injectable.
//!
//! Bus calls are synchronous; any timeout belongs to the implementation.
//! A read failure during snapshot refresh is non-fatal (the stale value is
//! retained), so implementations should fail fast rather than retry.

use std::collections::HashSet;

use crate::core::error::{HgwError, Result};

/// Number of expander chips in the bank.
pub const EXPANDER_COUNT: usize = 8;

/// Pins per expander chip.
pub const PINS_PER_EXPANDER: usize = 16;

/// Total logical pins across the bank.
pub const PIN_COUNT: usize = EXPANDER_COUNT * PINS_PER_EXPANDER;

/// I2C base address of the first expander; chip `unit` answers at
/// `MCP23017_BASE_ADDRESS + unit`.
pub const MCP23017_BASE_ADDRESS: u8 = 0x20;

/// GPIO register, port A (pins 0..=7 of a chip).
pub const MCP23017_GPIOA: u8 = 0x12;

/// GPIO register, port B (pins 8..=15 of a chip).
pub const MCP23017_GPIOB: u8 = 0x13;

/// Synchronous transfer primitives for the expander bank.
pub trait ExpanderBus {
    /// Read one 8-bit register from the chip at `address`.
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8>;

    /// Drive one output pin. May fail without side effects.
    fn write_output(&mut self, pin: u8, state: bool) -> Result<()>;
}

/// In-memory bus simulator.
///
/// Holds one 16-bit word per chip. Writes land in the same word that reads
/// return, so output state is observable through the regular snapshot
/// refresh, exactly like reading back a chip whose pins are wired through.
#[derive(Debug, Default)]
pub struct LoopbackBus {
    pins: [u16; EXPANDER_COUNT],
    failing_units: HashSet<u8>,
    failing_pins: HashSet<u8>,
    writes: Vec<(u8, bool)>,
}

impl LoopbackBus {
    /// Create a bus with every pin low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated level of a pin, as if the wired device changed it.
    pub fn set_pin(&mut self, pin: u8, state: bool) {
        let unit = (pin as usize / PINS_PER_EXPANDER) % EXPANDER_COUNT;
        let bit = pin as usize % PINS_PER_EXPANDER;
        if state {
            self.pins[unit] |= 1 << bit;
        } else {
            self.pins[unit] &= !(1 << bit);
        }
    }

    /// Current simulated level of a pin.
    pub fn pin(&self, pin: u8) -> bool {
        let unit = (pin as usize / PINS_PER_EXPANDER) % EXPANDER_COUNT;
        let bit = pin as usize % PINS_PER_EXPANDER;
        (self.pins[unit] >> bit) & 1 == 1
    }

    /// Make every register read of the given chip fail.
    pub fn fail_reads_on_unit(&mut self, unit: u8) {
        self.failing_units.insert(unit);
    }

    /// Make every write to the given pin fail.
    pub fn fail_writes_on_pin(&mut self, pin: u8) {
        self.failing_pins.insert(pin);
    }

    /// Clear all injected faults.
    pub fn clear_faults(&mut self) {
        self.failing_units.clear();
        self.failing_pins.clear();
    }

    /// Every successful write so far, in order.
    pub fn writes(&self) -> &[(u8, bool)] {
        &self.writes
    }
}

impl ExpanderBus for LoopbackBus {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8> {
        let unit = address.wrapping_sub(MCP23017_BASE_ADDRESS);
        if unit as usize >= EXPANDER_COUNT {
            return Err(HgwError::bus(format!("no expander at 0x{:02x}", address)));
        }
        if self.failing_units.contains(&unit) {
            return Err(HgwError::bus(format!("read nack from 0x{:02x}", address)));
        }

        let word = self.pins[unit as usize];
        match register {
            MCP23017_GPIOA => Ok((word & 0x00ff) as u8),
            MCP23017_GPIOB => Ok((word >> 8) as u8),
            other => Err(HgwError::bus(format!("unsupported register 0x{:02x}", other))),
        }
    }

    fn write_output(&mut self, pin: u8, state: bool) -> Result<()> {
        if pin as usize >= PIN_COUNT {
            return Err(HgwError::bus(format!("pin {} out of range", pin)));
        }
        if self.failing_pins.contains(&pin) {
            return Err(HgwError::bus(format!("write nack on pin {}", pin)));
        }
        self.set_pin(pin, state);
        self.writes.push((pin, state));
        Ok(())
    }
}

//! Double-buffered pin state snapshots.
//!
//! The status of every pin of every expander chip is read once per poll
//! tick. Two full snapshots are kept, `latest` and `previous`; the slot
//! index alternates each refresh, so edge detection is a single XOR per
//! chip word. A failed register read keeps the stale half-word: a transient
//! bus glitch must not corrupt the comparison history, and the next tick
//! retries naturally.

use crate::bank::bus::{
    ExpanderBus, EXPANDER_COUNT, MCP23017_BASE_ADDRESS, MCP23017_GPIOA, MCP23017_GPIOB,
    PINS_PER_EXPANDER,
};
use crate::bank::names::PinNames;
use crate::core::logging::{LogHandler, LogLevel};

/// Two full snapshots of the expander bank, one 16-bit word per chip.
#[derive(Debug, Clone)]
pub struct PinStates {
    buffers: [[u16; EXPANDER_COUNT]; 2],
    latest: usize,
}

impl Default for PinStates {
    fn default() -> Self {
        Self::new()
    }
}

impl PinStates {
    /// Create a store with both snapshots zeroed.
    pub fn new() -> Self {
        Self {
            buffers: [[0; EXPANDER_COUNT]; 2],
            latest: 0,
        }
    }

    /// Index of the snapshot holding the latest refresh.
    pub fn latest_index(&self) -> usize {
        self.latest
    }

    /// Index of the snapshot holding the previous refresh.
    pub fn previous_index(&self) -> usize {
        (self.latest + 1) % 2
    }

    /// Read the whole bank into the slot about to become `latest`.
    ///
    /// The slot holds the previous-previous snapshot, which is stale, so
    /// it is flipped first and then overwritten half-word by half-word.
    /// Failed reads leave the corresponding half untouched.
    pub fn refresh(&mut self, bus: &mut dyn ExpanderBus) {
        self.latest = self.previous_index();

        for unit in 0..EXPANDER_COUNT {
            let address = MCP23017_BASE_ADDRESS + unit as u8;

            if let Ok(low) = bus.read_register(address, MCP23017_GPIOA) {
                let word = &mut self.buffers[self.latest][unit];
                *word = (*word & 0xff00) | low as u16;
            }
            if let Ok(high) = bus.read_register(address, MCP23017_GPIOB) {
                let word = &mut self.buffers[self.latest][unit];
                *word = (*word & 0x00ff) | ((high as u16) << 8);
            }
        }
    }

    /// Pin bit at an arbitrary historical slot index (taken modulo 2).
    pub fn value_at(&self, pin: u8, index: usize) -> bool {
        let unit = (pin as usize / PINS_PER_EXPANDER) % EXPANDER_COUNT;
        let bit = pin as usize % PINS_PER_EXPANDER;
        (self.buffers[index % 2][unit] >> bit) & 1 == 1
    }

    /// Pin bit from the latest snapshot.
    pub fn current(&self, pin: u8) -> bool {
        self.value_at(pin, self.latest)
    }

    /// Pin bit from the previous snapshot.
    pub fn previous(&self, pin: u8) -> bool {
        self.value_at(pin, self.latest + 1)
    }

    /// Whether the pin changed between the two snapshots.
    pub fn changed(&self, pin: u8) -> bool {
        self.current(pin) != self.previous(pin)
    }

    /// Emit one Info notice per pin that changed since the previous
    /// snapshot, labelled through the name registry.
    ///
    /// Runs once per tick after `refresh`, before device updates, so the
    /// log reflects raw hardware transitions independent of gesture
    /// semantics. Unlabelled pins are skipped.
    pub fn log_changes(&self, names: &PinNames, log: &dyn LogHandler) {
        let latest_index = self.latest;
        let previous_index = self.previous_index();

        for unit in 0..EXPANDER_COUNT {
            // Inputs rarely change; look closer only when the chip word did.
            let latest = self.buffers[latest_index][unit];
            let previous = self.buffers[previous_index][unit];
            let diff = latest ^ previous;
            if diff == 0 {
                continue;
            }

            for bit in 0..PINS_PER_EXPANDER {
                if (diff >> bit) & 1 == 1 {
                    let pin = (unit * PINS_PER_EXPANDER + bit) as u8;
                    if let Some(name) = names.get(pin) {
                        let state = (latest >> bit) & 1;
                        log.on_log(LogLevel::Info, &format!("{}={}", name, state));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::bus::LoopbackBus;
    use crate::core::logging::MemoryLog;

    #[test]
    fn test_buffer_alternation() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();
        assert_eq!(states.latest_index(), 0);

        for n in 1..=5 {
            states.refresh(&mut bus);
            assert_eq!(states.latest_index(), n % 2);
            assert_eq!(states.previous_index(), (n + 1) % 2);
        }
    }

    #[test]
    fn test_diff_exact() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();

        bus.set_pin(4, true);
        bus.set_pin(100, true);
        states.refresh(&mut bus);

        bus.set_pin(4, false);
        bus.set_pin(7, true);
        states.refresh(&mut bus);

        // changed exactly for pins whose bit differs
        assert!(states.changed(4));
        assert!(states.changed(7));
        assert!(!states.changed(100));
        for pin in [0u8, 1, 5, 63, 127] {
            assert!(!states.changed(pin));
        }
        assert!(!states.current(4) && states.previous(4));
        assert!(states.current(7) && !states.previous(7));
    }

    #[test]
    fn test_previous_reads_two_refreshes_back() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();

        bus.set_pin(10, true);
        states.refresh(&mut bus); // snapshot A: pin 10 high
        bus.set_pin(10, false);
        states.refresh(&mut bus); // snapshot B: pin 10 low

        assert!(!states.current(10));
        assert!(states.previous(10));

        bus.set_pin(10, true);
        states.refresh(&mut bus); // snapshot C overwrites A's slot

        assert!(states.current(10));
        assert!(!states.previous(10));
    }

    #[test]
    fn test_read_failure_keeps_stale_value() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();

        bus.set_pin(3, true);
        states.refresh(&mut bus);
        states.refresh(&mut bus);
        assert!(states.current(3) && states.previous(3));

        // chip 0 goes silent while the wire actually drops
        bus.set_pin(3, false);
        bus.fail_reads_on_unit(0);
        states.refresh(&mut bus);

        // stale value retained, no phantom edge
        assert!(states.current(3));
        assert!(!states.changed(3));
    }

    #[test]
    fn test_value_at_wraps_index() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();
        bus.set_pin(2, true);
        states.refresh(&mut bus);

        let latest = states.latest_index();
        assert_eq!(states.value_at(2, latest), states.value_at(2, latest + 2));
    }

    #[test]
    fn test_change_log_labelled_pins_only() {
        let mut bus = LoopbackBus::new();
        let mut states = PinStates::new();
        let mut names = PinNames::new();
        names.register(29, "front_drzwi");
        let log = MemoryLog::new();

        states.refresh(&mut bus);
        bus.set_pin(29, true);
        bus.set_pin(30, true); // unlabelled
        states.refresh(&mut bus);

        states.log_changes(&names, &log);
        assert_eq!(log.messages_at(LogLevel::Info), vec!["front_drzwi=1"]);
    }
}

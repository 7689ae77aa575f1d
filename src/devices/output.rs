//! Actuator bound to one output pin.
//!
//! An [`Output`] carries no local state cache: when an operation needs the
//! current level (toggle, blink) it reads the shared [`PinStates`]
//! snapshot, which the refresh path keeps authoritative. Immediate writes
//! always cancel a pending delayed write for the pin first, so a manual
//! action wins over a previously scheduled one.
//!
//! Write results are booleans: a bus fault is reported to the caller and
//! not retried. Callers that run multi-step sequences (the shutter
//! interlock) use the result to abort midway.

use std::time::Duration;

use crate::bank::bus::ExpanderBus;
use crate::bank::names::PinNames;
use crate::bank::states::PinStates;
use crate::sched::TimerService;

/// Default blink restore time.
pub const DEFAULT_BLINK: Duration = Duration::from_millis(300);

/// One driven output pin.
#[derive(Debug, Clone)]
pub struct Output {
    name: String,
    pin: u8,
}

impl Output {
    /// Create an output and register its label.
    pub fn new(name: impl Into<String>, pin: u8, names: &mut PinNames) -> Self {
        let name = name.into();
        names.register(pin, name.clone());
        Self { name, pin }
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound pin.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Immediate write. Cancels any pending delayed write first.
    pub fn write(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        state: bool,
    ) -> bool {
        timers.cancel(self.pin);
        bus.write_output(self.pin, state).is_ok()
    }

    /// Delayed write: arms a one-shot timer and reports optimistic success
    /// without touching hardware. A zero delay degenerates to an immediate
    /// write.
    pub fn write_delayed(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        state: bool,
        delay: Duration,
    ) -> bool {
        if delay.is_zero() {
            self.write(bus, timers, state)
        } else {
            timers.arm(delay, self.pin, state);
            true
        }
    }

    /// Drive high now, schedule low after `duration`. Returns the result
    /// of the immediate write.
    pub fn pulse(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        duration: Duration,
    ) -> bool {
        timers.cancel(self.pin);
        let ok = bus.write_output(self.pin, true).is_ok();
        timers.arm(duration, self.pin, false);
        ok
    }

    /// Write the complement of the current snapshot level.
    pub fn toggle(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        states: &PinStates,
    ) -> bool {
        self.write(bus, timers, !states.current(self.pin))
    }

    /// Invert now, schedule restoration of the original level after
    /// `duration`.
    pub fn blink(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        states: &PinStates,
        duration: Duration,
    ) {
        let latest = states.current(self.pin);
        let _ = bus.write_output(self.pin, !latest);
        timers.arm(duration, self.pin, latest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::bus::LoopbackBus;
    use crate::sched::{DelayedWrites, DueWrite};

    fn rig() -> (LoopbackBus, DelayedWrites, PinNames) {
        (
            LoopbackBus::new(),
            DelayedWrites::new(Duration::from_millis(100)),
            PinNames::new(),
        )
    }

    #[test]
    fn test_write_cancels_pending() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("dzwonek", 12, &mut names);

        timers.arm(Duration::from_millis(100), 12, true);
        assert!(out.write(&mut bus, &mut timers, false));
        assert_eq!(timers.pending_count(), 0);
        assert!(!bus.pin(12));
    }

    #[test]
    fn test_write_reports_bus_fault() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("dzwonek", 12, &mut names);
        bus.fail_writes_on_pin(12);
        assert!(!out.write(&mut bus, &mut timers, true));
    }

    #[test]
    fn test_delayed_write_arms_only() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("wiata_led", 11, &mut names);

        assert!(out.write_delayed(&mut bus, &mut timers, true, Duration::from_secs(2)));
        assert!(!bus.pin(11)); // hardware untouched
        assert_eq!(timers.pending_for(11), Some(true));
    }

    #[test]
    fn test_delayed_write_zero_is_immediate() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("wiata_led", 11, &mut names);

        assert!(out.write_delayed(&mut bus, &mut timers, true, Duration::ZERO));
        assert!(bus.pin(11));
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn test_pulse() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("furtka_zamek", 119, &mut names);

        assert!(out.pulse(&mut bus, &mut timers, Duration::from_millis(200)));
        assert!(bus.pin(119));
        assert_eq!(timers.pending_for(119), Some(false));

        // 200 ms at a 100 ms tick: due on the second advance
        assert!(timers.advance().is_empty());
        assert_eq!(
            timers.advance(),
            vec![DueWrite { pin: 119, state: false }]
        );
    }

    #[test]
    fn test_toggle_reads_snapshot() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("podjazd_led", 9, &mut names);
        let mut states = PinStates::new();

        bus.set_pin(9, true);
        states.refresh(&mut bus);
        assert!(out.toggle(&mut bus, &mut timers, &states));
        assert!(!bus.pin(9));

        states.refresh(&mut bus);
        assert!(out.toggle(&mut bus, &mut timers, &states));
        assert!(bus.pin(9));
    }

    #[test]
    fn test_blink_restores_original() {
        let (mut bus, mut timers, mut names) = rig();
        let out = Output::new("wiatrolap_led", 7, &mut names);
        let mut states = PinStates::new();

        bus.set_pin(7, true);
        states.refresh(&mut bus);

        out.blink(&mut bus, &mut timers, &states, DEFAULT_BLINK);
        assert!(!bus.pin(7));
        // scheduled to restore the level it had before the blink
        assert_eq!(timers.pending_for(7), Some(true));
    }
}

//! Roller shutter: a safety-interlocked pair of motor outputs with two
//! manual buttons.
//!
//! The hardware enters a vendor configuration mode if both motor wires are
//! energized together, so the interlock is strict: before a direction is
//! driven high the opposing output must be confirmed low, and a failed
//! write aborts the whole move without touching the second output.
//!
//! Timed moves schedule their own deactivation (auto-stop safety); an
//! un-timed move runs until stopped. `stop` is best-effort and never
//! surfaces write failures.

use std::time::Duration;

use crate::bank::bus::ExpanderBus;
use crate::bank::names::PinNames;
use crate::bank::states::PinStates;
use crate::core::config::HomeConfig;
use crate::core::logging::LogHandler;
use crate::devices::input::Input;
use crate::devices::output::Output;
use crate::sched::TimerService;

/// Pin assignment of one shutter.
#[derive(Debug, Clone, Copy)]
pub struct ShutterPins {
    /// Motor wire driving the shutter up.
    pub motor_up: u8,
    /// Motor wire driving the shutter down.
    pub motor_down: u8,
    /// Manual up button.
    pub button_up: u8,
    /// Manual down button.
    pub button_down: u8,
}

/// One safety-interlocked roller shutter.
#[derive(Debug)]
pub struct RollerShutter {
    name: String,
    motor_up: Output,
    motor_down: Output,
    button_up: Input,
    button_down: Input,
    default_move: Duration,
    config_pulse: Duration,
    long_click_min: Duration,
}

impl RollerShutter {
    /// Create a shutter; registers all four pins under derived labels.
    pub fn new(
        name: impl Into<String>,
        pins: ShutterPins,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        let name = name.into();
        Self {
            motor_up: Output::new(format!("{}_motor_up", name), pins.motor_up, names),
            motor_down: Output::new(format!("{}_motor_down", name), pins.motor_down, names),
            button_up: Input::button(format!("{}_button_up", name), pins.button_up, config, names),
            button_down: Input::button(
                format!("{}_button_down", name),
                pins.button_down,
                config,
                names,
            ),
            default_move: config.shutter.move_duration(),
            config_pulse: config.shutter.config_pulse(),
            long_click_min: config.gestures.long_click_min(),
            name,
        }
    }

    /// Shutter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured full-travel move duration.
    pub fn default_move(&self) -> Duration {
        self.default_move
    }

    /// Drive up for `duration`; zero means until stopped.
    ///
    /// Interlock: the down output is forced low first and a failure there
    /// aborts before the up output is touched.
    pub fn move_up(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        duration: Duration,
    ) -> bool {
        if !self.motor_down.write(bus, timers, false) {
            return false;
        }
        if !self.motor_up.write(bus, timers, true) {
            return false;
        }
        if duration.is_zero() {
            true
        } else {
            self.motor_up.write_delayed(bus, timers, false, duration)
        }
    }

    /// Drive down for `duration`; zero means until stopped. Same interlock
    /// as [`move_up`](Self::move_up), mirrored.
    pub fn move_down(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        duration: Duration,
    ) -> bool {
        if !self.motor_up.write(bus, timers, false) {
            return false;
        }
        if !self.motor_down.write(bus, timers, true) {
            return false;
        }
        if duration.is_zero() {
            true
        } else {
            self.motor_down.write_delayed(bus, timers, false, duration)
        }
    }

    /// Force both directions low. Best-effort: individual write failures
    /// are not surfaced.
    pub fn stop(&self, bus: &mut dyn ExpanderBus, timers: &mut dyn TimerService) {
        let _ = self.motor_down.write(bus, timers, false);
        let _ = self.motor_up.write(bus, timers, false);
    }

    /// Dispatch a text command: `config`, `stop`, `down[:seconds]`,
    /// `up[:seconds]`. Anything else is ignored.
    pub fn handle_command(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        args: &str,
    ) {
        if args == "config" {
            // Energize both motors, scheduled off again: enters the
            // hardware configuration mode.
            let _ = self.motor_down.write(bus, timers, true);
            let _ = self
                .motor_down
                .write_delayed(bus, timers, false, self.config_pulse);
            let _ = self.motor_up.write(bus, timers, true);
            let _ = self
                .motor_up
                .write_delayed(bus, timers, false, self.config_pulse);
        } else if args == "stop" {
            self.stop(bus, timers);
        } else if let Some(rest) = args.strip_prefix("down") {
            let duration = parse_move_duration(rest, self.default_move);
            let _ = self.move_down(bus, timers, duration);
        } else if let Some(rest) = args.strip_prefix("up") {
            let duration = parse_move_duration(rest, self.default_move);
            let _ = self.move_up(bus, timers, duration);
        }
    }

    /// Advance both manual buttons' gesture counters.
    pub fn update_buttons(&mut self, states: &PinStates, log: &dyn LogHandler) {
        self.button_up.update(states, log);
        self.button_down.update(states, log);
    }

    /// Manual-button logic, run once per tick.
    ///
    /// Release after a long or double click starts a full-travel move;
    /// a plain short click instead stops (motion interrupt). A fresh press
    /// starts an un-timed move that runs until interrupted.
    pub fn service_buttons(
        &self,
        bus: &mut dyn ExpanderBus,
        timers: &mut dyn TimerService,
        states: &PinStates,
    ) {
        if self.button_up.gets_released(states) {
            if self.button_up.was_long_click(self.long_click_min)
                || self.button_up.was_double_click()
            {
                let _ = self.move_up(bus, timers, self.default_move);
            } else {
                self.stop(bus, timers);
            }
        } else if self.button_up.gets_pressed(states) {
            let _ = self.move_up(bus, timers, Duration::ZERO);
        } else if self.button_down.gets_released(states) {
            if self.button_down.was_long_click(self.long_click_min)
                || self.button_down.was_double_click()
            {
                let _ = self.move_down(bus, timers, self.default_move);
            } else {
                self.stop(bus, timers);
            }
        } else if self.button_down.gets_pressed(states) {
            let _ = self.move_down(bus, timers, Duration::ZERO);
        }
    }

    /// Up motor pin, for assertions and runtime inspection.
    pub fn motor_up_pin(&self) -> u8 {
        self.motor_up.pin()
    }

    /// Down motor pin.
    pub fn motor_down_pin(&self) -> u8 {
        self.motor_down.pin()
    }
}

fn parse_move_duration(rest: &str, default: Duration) -> Duration {
    rest.strip_prefix(':')
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::bus::LoopbackBus;
    use crate::core::logging::NullLog;
    use crate::sched::DelayedWrites;

    const PINS: ShutterPins = ShutterPins {
        motor_up: 114,
        motor_down: 113,
        button_up: 23,
        button_down: 24,
    };

    struct Rig {
        bus: LoopbackBus,
        timers: DelayedWrites,
        states: PinStates,
        shutter: RollerShutter,
    }

    impl Rig {
        fn new() -> Self {
            let config = HomeConfig::default();
            let mut names = PinNames::new();
            let shutter = RollerShutter::new("salon", PINS, &config, &mut names);
            let mut bus = LoopbackBus::new();
            // buttons idle high
            bus.set_pin(PINS.button_up, true);
            bus.set_pin(PINS.button_down, true);
            let mut states = PinStates::new();
            states.refresh(&mut bus);
            states.refresh(&mut bus);
            Self {
                bus,
                timers: DelayedWrites::new(Duration::from_millis(100)),
                states,
                shutter,
            }
        }

        fn tick_buttons(&mut self, up: bool, down: bool) {
            self.bus.set_pin(PINS.button_up, up);
            self.bus.set_pin(PINS.button_down, down);
            self.states.refresh(&mut self.bus);
            self.shutter.update_buttons(&self.states, &NullLog);
            self.shutter
                .service_buttons(&mut self.bus, &mut self.timers, &self.states);
        }
    }

    #[test]
    fn test_move_up_schedules_auto_stop() {
        let mut rig = Rig::new();
        assert!(rig
            .shutter
            .move_up(&mut rig.bus, &mut rig.timers, Duration::from_secs(60)));

        assert!(rig.bus.pin(PINS.motor_up));
        assert!(!rig.bus.pin(PINS.motor_down));
        assert_eq!(rig.timers.pending_for(PINS.motor_up), Some(false));
    }

    #[test]
    fn test_interlock_never_both_high() {
        let mut rig = Rig::new();
        // shutter is moving down
        assert!(rig
            .shutter
            .move_down(&mut rig.bus, &mut rig.timers, Duration::ZERO));
        assert!(rig.bus.pin(PINS.motor_down));

        // the release of the down wire fails: move_up must abort before
        // touching the up wire
        rig.bus.fail_writes_on_pin(PINS.motor_down);
        assert!(!rig
            .shutter
            .move_up(&mut rig.bus, &mut rig.timers, Duration::from_secs(60)));

        assert!(!(rig.bus.pin(PINS.motor_up) && rig.bus.pin(PINS.motor_down)));
        assert!(!rig.bus.pin(PINS.motor_up));
    }

    #[test]
    fn test_stop_is_best_effort() {
        let mut rig = Rig::new();
        let _ = rig
            .shutter
            .move_up(&mut rig.bus, &mut rig.timers, Duration::ZERO);
        rig.bus.fail_writes_on_pin(PINS.motor_down);
        rig.shutter.stop(&mut rig.bus, &mut rig.timers);
        assert!(!rig.bus.pin(PINS.motor_up));
    }

    #[test]
    fn test_command_vocabulary() {
        let mut rig = Rig::new();

        rig.shutter
            .handle_command(&mut rig.bus, &mut rig.timers, "down:10");
        assert!(rig.bus.pin(PINS.motor_down));
        // 10 s at a 100 ms tick
        for _ in 0..99 {
            assert!(rig.timers.advance().is_empty());
        }
        let due = rig.timers.advance();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].pin, PINS.motor_down);

        rig.shutter
            .handle_command(&mut rig.bus, &mut rig.timers, "stop");
        assert!(!rig.bus.pin(PINS.motor_down));

        rig.shutter
            .handle_command(&mut rig.bus, &mut rig.timers, "up");
        assert!(rig.bus.pin(PINS.motor_up));
        assert_eq!(rig.timers.pending_for(PINS.motor_up), Some(false));

        // unknown commands are ignored
        rig.shutter
            .handle_command(&mut rig.bus, &mut rig.timers, "sideways");
    }

    #[test]
    fn test_command_config_pulses_both() {
        let mut rig = Rig::new();
        rig.shutter
            .handle_command(&mut rig.bus, &mut rig.timers, "config");

        assert!(rig.bus.pin(PINS.motor_up));
        assert!(rig.bus.pin(PINS.motor_down));
        assert_eq!(rig.timers.pending_for(PINS.motor_up), Some(false));
        assert_eq!(rig.timers.pending_for(PINS.motor_down), Some(false));
    }

    #[test]
    fn test_button_press_starts_untimed_move() {
        let mut rig = Rig::new();
        rig.tick_buttons(false, true);

        assert!(rig.bus.pin(PINS.motor_up));
        // un-timed: no auto-stop scheduled
        assert_eq!(rig.timers.pending_for(PINS.motor_up), None);
    }

    #[test]
    fn test_short_click_release_stops() {
        let mut rig = Rig::new();
        rig.tick_buttons(false, true); // press starts the move
        rig.tick_buttons(false, true);
        rig.tick_buttons(true, true); // quick release

        assert!(!rig.bus.pin(PINS.motor_up));
        assert!(!rig.bus.pin(PINS.motor_down));
    }

    #[test]
    fn test_long_click_release_runs_full_travel() {
        let mut rig = Rig::new();
        // held for 26 ticks: past the default 2.5 s threshold
        for _ in 0..26 {
            rig.tick_buttons(false, true);
        }
        rig.tick_buttons(true, true);

        assert!(rig.bus.pin(PINS.motor_up));
        assert_eq!(rig.timers.pending_for(PINS.motor_up), Some(false));
    }
}

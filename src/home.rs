//! The household installation.
//!
//! Everything the poll cycle touches lives in one [`Home`] value built at
//! startup: the expander bus, the snapshot store, the delayed-write store,
//! the fixtures (outputs, buttons, doors), the six roller shutters and the
//! command router. No globals; embedders construct a `Home` and call
//! [`Home::tick`] once per poll period and [`Home::dispatch_event`] for
//! external commands.
//!
//! Tick order is fixed: fire due delayed writes, recompute the night-light
//! gate, refresh the pin snapshots, advance the gesture counters, log raw
//! transitions, then run the automation rules and finally the shutter
//! buttons. Rules run in declaration order and later writes win within a
//! tick.
//!
//! The first tick primes the installation: an extra snapshot refresh fills
//! the previous buffer so no phantom edges fire, the safe output state is
//! applied, every shutter is stopped and the night-light edge is forced so
//! daylight-dependent rules start from the true state.

use std::sync::Arc;
use std::time::Duration;

use crate::bank::bus::ExpanderBus;
use crate::bank::names::PinNames;
use crate::bank::states::PinStates;
use crate::clock::{Daylight, Nightlight};
use crate::core::config::HomeConfig;
use crate::core::error::Result;
use crate::core::logging::{LogHandler, LogLevel};
use crate::devices::input::Input;
use crate::devices::output::{Output, DEFAULT_BLINK};
use crate::devices::shutter::{RollerShutter, ShutterPins};
use crate::router::Router;
use crate::sched::{DelayedWrites, TimerService};

/// Pin assignment of the installation.
pub mod pins {
    pub const FRONT_LED: u8 = 0;
    pub const WIATA_PRZYCISK: u8 = 0;
    pub const PODDASZE_LED: u8 = 1;
    pub const KOTLOWNIA_LED: u8 = 2;
    pub const GARAZ_LED_2: u8 = 3;
    pub const SCHODY_LED: u8 = 4;
    pub const GARAZ_LED_1: u8 = 5;
    pub const KORYTARZ_LED: u8 = 6;
    pub const WIATROLAP_LED: u8 = 7;
    pub const PODJAZD_LED: u8 = 9;
    pub const GARAZ_WENTYLATOR: u8 = 10;
    pub const WIATA_LED: u8 = 11;
    pub const DZWONEK: u8 = 12;
    pub const FRONT_DRZWI: u8 = 29;
    pub const GARAZ_BRAMA: u8 = 31;
    pub const GARAZ_BRAMA_SEC: u8 = 32;
    pub const GARAZ_PRZYCISK_LEWY: u8 = 65;
    pub const PODDASZE_PRZYCISK_1: u8 = 66;
    pub const GARAZ_DRZWI: u8 = 67;
    pub const KOTLOWNIA_PRZYCISK: u8 = 68;
    pub const WIATROLAP_DRZWI: u8 = 69;
    pub const KOTLOWNIA_DRZWI: u8 = 70;
    pub const WIATROLAP_PRZYCISK_1: u8 = 72; // lewy gorny
    pub const WIATROLAP_PRZYCISK_5: u8 = 73; // dolny
    pub const SCHODY_PRZYCISK_PRAWY_PARTER: u8 = 75;
    pub const SCHODY_PRZYCISK_LEWY_PODDASZE: u8 = 76;
    pub const SCHODY_PRZYCISK_LEWY_PARTER: u8 = 77;
    pub const SCHODY_PRZYCISK_PRAWY_PODDASZE: u8 = 78;
    pub const KOMINEK_PRZYCISK_LEWY: u8 = 79;
    pub const KOMINEK_PRZYCISK_PRAWY: u8 = 80;
    pub const PODDASZE_PRZYCISK_2: u8 = 97;
    pub const GARAZ_PRZYCISK_PRAWY: u8 = 98;
    pub const FURTKA_PRZYCISK: u8 = 99;
    pub const WIATROLAP_PRZYCISK_4: u8 = 103; // prawy srodkowy
    pub const WIATROLAP_PRZYCISK_2: u8 = 104; // prawy gorny
    pub const WIATROLAP_PRZYCISK_3: u8 = 105; // lewy srodkowy
    pub const WIATA_DRZWI: u8 = 108;
    pub const SPARE_1: u8 = 117;
    pub const SPARE_2: u8 = 118;
    pub const FURTKA_ZAMEK: u8 = 119;
    pub const FURTKA_LED: u8 = 120;
}

/// Press-length code that unlocks the gate (0 = short, 1 = long).
pub const FURTKA_CODE: [u8; 6] = [0, 0, 1, 1, 0, 1];

/// Every non-shutter fixture of the house.
pub struct Fixtures {
    // outputs
    pub spare_1: Output,
    pub spare_2: Output,
    pub furtka_led: Output,
    pub furtka_zamek: Output,
    pub dzwonek: Output,
    pub podjazd_led: Output,
    pub front_led: Output,
    pub wiatrolap_led: Output,
    pub kotlownia_led: Output,
    pub garaz_wentylator: Output,
    pub garaz_brama: Output,
    pub garaz_brama_sec: Output,
    pub garaz_led_1: Output,
    pub garaz_led_2: Output,
    pub wiata_led: Output,
    pub korytarz_led: Output,
    pub schody_led: Output,
    pub poddasze_led: Output,

    // buttons
    pub furtka_przycisk: Input,
    pub wiatrolap_przycisk_1: Input,
    pub wiatrolap_przycisk_2: Input,
    pub wiatrolap_przycisk_3: Input,
    pub wiatrolap_przycisk_4: Input,
    pub wiatrolap_przycisk_5: Input,
    pub kotlownia_przycisk: Input,
    pub garaz_przycisk_lewy: Input,
    pub garaz_przycisk_prawy: Input,
    pub wiata_przycisk: Input,
    pub kominek_przycisk_lewy: Input,
    pub kominek_przycisk_prawy: Input,
    pub schody_przycisk_lewy_parter: Input,
    pub schody_przycisk_prawy_parter: Input,
    pub schody_przycisk_lewy_poddasze: Input,
    pub schody_przycisk_prawy_poddasze: Input,
    pub poddasze_przycisk_1: Input,
    pub poddasze_przycisk_2: Input,

    // doors
    pub front_drzwi: Input,
    pub wiatrolap_drzwi: Input,
    pub kotlownia_drzwi: Input,
    pub garaz_drzwi: Input,
    pub wiata_drzwi: Input,
}

impl Fixtures {
    fn new(config: &HomeConfig, names: &mut PinNames) -> Self {
        Self {
            spare_1: Output::new("spare_1", pins::SPARE_1, names),
            spare_2: Output::new("spare_2", pins::SPARE_2, names),
            furtka_led: Output::new("furtka_led", pins::FURTKA_LED, names),
            furtka_zamek: Output::new("furtka_zamek", pins::FURTKA_ZAMEK, names),
            dzwonek: Output::new("dzwonek", pins::DZWONEK, names),
            podjazd_led: Output::new("podjazd_led", pins::PODJAZD_LED, names),
            front_led: Output::new("front_led", pins::FRONT_LED, names),
            wiatrolap_led: Output::new("wiatrolap_led", pins::WIATROLAP_LED, names),
            kotlownia_led: Output::new("kotlownia_led", pins::KOTLOWNIA_LED, names),
            garaz_wentylator: Output::new("garaz_wentylator", pins::GARAZ_WENTYLATOR, names),
            garaz_brama: Output::new("garaz_brama", pins::GARAZ_BRAMA, names),
            garaz_brama_sec: Output::new("garaz_brama_sec", pins::GARAZ_BRAMA_SEC, names),
            garaz_led_1: Output::new("garaz_led_1", pins::GARAZ_LED_1, names),
            garaz_led_2: Output::new("garaz_led_2", pins::GARAZ_LED_2, names),
            wiata_led: Output::new("wiata_led", pins::WIATA_LED, names),
            korytarz_led: Output::new("korytarz_led", pins::KORYTARZ_LED, names),
            schody_led: Output::new("schody_led", pins::SCHODY_LED, names),
            poddasze_led: Output::new("poddasze_led", pins::PODDASZE_LED, names),

            furtka_przycisk: Input::morse("furtka_przycisk", pins::FURTKA_PRZYCISK, config, names),
            wiatrolap_przycisk_1: Input::button(
                "wiatrolap_przycisk_1",
                pins::WIATROLAP_PRZYCISK_1,
                config,
                names,
            ),
            wiatrolap_przycisk_2: Input::button(
                "wiatrolap_przycisk_2",
                pins::WIATROLAP_PRZYCISK_2,
                config,
                names,
            ),
            wiatrolap_przycisk_3: Input::button(
                "wiatrolap_przycisk_3",
                pins::WIATROLAP_PRZYCISK_3,
                config,
                names,
            ),
            wiatrolap_przycisk_4: Input::button(
                "wiatrolap_przycisk_4",
                pins::WIATROLAP_PRZYCISK_4,
                config,
                names,
            ),
            wiatrolap_przycisk_5: Input::button(
                "wiatrolap_przycisk_5",
                pins::WIATROLAP_PRZYCISK_5,
                config,
                names,
            ),
            kotlownia_przycisk: Input::button(
                "kotlownia_przycisk",
                pins::KOTLOWNIA_PRZYCISK,
                config,
                names,
            ),
            garaz_przycisk_lewy: Input::button(
                "garaz_przycisk_lewy",
                pins::GARAZ_PRZYCISK_LEWY,
                config,
                names,
            ),
            garaz_przycisk_prawy: Input::button(
                "garaz_przycisk_prawy",
                pins::GARAZ_PRZYCISK_PRAWY,
                config,
                names,
            ),
            wiata_przycisk: Input::button("wiata_przycisk", pins::WIATA_PRZYCISK, config, names),
            kominek_przycisk_lewy: Input::button(
                "kominek_przycisk_lewy",
                pins::KOMINEK_PRZYCISK_LEWY,
                config,
                names,
            ),
            kominek_przycisk_prawy: Input::button(
                "kominek_przycisk_prawy",
                pins::KOMINEK_PRZYCISK_PRAWY,
                config,
                names,
            ),
            schody_przycisk_lewy_parter: Input::morse(
                "schody_przycisk_lewy_parter",
                pins::SCHODY_PRZYCISK_LEWY_PARTER,
                config,
                names,
            ),
            schody_przycisk_prawy_parter: Input::button(
                "schody_przycisk_prawy_parter",
                pins::SCHODY_PRZYCISK_PRAWY_PARTER,
                config,
                names,
            ),
            schody_przycisk_lewy_poddasze: Input::button(
                "schody_przycisk_lewy_poddasze",
                pins::SCHODY_PRZYCISK_LEWY_PODDASZE,
                config,
                names,
            ),
            schody_przycisk_prawy_poddasze: Input::button(
                "schody_przycisk_prawy_poddasze",
                pins::SCHODY_PRZYCISK_PRAWY_PODDASZE,
                config,
                names,
            ),
            poddasze_przycisk_1: Input::button(
                "poddasze_przycisk_1",
                pins::PODDASZE_PRZYCISK_1,
                config,
                names,
            ),
            poddasze_przycisk_2: Input::button(
                "poddasze_przycisk_2",
                pins::PODDASZE_PRZYCISK_2,
                config,
                names,
            ),

            front_drzwi: Input::door("front_drzwi", pins::FRONT_DRZWI, config, names),
            wiatrolap_drzwi: Input::door("wiatrolap_drzwi", pins::WIATROLAP_DRZWI, config, names),
            kotlownia_drzwi: Input::door("kotlownia_drzwi", pins::KOTLOWNIA_DRZWI, config, names),
            garaz_drzwi: Input::door("garaz_drzwi", pins::GARAZ_DRZWI, config, names),
            wiata_drzwi: Input::door("wiata_drzwi", pins::WIATA_DRZWI, config, names),
        }
    }

    fn inputs_mut(&mut self) -> [&mut Input; 23] {
        [
            &mut self.furtka_przycisk,
            &mut self.wiatrolap_przycisk_1,
            &mut self.wiatrolap_przycisk_2,
            &mut self.wiatrolap_przycisk_3,
            &mut self.wiatrolap_przycisk_4,
            &mut self.wiatrolap_przycisk_5,
            &mut self.kotlownia_przycisk,
            &mut self.garaz_przycisk_lewy,
            &mut self.garaz_przycisk_prawy,
            &mut self.wiata_przycisk,
            &mut self.kominek_przycisk_lewy,
            &mut self.kominek_przycisk_prawy,
            &mut self.schody_przycisk_lewy_parter,
            &mut self.schody_przycisk_prawy_parter,
            &mut self.schody_przycisk_lewy_poddasze,
            &mut self.schody_przycisk_prawy_poddasze,
            &mut self.poddasze_przycisk_1,
            &mut self.poddasze_przycisk_2,
            &mut self.front_drzwi,
            &mut self.wiatrolap_drzwi,
            &mut self.kotlownia_drzwi,
            &mut self.garaz_drzwi,
            &mut self.wiata_drzwi,
        ]
    }
}

/// The six roller shutters.
pub struct Shutters {
    pub kuchnia_n: RollerShutter,
    pub kuchnia_e: RollerShutter,
    pub poddasze_s: RollerShutter,
    pub poddasze_n: RollerShutter,
    pub salon: RollerShutter,
    pub jadalnia: RollerShutter,
}

impl Shutters {
    fn new(config: &HomeConfig, names: &mut PinNames) -> Self {
        Self {
            kuchnia_n: RollerShutter::new(
                "kuchnia_n",
                ShutterPins { motor_up: 109, motor_down: 110, button_up: 17, button_down: 18 },
                config,
                names,
            ),
            kuchnia_e: RollerShutter::new(
                "kuchnia_e",
                ShutterPins { motor_up: 126, motor_down: 125, button_up: 19, button_down: 20 },
                config,
                names,
            ),
            poddasze_s: RollerShutter::new(
                "poddasze_s",
                ShutterPins { motor_up: 124, motor_down: 123, button_up: 28, button_down: 27 },
                config,
                names,
            ),
            poddasze_n: RollerShutter::new(
                "poddasze_n",
                ShutterPins { motor_up: 121, motor_down: 122, button_up: 26, button_down: 25 },
                config,
                names,
            ),
            salon: RollerShutter::new(
                "salon",
                ShutterPins { motor_up: 114, motor_down: 113, button_up: 23, button_down: 24 },
                config,
                names,
            ),
            jadalnia: RollerShutter::new(
                "jadalnia",
                ShutterPins { motor_up: 112, motor_down: 111, button_up: 21, button_down: 22 },
                config,
                names,
            ),
        }
    }

    /// All shutters, in a fixed order.
    pub fn iter(&self) -> [&RollerShutter; 6] {
        [
            &self.kuchnia_n,
            &self.kuchnia_e,
            &self.poddasze_s,
            &self.poddasze_n,
            &self.salon,
            &self.jadalnia,
        ]
    }

    fn iter_mut(&mut self) -> [&mut RollerShutter; 6] {
        [
            &mut self.kuchnia_n,
            &mut self.kuchnia_e,
            &mut self.poddasze_s,
            &mut self.poddasze_n,
            &mut self.salon,
            &mut self.jadalnia,
        ]
    }
}

/// Mutable half of the installation: everything the rules and the command
/// handlers operate on. Split out of [`Home`] so that router handlers can
/// borrow it while the router table stays shared.
pub struct HomeIo {
    bus: Box<dyn ExpanderBus>,
    states: PinStates,
    names: PinNames,
    timers: DelayedWrites,
    log: Arc<dyn LogHandler>,
    fx: Fixtures,
    shutters: Shutters,
    muted: bool,
}

impl HomeIo {
    /// Latest pin snapshots.
    pub fn states(&self) -> &PinStates {
        &self.states
    }

    /// Pin label registry.
    pub fn names(&self) -> &PinNames {
        &self.names
    }

    /// Non-shutter fixtures.
    pub fn fixtures(&self) -> &Fixtures {
        &self.fx
    }

    /// The roller shutters.
    pub fn shutters(&self) -> &Shutters {
        &self.shutters
    }

    /// Number of delayed writes currently pending.
    pub fn pending_writes(&self) -> usize {
        self.timers.pending_count()
    }

    /// Whether the doorbell is muted.
    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Unlock the gate: short lock pulse plus a vestibule LED blink as
    /// visual feedback.
    pub fn open_gate(&mut self) {
        let Self { bus, states, timers, fx, .. } = self;
        open_gate(fx, bus.as_mut(), timers, states);
    }

    /// Ring the doorbell unless muted.
    pub fn ring(&mut self) {
        let Self { bus, timers, fx, muted, .. } = self;
        ring_bell(fx, bus.as_mut(), timers, *muted);
    }

    /// Emulate a press of the garage door opener button.
    pub fn garage_door_pulse(&mut self) {
        let Self { bus, timers, fx, .. } = self;
        garage_door_pulse(fx, bus.as_mut(), timers);
    }

    /// Force every light (and the garage fan) off.
    pub fn all_lights_off(&mut self) {
        let Self { bus, timers, fx, .. } = self;
        lights_off(fx, bus.as_mut(), timers);
    }

    /// Raise all four ground-floor shutters for their full travel.
    pub fn ground_floor_up(&mut self) {
        let Self { bus, timers, shutters, .. } = self;
        let bus = bus.as_mut();
        for s in [&shutters.salon, &shutters.jadalnia, &shutters.kuchnia_n, &shutters.kuchnia_e] {
            let _ = s.move_up(bus, timers, s.default_move());
        }
    }

    /// Lower all four ground-floor shutters for their full travel.
    pub fn ground_floor_down(&mut self) {
        let Self { bus, timers, shutters, .. } = self;
        let bus = bus.as_mut();
        for s in [&shutters.salon, &shutters.jadalnia, &shutters.kuchnia_n, &shutters.kuchnia_e] {
            let _ = s.move_down(bus, timers, s.default_move());
        }
    }

    fn fire_due_writes(&mut self) {
        for due in self.timers.advance() {
            if self.bus.write_output(due.pin, due.state).is_err() {
                self.log.on_log(
                    LogLevel::Warn,
                    &format!("delayed write failed on pin {}", due.pin),
                );
            }
        }
    }

    fn refresh(&mut self) {
        self.states.refresh(self.bus.as_mut());
    }

    fn update_inputs(&mut self) {
        let Self { states, fx, shutters, log, .. } = self;
        for input in fx.inputs_mut() {
            input.update(states, log.as_ref());
        }
        for shutter in shutters.iter_mut() {
            shutter.update_buttons(states, log.as_ref());
        }
    }

    fn log_changes(&self) {
        self.states.log_changes(&self.names, self.log.as_ref());
    }

    /// Known-good output state applied on the first tick.
    fn apply_safe_state(&mut self) {
        let Self { bus, timers, fx, shutters, .. } = self;
        let bus = bus.as_mut();

        let _ = fx.spare_1.write(bus, timers, false);
        let _ = fx.spare_2.write(bus, timers, false);
        let _ = fx.podjazd_led.write(bus, timers, true);
        let _ = fx.garaz_brama_sec.write(bus, timers, true);
        let _ = fx.garaz_wentylator.write(bus, timers, false);
        let _ = fx.front_led.write(bus, timers, false);
        let _ = fx.furtka_zamek.write(bus, timers, false);
        let _ = fx.dzwonek.write(bus, timers, false);

        for shutter in shutters.iter() {
            shutter.stop(bus, timers);
        }
    }

    /// Door-to-LED couplings that only matter in the dark.
    fn run_night_rules(&mut self) {
        let Self { bus, states, timers, fx, .. } = self;
        let bus = bus.as_mut();

        if fx.wiatrolap_drzwi.changed(states)
            || fx.front_drzwi.changed(states)
            || fx.kotlownia_drzwi.changed(states)
        {
            if fx.wiatrolap_drzwi.is_closed(states)
                && fx.front_drzwi.is_closed(states)
                && fx.kotlownia_drzwi.is_closed(states)
            {
                let _ = fx.wiatrolap_led.write_delayed(
                    bus,
                    timers,
                    false,
                    Duration::from_secs(300),
                );
            } else if fx.wiatrolap_drzwi.gets_open(states)
                || fx.front_drzwi.gets_open(states)
                || fx.kotlownia_drzwi.gets_open(states)
            {
                let _ = fx.wiatrolap_led.write(bus, timers, true);
            }
        }

        if fx.kotlownia_drzwi.changed(states) || fx.garaz_drzwi.changed(states) {
            if fx.kotlownia_drzwi.is_closed(states) && fx.garaz_drzwi.is_closed(states) {
                let _ = fx.kotlownia_led.write_delayed(
                    bus,
                    timers,
                    false,
                    Duration::from_secs(120),
                );
            } else if fx.kotlownia_drzwi.gets_open(states) || fx.garaz_drzwi.gets_open(states) {
                let _ = fx.kotlownia_led.write(bus, timers, true);
            }
        }

        if fx.wiata_drzwi.changed(states) {
            if fx.wiata_drzwi.is_closed(states) {
                let _ = fx.wiata_led.write_delayed(bus, timers, false, Duration::from_secs(120));
            } else {
                let _ = fx.wiata_led.write(bus, timers, true);
            }
        }

        if fx.front_drzwi.changed(states) {
            if fx.front_drzwi.is_closed(states) {
                let _ = fx.front_led.write_delayed(bus, timers, false, Duration::from_secs(30));
            } else {
                let _ = fx.front_led.write(bus, timers, true);
            }
        }
    }

    /// Button and door rules that run regardless of daylight.
    fn run_day_rules(&mut self) {
        let Self { bus, states, timers, fx, muted, .. } = self;
        let bus = bus.as_mut();

        // The garage light tracks its doors even in daylight: no windows.
        if fx.wiata_drzwi.changed(states) || fx.garaz_drzwi.changed(states) {
            if fx.wiata_drzwi.is_closed(states) && fx.garaz_drzwi.is_closed(states) {
                let _ = fx.garaz_led_1.write_delayed(bus, timers, false, Duration::from_secs(120));
            } else if fx.wiata_drzwi.gets_open(states) || fx.garaz_drzwi.gets_open(states) {
                let _ = fx.garaz_led_1.write(bus, timers, true);
            }
        }

        if fx.kominek_przycisk_lewy.gets_pressed(states) {
            let _ = fx.korytarz_led.toggle(bus, timers, states);
        }

        if fx.kominek_przycisk_prawy.gets_pressed(states) {
            let _ = fx.wiatrolap_led.toggle(bus, timers, states);
        }

        if fx.wiatrolap_przycisk_5.gets_pressed(states) {
            let _ = fx.wiatrolap_led.toggle(bus, timers, states);
        }

        // Both vestibule buttons together unlock the gate.
        if (fx.wiatrolap_przycisk_1.gets_pressed(states)
            && fx.wiatrolap_przycisk_3.is_pressed(states))
            || (fx.wiatrolap_przycisk_3.gets_pressed(states)
                && fx.wiatrolap_przycisk_1.is_pressed(states))
        {
            open_gate(fx, bus, timers, states);
        }

        if fx.kotlownia_przycisk.gets_pressed(states) {
            let _ = fx.kotlownia_led.toggle(bus, timers, states);
        }

        if fx.garaz_przycisk_lewy.held_exactly(states, Duration::from_secs(1)) {
            let _ = fx.garaz_led_2.toggle(bus, timers, states);
        } else if fx.garaz_przycisk_lewy.gets_released(states)
            && !fx.garaz_przycisk_lewy.was_long_click(Duration::from_millis(1000))
        {
            let _ = fx.garaz_led_1.toggle(bus, timers, states);
        }

        if fx.garaz_przycisk_prawy.gets_pressed(states) {
            garage_door_pulse(fx, bus, timers);
        }

        if fx.wiata_przycisk.gets_pressed(states) {
            let _ = fx.wiata_led.toggle(bus, timers, states);
        }

        if fx.schody_przycisk_lewy_parter.gets_pressed(states) {
            let _ = fx.schody_led.toggle(bus, timers, states);
        }

        if fx.schody_przycisk_prawy_parter.gets_pressed(states) {
            let _ = fx.korytarz_led.toggle(bus, timers, states);
        }

        if fx.schody_przycisk_lewy_poddasze.gets_pressed(states) {
            let _ = fx.schody_led.toggle(bus, timers, states);
        }

        if fx.schody_przycisk_prawy_poddasze.gets_pressed(states) {
            let _ = fx.poddasze_led.toggle(bus, timers, states);
        }

        if fx.poddasze_przycisk_1.gets_pressed(states) || fx.poddasze_przycisk_2.gets_pressed(states)
        {
            let _ = fx.poddasze_led.toggle(bus, timers, states);
        }

        if fx.furtka_przycisk.gets_pressed(states) {
            let _ = fx.furtka_led.pulse(bus, timers, Duration::from_millis(200));
            // Ring only on the first press of a fresh code entry.
            if fx.furtka_przycisk.pattern_len() == 0 {
                ring_bell(fx, bus, timers, *muted);
            }
        } else if fx.furtka_przycisk.gets_released(states)
            && fx.furtka_przycisk.matches_pattern(&FURTKA_CODE)
        {
            open_gate(fx, bus, timers, states);
        }
    }

    fn service_shutters(&mut self) {
        let Self { bus, states, timers, shutters, .. } = self;
        let bus = bus.as_mut();
        for shutter in shutters.iter() {
            shutter.service_buttons(bus, timers, states);
        }
    }
}

fn ring_bell(
    fx: &Fixtures,
    bus: &mut dyn ExpanderBus,
    timers: &mut dyn TimerService,
    muted: bool,
) {
    if !muted {
        let _ = fx.dzwonek.pulse(bus, timers, Duration::from_millis(150));
    }
}

fn open_gate(
    fx: &Fixtures,
    bus: &mut dyn ExpanderBus,
    timers: &mut dyn TimerService,
    states: &PinStates,
) {
    let _ = fx.furtka_zamek.pulse(bus, timers, Duration::from_millis(10));
    fx.wiatrolap_led.blink(bus, timers, states, DEFAULT_BLINK);
}

fn garage_door_pulse(fx: &Fixtures, bus: &mut dyn ExpanderBus, timers: &mut dyn TimerService) {
    let _ = fx.garaz_brama.pulse(bus, timers, Duration::from_millis(200));
}

fn lights_off(fx: &Fixtures, bus: &mut dyn ExpanderBus, timers: &mut dyn TimerService) {
    let _ = fx.front_led.write(bus, timers, false);
    let _ = fx.wiata_led.write(bus, timers, false);
    let _ = fx.garaz_led_1.write(bus, timers, false);
    let _ = fx.garaz_led_2.write(bus, timers, false);
    let _ = fx.wiatrolap_led.write(bus, timers, false);
    let _ = fx.kotlownia_led.write(bus, timers, false);
    let _ = fx.korytarz_led.write(bus, timers, false);
    let _ = fx.schody_led.write(bus, timers, false);
    let _ = fx.poddasze_led.write(bus, timers, false);
    let _ = fx.garaz_wentylator.write(bus, timers, false);
}

fn toggle_output(io: &mut HomeIo, pick: fn(&Fixtures) -> &Output) {
    let HomeIo { bus, states, timers, fx, .. } = io;
    let _ = pick(fx).toggle(bus.as_mut(), timers, states);
}

fn shutter_event(io: &mut HomeIo, pick: fn(&Shutters) -> &RollerShutter, args: &str) {
    let HomeIo { bus, timers, shutters, .. } = io;
    pick(shutters).handle_command(bus.as_mut(), timers, args);
}

/// The whole installation plus its poll-cycle state.
pub struct Home {
    io: HomeIo,
    router: Router<HomeIo>,
    day: Box<dyn Daylight>,
    nightlight: Nightlight,
    primed: bool,
    ticks: u64,
}

impl Home {
    /// Build the installation over the given bus, daylight source and log
    /// sink.
    pub fn new(
        config: &HomeConfig,
        bus: Box<dyn ExpanderBus>,
        day: Box<dyn Daylight>,
        log: Arc<dyn LogHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let mut names = PinNames::new();
        let fx = Fixtures::new(config, &mut names);
        let shutters = Shutters::new(config, &mut names);

        Ok(Self {
            io: HomeIo {
                bus,
                states: PinStates::new(),
                names,
                timers: DelayedWrites::new(config.tick()),
                log,
                fx,
                shutters,
                muted: false,
            },
            router: Self::build_router(),
            day,
            nightlight: Nightlight::new(config.nightlight.offset_min),
            primed: false,
            ticks: 0,
        })
    }

    fn build_router() -> Router<HomeIo> {
        let mut router = Router::new();

        router.register("osw_podjazd", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.podjazd_led)
        });
        router.register("wentylator_gar", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.garaz_wentylator)
        });
        router.register("osw_wiata", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.wiata_led)
        });
        router.register("osw_gar", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.garaz_led_1)
        });
        router.register("osw_gar_2", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.garaz_led_2)
        });
        router.register("osw_wiatrolap", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.wiatrolap_led)
        });
        router.register("osw_kot", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.kotlownia_led)
        });
        router.register("osw_korytarz", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.korytarz_led)
        });
        router.register("osw_schody", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.schody_led)
        });
        router.register("osw_pietro", |io: &mut HomeIo, _: &str| {
            toggle_output(io, |fx| &fx.poddasze_led)
        });
        router.register("osw_wylacz", |io: &mut HomeIo, _: &str| io.all_lights_off());

        router.register("salon", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.salon, args)
        });
        router.register("jadalnia", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.jadalnia, args)
        });
        router.register("kuchnia_n", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.kuchnia_n, args)
        });
        router.register("kuchnia_e", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.kuchnia_e, args)
        });
        router.register("poddasze_n", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.poddasze_n, args)
        });
        router.register("poddasze_s", |io: &mut HomeIo, args: &str| {
            shutter_event(io, |s| &s.poddasze_s, args)
        });
        router.register("parter_up", |io: &mut HomeIo, _: &str| io.ground_floor_up());
        router.register("parter_down", |io: &mut HomeIo, _: &str| io.ground_floor_down());

        router.register("mute", |io: &mut HomeIo, _: &str| io.muted = true);
        router.register("unmute", |io: &mut HomeIo, _: &str| io.muted = false);
        router.register("ring", |io: &mut HomeIo, _: &str| io.ring());

        router.register("furtka", |io: &mut HomeIo, _: &str| io.open_gate());
        router.register("brama_gar", |io: &mut HomeIo, _: &str| io.garage_door_pulse());

        router
    }

    /// Mutable half of the installation.
    pub fn io(&self) -> &HomeIo {
        &self.io
    }

    /// The command table.
    pub fn router(&self) -> &Router<HomeIo> {
        &self.router
    }

    /// Whether the night-light window is active.
    pub fn nightlight_active(&self) -> bool {
        self.nightlight.active()
    }

    /// Completed poll ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Route one external event (`name` or `name=arg`) to its handler.
    /// Returns whether a handler ran.
    pub fn dispatch_event(&mut self, event: &str) -> bool {
        self.router.dispatch(&mut self.io, event)
    }

    /// One poll cycle. The caller invokes this once per configured tick
    /// period; all delayed writes and gesture thresholds count these calls.
    pub fn tick(&mut self) {
        self.io.fire_due_writes();

        let mut nightlight_changed = self.nightlight.update(self.day.as_ref());

        if !self.primed {
            self.primed = true;
            // Report the true night-light state on the first tick even if
            // the gate did not flip.
            nightlight_changed = true;
            // Extra refresh so the previous buffer holds real levels and no
            // phantom edges fire below.
            self.io.refresh();
            self.io.apply_safe_state();
        }

        self.io.refresh();
        self.io.update_inputs();
        self.io.log_changes();

        if nightlight_changed && !self.nightlight.active() {
            self.io.all_lights_off();
        }

        if self.nightlight.active() {
            self.io.run_night_rules();
        }

        self.io.run_day_rules();
        self.io.service_shutters();

        self.ticks += 1;
    }
}

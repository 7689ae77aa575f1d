//! Edge and gesture observers bound to one input pin.
//!
//! An [`Input`] never touches the bus: it reads the double-buffered
//! [`PinStates`] snapshots and keeps per-pin run-length counters that the
//! gesture classifiers compare against configured thresholds. The closed
//! [`InputKind`] set covers the installation's variants: a plain observed
//! pin, a momentary button (low = pressed), a morse-style button that
//! collects press-duration codes, and a door contact (high = open).
//!
//! Counters are `u8` ticks and saturate at 255; they never wrap. When the
//! pin flips, the completed run length is retained in the matching
//! `prev_*` counter so duration-based classification is possible after the
//! state already changed.

use std::collections::VecDeque;
use std::time::Duration;

use crate::bank::names::PinNames;
use crate::bank::states::PinStates;
use crate::core::config::{duration_to_ticks, gesture_ticks, HomeConfig};
use crate::core::logging::{LogHandler, LogLevel};

/// State carried by a morse-style button.
#[derive(Debug, Clone)]
pub struct MorseState {
    /// Completed press durations in ticks, oldest first.
    history: VecDeque<u8>,
    capacity: usize,
    /// Durations above this many ticks are a dash, otherwise a dot.
    dot_max: u8,
    /// Released longer than this many ticks ends the code entry.
    idle_clear: u8,
}

impl MorseState {
    fn new(config: &HomeConfig) -> Self {
        let tick = config.tick();
        Self {
            history: VecDeque::new(),
            capacity: config.gestures.history_len,
            dot_max: gesture_ticks(config.gestures.dot_max(), tick),
            idle_clear: gesture_ticks(config.gestures.idle_clear(), tick),
        }
    }

    /// Render the collected entry as dots and dashes with raw tick counts,
    /// e.g. `.2.3-8`.
    fn transcript(&self) -> String {
        let mut text = String::new();
        for &ticks in &self.history {
            text.push(if ticks > self.dot_max { '-' } else { '.' });
            text.push_str(&ticks.to_string());
        }
        text
    }
}

/// Behavioral variant of an input pin.
#[derive(Debug, Clone)]
pub enum InputKind {
    /// Observed pin without gesture semantics.
    Plain,
    /// Momentary button, low when pressed.
    Button,
    /// Button that additionally collects a timing-pattern code.
    Morse(MorseState),
    /// Door or other contact sensor, high when open.
    Door,
}

/// One monitored input pin with gesture counters.
#[derive(Debug, Clone)]
pub struct Input {
    name: String,
    pin: u8,
    kind: InputKind,
    tick: Duration,
    /// Upper bound in ticks for the three intervals of a double click.
    double_click_max: u8,

    /// Consecutive update ticks spent low ("pressed"), saturating.
    press_ticks: u8,
    /// Consecutive update ticks spent high ("released"), saturating.
    release_ticks: u8,
    /// Completed low run length, captured when the pin went low again.
    prev_press_ticks: u8,
    /// Completed high run length, captured when the pin went high again.
    prev_release_ticks: u8,
}

impl Input {
    fn new(
        name: impl Into<String>,
        pin: u8,
        kind: InputKind,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        let name = name.into();
        names.register(pin, name.clone());
        Self {
            name,
            pin,
            kind,
            tick: config.tick(),
            double_click_max: gesture_ticks(config.gestures.double_click_max(), config.tick()),
            press_ticks: 0,
            release_ticks: 0,
            prev_press_ticks: 0,
            prev_release_ticks: 0,
        }
    }

    /// Plain observed pin.
    pub fn plain(
        name: impl Into<String>,
        pin: u8,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        Self::new(name, pin, InputKind::Plain, config, names)
    }

    /// Momentary button.
    pub fn button(
        name: impl Into<String>,
        pin: u8,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        Self::new(name, pin, InputKind::Button, config, names)
    }

    /// Morse-style button.
    pub fn morse(
        name: impl Into<String>,
        pin: u8,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        Self::new(name, pin, InputKind::Morse(MorseState::new(config)), config, names)
    }

    /// Door contact.
    pub fn door(
        name: impl Into<String>,
        pin: u8,
        config: &HomeConfig,
        names: &mut PinNames,
    ) -> Self {
        Self::new(name, pin, InputKind::Door, config, names)
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bound pin.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    // ------------------------------------------------------------------
    // Raw edge predicates, straight from the snapshots
    // ------------------------------------------------------------------

    /// Latest snapshot reads high.
    pub fn is_high(&self, states: &PinStates) -> bool {
        states.current(self.pin)
    }

    /// Latest snapshot reads low.
    pub fn is_low(&self, states: &PinStates) -> bool {
        !states.current(self.pin)
    }

    /// Pin differs between the two snapshots.
    pub fn changed(&self, states: &PinStates) -> bool {
        states.changed(self.pin)
    }

    /// Rising edge this tick.
    pub fn gets_high(&self, states: &PinStates) -> bool {
        states.current(self.pin) && !states.previous(self.pin)
    }

    /// Falling edge this tick.
    pub fn gets_low(&self, states: &PinStates) -> bool {
        !states.current(self.pin) && states.previous(self.pin)
    }

    // ------------------------------------------------------------------
    // Button flavor (low = pressed)
    // ------------------------------------------------------------------

    /// Button currently held.
    pub fn is_pressed(&self, states: &PinStates) -> bool {
        self.is_low(states)
    }

    /// Button currently up.
    pub fn is_released(&self, states: &PinStates) -> bool {
        self.is_high(states)
    }

    /// Button went down this tick.
    pub fn gets_pressed(&self, states: &PinStates) -> bool {
        self.gets_low(states)
    }

    /// Button came up this tick.
    pub fn gets_released(&self, states: &PinStates) -> bool {
        self.gets_high(states)
    }

    // ------------------------------------------------------------------
    // Door flavor (high = open)
    // ------------------------------------------------------------------

    /// Door currently open.
    pub fn is_open(&self, states: &PinStates) -> bool {
        self.is_high(states)
    }

    /// Door currently closed.
    pub fn is_closed(&self, states: &PinStates) -> bool {
        self.is_low(states)
    }

    /// Door opened this tick.
    pub fn gets_open(&self, states: &PinStates) -> bool {
        self.gets_high(states)
    }

    /// Door closed this tick.
    pub fn gets_closed(&self, states: &PinStates) -> bool {
        self.gets_low(states)
    }

    // ------------------------------------------------------------------
    // Gesture classifiers
    // ------------------------------------------------------------------

    /// Live held time in ticks; 0 unless currently pressed.
    pub fn press_duration(&self, states: &PinStates) -> u8 {
        if self.is_pressed(states) {
            self.press_ticks
        } else {
            0
        }
    }

    /// Button has been held for exactly this long. Fires on one tick only,
    /// which makes it usable as a while-held trigger in rules.
    pub fn held_exactly(&self, states: &PinStates, duration: Duration) -> bool {
        self.press_duration(states) as u32 == duration_to_ticks(duration, self.tick)
    }

    /// Short press, short release, short press. Meaningful at the moment of
    /// release: the current press counter then still holds the completed
    /// second press.
    pub fn was_double_click(&self) -> bool {
        let max = self.double_click_max;
        self.prev_press_ticks > 0
            && self.prev_press_ticks < max
            && self.prev_release_ticks > 0
            && self.prev_release_ticks < max
            && self.press_ticks > 0
            && self.press_ticks < max
    }

    /// Completed press strictly exceeded `min_duration`. Meaningful at the
    /// moment of release, like [`was_double_click`](Self::was_double_click).
    pub fn was_long_click(&self, min_duration: Duration) -> bool {
        self.press_ticks as u32 > duration_to_ticks(min_duration, self.tick)
    }

    /// Number of completed presses in the morse history; 0 for other kinds.
    pub fn pattern_len(&self) -> usize {
        match &self.kind {
            InputKind::Morse(m) => m.history.len(),
            _ => 0,
        }
    }

    /// Compare the morse history against an expected symbol sequence
    /// (0 = dot/short, nonzero = dash/long).
    ///
    /// Fails fast when the history length differs from the pattern length;
    /// otherwise compares from the most recent end so stray older input
    /// never matches by prefix. Always false for non-morse inputs.
    pub fn matches_pattern(&self, expected: &[u8]) -> bool {
        let InputKind::Morse(m) = &self.kind else {
            return false;
        };
        if m.history.len() != expected.len() {
            return false;
        }
        m.history
            .iter()
            .rev()
            .zip(expected.iter().rev())
            .all(|(&ticks, &symbol)| (symbol > 0) == (ticks > m.dot_max))
    }

    /// Advance the gesture counters from this tick's snapshots.
    ///
    /// On an edge the counter of the newly entered state restarts at 1 and
    /// its completed run is retained; while the state persists the counter
    /// saturates at `u8::MAX`. Before the first edge ever seen both
    /// counters just stay at 0 or grow from the initial zeroed snapshots.
    pub fn update(&mut self, states: &PinStates, log: &dyn LogHandler) {
        if self.is_low(states) {
            if self.gets_low(states) {
                self.prev_press_ticks = self.press_ticks;
                self.press_ticks = 1;
            } else if self.press_ticks < u8::MAX {
                self.press_ticks += 1;
            }
        } else if self.gets_high(states) {
            self.prev_release_ticks = self.release_ticks;
            self.release_ticks = 1;
        } else if self.release_ticks < u8::MAX {
            self.release_ticks += 1;
        }

        // Morse bookkeeping rides on the counters updated above.
        let completed_press = self.press_ticks;
        let released_now = self.gets_high(states);
        let idle = self.is_high(states);
        let release_ticks = self.release_ticks;
        let name = &self.name;

        if let InputKind::Morse(m) = &mut self.kind {
            if released_now {
                m.history.push_back(completed_press);
                if m.history.len() > m.capacity {
                    m.history.pop_front();
                }
            } else if idle && release_ticks > m.idle_clear {
                // end of code entry
                if !m.history.is_empty() {
                    log.on_log(
                        LogLevel::Debug,
                        &format!("morse {}: {}", name, m.transcript()),
                    );
                }
                m.history.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::bus::LoopbackBus;
    use crate::core::logging::{MemoryLog, NullLog};

    /// Harness: one input watched over a loopback bus. Buttons idle high
    /// (pull-up), so the harness starts the pin high and refreshes twice to
    /// settle both snapshots.
    struct Rig {
        bus: LoopbackBus,
        states: PinStates,
        input: Input,
    }

    impl Rig {
        fn button() -> Self {
            Self::with(|config, names| Input::button("btn", 40, config, names))
        }

        fn morse() -> Self {
            Self::with(|config, names| Input::morse("code", 40, config, names))
        }

        fn with(make: fn(&HomeConfig, &mut PinNames) -> Input) -> Self {
            let config = HomeConfig::default();
            let mut names = PinNames::new();
            let input = make(&config, &mut names);
            let mut bus = LoopbackBus::new();
            bus.set_pin(40, true);
            let mut states = PinStates::new();
            states.refresh(&mut bus);
            states.refresh(&mut bus);
            Self { bus, states, input }
        }

        fn tick(&mut self, level: bool) {
            self.bus.set_pin(40, level);
            self.states.refresh(&mut self.bus);
            self.input.update(&self.states, &NullLog);
        }

        /// Hold low for `n` ticks, then high for `m` ticks.
        fn press_release(&mut self, n: u32, m: u32) {
            for _ in 0..n {
                self.tick(false);
            }
            for _ in 0..m {
                self.tick(true);
            }
        }
    }

    #[test]
    fn test_edges_and_counters() {
        let mut rig = Rig::button();
        assert!(rig.input.is_released(&rig.states));

        rig.tick(false);
        assert!(rig.input.gets_pressed(&rig.states));
        assert_eq!(rig.input.press_duration(&rig.states), 1);

        rig.tick(false);
        assert!(!rig.input.gets_pressed(&rig.states));
        assert_eq!(rig.input.press_duration(&rig.states), 2);

        rig.tick(true);
        assert!(rig.input.gets_released(&rig.states));
        assert_eq!(rig.input.press_duration(&rig.states), 0);
    }

    #[test]
    fn test_counter_saturates() {
        let mut rig = Rig::button();
        for _ in 0..300 {
            rig.tick(false);
        }
        assert_eq!(rig.input.press_duration(&rig.states), u8::MAX);
        // one more tick must not wrap
        rig.tick(false);
        assert_eq!(rig.input.press_duration(&rig.states), u8::MAX);
    }

    #[test]
    fn test_double_click_detected() {
        let mut rig = Rig::button();
        rig.press_release(3, 3);
        for _ in 0..3 {
            rig.tick(false);
        }
        rig.tick(true); // release of second press
        assert!(rig.input.gets_released(&rig.states));
        assert!(rig.input.was_double_click());
    }

    #[test]
    fn test_double_click_rejects_slow_release() {
        let mut rig = Rig::button();
        rig.press_release(3, 8); // middle release too long
        for _ in 0..3 {
            rig.tick(false);
        }
        rig.tick(true);
        assert!(!rig.input.was_double_click());
    }

    #[test]
    fn test_long_click_strict_threshold() {
        // 1000 ms at the default 100 ms tick: boundary at 10 ticks
        let min = Duration::from_millis(1000);

        let mut rig = Rig::button();
        rig.press_release(10, 1);
        assert!(!rig.input.was_long_click(min));

        let mut rig = Rig::button();
        rig.press_release(11, 1);
        assert!(rig.input.was_long_click(min));
    }

    #[test]
    fn test_held_exactly() {
        let mut rig = Rig::button();
        for _ in 0..9 {
            rig.tick(false);
        }
        assert!(!rig.input.held_exactly(&rig.states, Duration::from_secs(1)));
        rig.tick(false);
        assert!(rig.input.held_exactly(&rig.states, Duration::from_secs(1)));
        rig.tick(false);
        assert!(!rig.input.held_exactly(&rig.states, Duration::from_secs(1)));
    }

    #[test]
    fn test_morse_pattern_match() {
        let mut rig = Rig::morse();
        rig.press_release(2, 2);
        rig.press_release(2, 2);
        rig.press_release(8, 1);

        assert_eq!(rig.input.pattern_len(), 3);
        assert!(rig.input.matches_pattern(&[0, 0, 1]));
        assert!(!rig.input.matches_pattern(&[1, 0, 1]));
        // wrong length fails fast
        assert!(!rig.input.matches_pattern(&[0, 1]));
    }

    #[test]
    fn test_morse_history_capped() {
        let mut rig = Rig::morse();
        for _ in 0..12 {
            rig.press_release(2, 2);
        }
        assert_eq!(rig.input.pattern_len(), 10);
    }

    #[test]
    fn test_morse_idle_clear() {
        let mut rig = Rig::morse();
        rig.press_release(2, 1);
        assert_eq!(rig.input.pattern_len(), 1);

        // idle for more than 30 ticks without a new press
        for _ in 0..31 {
            rig.tick(true);
        }
        assert_eq!(rig.input.pattern_len(), 0);
    }

    #[test]
    fn test_morse_transcript_logged_on_clear() {
        let config = HomeConfig::default();
        let mut names = PinNames::new();
        let mut input = Input::morse("code", 40, &config, &mut names);
        let mut bus = LoopbackBus::new();
        bus.set_pin(40, true);
        let mut states = PinStates::new();
        states.refresh(&mut bus);
        states.refresh(&mut bus);
        let log = MemoryLog::new();

        // one dot, one dash
        for level in [false, false, true] {
            bus.set_pin(40, level);
            states.refresh(&mut bus);
            input.update(&states, &log);
        }
        for _ in 0..8 {
            bus.set_pin(40, false);
            states.refresh(&mut bus);
            input.update(&states, &log);
        }
        bus.set_pin(40, true);
        states.refresh(&mut bus);
        input.update(&states, &log);

        for _ in 0..31 {
            states.refresh(&mut bus);
            input.update(&states, &log);
        }

        let traces = log.messages_at(LogLevel::Debug);
        assert_eq!(traces, vec!["morse code: .2-8"]);
        assert_eq!(input.pattern_len(), 0);
    }

    #[test]
    fn test_non_morse_never_matches() {
        let rig = Rig::button();
        assert!(!rig.input.matches_pattern(&[]));
        assert_eq!(rig.input.pattern_len(), 0);
    }
}

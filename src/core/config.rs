//! Gateway configuration.
//!
//! All gesture and automation thresholds are configured in real time units
//! (milliseconds, seconds, minutes). The poll tick period itself is
//! configurable; thresholds are converted to tick counts only at the
//! comparison boundary, via [`duration_to_ticks`].
//!
//! Configuration is loaded from a TOML file:
//!
//! ```toml
//! tick_ms = 100
//!
//! [gestures]
//! double_click_max_ms = 600
//! long_click_min_ms = 2500
//!
//! [nightlight]
//! sunrise = "05:30"
//! sunset = "19:30"
//! ```

use std::path::Path;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::core::error::{HgwError, Result};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    /// Poll tick period in milliseconds. Gesture counters advance once per
    /// tick, so this is the time base for every threshold below.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Gesture classification thresholds.
    #[serde(default)]
    pub gestures: GestureConfig,

    /// Roller shutter timings.
    #[serde(default)]
    pub shutter: ShutterConfig,

    /// Daylight-based night-light gate.
    #[serde(default)]
    pub nightlight: NightlightConfig,
}

/// Gesture classification thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct GestureConfig {
    /// Upper bound for each of the three short intervals of a double click.
    #[serde(default = "default_double_click_max_ms")]
    pub double_click_max_ms: u64,

    /// Minimum held time for a long click. The comparison is strict: the
    /// press must exceed this many ticks-worth of time.
    #[serde(default = "default_long_click_min_ms")]
    pub long_click_min_ms: u64,

    /// Boundary between a morse "dot" and a "dash".
    #[serde(default = "default_dot_max_ms")]
    pub dot_max_ms: u64,

    /// Released-for-longer-than-this clears a pending morse entry.
    #[serde(default = "default_idle_clear_ms")]
    pub idle_clear_ms: u64,

    /// Morse history capacity; oldest completed press is evicted first.
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

/// Roller shutter timings.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutterConfig {
    /// Default full-travel move duration (auto-stop safety).
    #[serde(default = "default_move_secs")]
    pub move_secs: u64,

    /// Motor-on time of the hardware configuration-mode pulse.
    #[serde(default = "default_config_pulse_secs")]
    pub config_pulse_secs: u64,
}

/// Night-light gate parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct NightlightConfig {
    /// Lights turn on this many minutes before sunset and stay on this many
    /// minutes after sunrise.
    #[serde(default = "default_offset_min")]
    pub offset_min: i32,

    /// Local sunrise time, "HH:MM".
    #[serde(default = "default_sunrise")]
    pub sunrise: String,

    /// Local sunset time, "HH:MM".
    #[serde(default = "default_sunset")]
    pub sunset: String,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_double_click_max_ms() -> u64 {
    600
}

fn default_long_click_min_ms() -> u64 {
    2500
}

fn default_dot_max_ms() -> u64 {
    600
}

fn default_idle_clear_ms() -> u64 {
    3000
}

fn default_history_len() -> usize {
    10
}

fn default_move_secs() -> u64 {
    60
}

fn default_config_pulse_secs() -> u64 {
    6
}

fn default_offset_min() -> i32 {
    60
}

fn default_sunrise() -> String {
    "05:30".to_string()
}

fn default_sunset() -> String {
    "19:30".to_string()
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            gestures: GestureConfig::default(),
            shutter: ShutterConfig::default(),
            nightlight: NightlightConfig::default(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            double_click_max_ms: default_double_click_max_ms(),
            long_click_min_ms: default_long_click_min_ms(),
            dot_max_ms: default_dot_max_ms(),
            idle_clear_ms: default_idle_clear_ms(),
            history_len: default_history_len(),
        }
    }
}

impl Default for ShutterConfig {
    fn default() -> Self {
        Self {
            move_secs: default_move_secs(),
            config_pulse_secs: default_config_pulse_secs(),
        }
    }
}

impl Default for NightlightConfig {
    fn default() -> Self {
        Self {
            offset_min: default_offset_min(),
            sunrise: default_sunrise(),
            sunset: default_sunset(),
        }
    }
}

impl HomeConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&text).map_err(|e| HgwError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.tick_ms == 0 {
            return Err(HgwError::config("tick_ms must be > 0"));
        }
        if self.gestures.history_len == 0 {
            return Err(HgwError::config("gestures.history_len must be > 0"));
        }
        self.nightlight.sunrise()?;
        self.nightlight.sunset()?;
        Ok(())
    }

    /// Poll tick period.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl GestureConfig {
    /// Double-click short-interval bound.
    pub fn double_click_max(&self) -> Duration {
        Duration::from_millis(self.double_click_max_ms)
    }

    /// Default long-click threshold.
    pub fn long_click_min(&self) -> Duration {
        Duration::from_millis(self.long_click_min_ms)
    }

    /// Morse dot/dash boundary.
    pub fn dot_max(&self) -> Duration {
        Duration::from_millis(self.dot_max_ms)
    }

    /// Morse idle-clear threshold.
    pub fn idle_clear(&self) -> Duration {
        Duration::from_millis(self.idle_clear_ms)
    }
}

impl ShutterConfig {
    /// Default full-travel move duration.
    pub fn move_duration(&self) -> Duration {
        Duration::from_secs(self.move_secs)
    }

    /// Configuration-mode pulse duration.
    pub fn config_pulse(&self) -> Duration {
        Duration::from_secs(self.config_pulse_secs)
    }
}

impl NightlightConfig {
    /// Parsed sunrise time.
    pub fn sunrise(&self) -> Result<NaiveTime> {
        parse_time(&self.sunrise)
    }

    /// Parsed sunset time.
    pub fn sunset(&self) -> Result<NaiveTime> {
        parse_time(&self.sunset)
    }
}

fn parse_time(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .map_err(|e| HgwError::config(format!("invalid time '{}': {}", text, e)))
}

/// Convert a real-time threshold to whole poll ticks (floor).
///
/// Thresholds are compared against tick counters, so the conversion happens
/// here, at the boundary, never inside the counters themselves.
pub fn duration_to_ticks(duration: Duration, tick: Duration) -> u32 {
    let tick_ms = tick.as_millis().max(1);
    (duration.as_millis() / tick_ms).min(u32::MAX as u128) as u32
}

/// Like [`duration_to_ticks`] but clamped to the `u8` counter range.
pub fn gesture_ticks(duration: Duration, tick: Duration) -> u8 {
    duration_to_ticks(duration, tick).min(u8::MAX as u32) as u8
}

/// Example configuration printed by `hgw example-config`.
pub fn example_toml() -> &'static str {
    r#"# hgw configuration

# Poll tick period. All thresholds below are real time and are divided by
# this to obtain tick counts.
tick_ms = 100

[gestures]
double_click_max_ms = 600
long_click_min_ms = 2500
dot_max_ms = 600
idle_clear_ms = 3000
history_len = 10

[shutter]
move_secs = 60
config_pulse_secs = 6

[nightlight]
offset_min = 60
sunrise = "05:30"
sunset = "19:30"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HomeConfig::default();
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.gestures.double_click_max_ms, 600);
        assert_eq!(config.shutter.move_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_parses() {
        let config: HomeConfig = toml::from_str(example_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.nightlight.sunrise().unwrap().to_string(), "05:30:00");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: HomeConfig = toml::from_str("tick_ms = 50\n").unwrap();
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.gestures.long_click_min_ms, 2500);
    }

    #[test]
    fn test_rejects_zero_tick() {
        let config: HomeConfig = toml::from_str("tick_ms = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_time() {
        let config: HomeConfig =
            toml::from_str("[nightlight]\nsunrise = \"25:99\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_to_ticks() {
        let tick = Duration::from_millis(100);
        assert_eq!(duration_to_ticks(Duration::from_millis(600), tick), 6);
        assert_eq!(duration_to_ticks(Duration::from_secs(2), tick), 20);
        // floor division, matching the strict > comparator of long-click
        assert_eq!(duration_to_ticks(Duration::from_millis(250), tick), 2);
        assert_eq!(gesture_ticks(Duration::from_secs(3600), tick), u8::MAX);
    }
}

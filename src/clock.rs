//! Time-of-day collaborator and the night-light gate.
//!
//! The poll cycle needs only minutes-since-midnight resolution: local time,
//! sunrise and sunset, supplied through the [`Daylight`] trait. The
//! [`Nightlight`] gate is edge-detected once per tick and decides whether
//! the daylight-dependent automation rules run.

use chrono::{NaiveTime, Timelike};

use crate::core::config::NightlightConfig;
use crate::core::error::Result;

/// Source of local time-of-day and sun times.
pub trait Daylight {
    /// Current local time of day.
    fn local_time(&self) -> NaiveTime;

    /// Today's sunrise.
    fn sunrise(&self) -> NaiveTime;

    /// Today's sunset.
    fn sunset(&self) -> NaiveTime;
}

/// [`Daylight`] over the system clock with configured sun times.
#[derive(Debug, Clone)]
pub struct LocalDaylight {
    sunrise: NaiveTime,
    sunset: NaiveTime,
}

impl LocalDaylight {
    /// Create from explicit sun times.
    pub fn new(sunrise: NaiveTime, sunset: NaiveTime) -> Self {
        Self { sunrise, sunset }
    }

    /// Create from the night-light configuration section.
    pub fn from_config(config: &NightlightConfig) -> Result<Self> {
        Ok(Self::new(config.sunrise()?, config.sunset()?))
    }
}

impl Daylight for LocalDaylight {
    fn local_time(&self) -> NaiveTime {
        chrono::Local::now().time()
    }

    fn sunrise(&self) -> NaiveTime {
        self.sunrise
    }

    fn sunset(&self) -> NaiveTime {
        self.sunset
    }
}

/// [`Daylight`] with a fixed current time, for tests and simulations.
#[derive(Debug, Clone)]
pub struct FixedDaylight {
    /// Reported local time.
    pub now: NaiveTime,
    /// Reported sunrise.
    pub sunrise: NaiveTime,
    /// Reported sunset.
    pub sunset: NaiveTime,
}

impl Daylight for FixedDaylight {
    fn local_time(&self) -> NaiveTime {
        self.now
    }

    fn sunrise(&self) -> NaiveTime {
        self.sunrise
    }

    fn sunset(&self) -> NaiveTime {
        self.sunset
    }
}

fn minutes_since_midnight(t: NaiveTime) -> i32 {
    (t.hour() * 60 + t.minute()) as i32
}

/// Edge-detected night-light state.
///
/// Active when the current time is before sunrise plus the offset or after
/// sunset minus the offset; the offset turns lights on sooner and off
/// later. Starts active so that the first update after startup reports the
/// true state as a change when it differs.
#[derive(Debug, Clone)]
pub struct Nightlight {
    offset_min: i32,
    active: bool,
}

impl Nightlight {
    /// Create a gate with the given offset in minutes.
    pub fn new(offset_min: i32) -> Self {
        Self {
            offset_min,
            active: true,
        }
    }

    /// Whether the night-light window is currently active.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Recompute from the daylight source. Returns whether the state
    /// changed since the last update.
    pub fn update(&mut self, day: &dyn Daylight) -> bool {
        let m_sunrise = minutes_since_midnight(day.sunrise());
        let m_sunset = minutes_since_midnight(day.sunset());
        let m_now = minutes_since_midnight(day.local_time());

        let new_value =
            m_now < m_sunrise + self.offset_min || m_sunset - self.offset_min < m_now;

        let changed = self.active != new_value;
        self.active = new_value;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day_at(now: NaiveTime) -> FixedDaylight {
        FixedDaylight {
            now,
            sunrise: t(6, 0),
            sunset: t(20, 0),
        }
    }

    #[test]
    fn test_midday_is_off() {
        let mut gate = Nightlight::new(60);
        let changed = gate.update(&day_at(t(12, 0)));
        assert!(changed); // starts active, flips off
        assert!(!gate.active());
    }

    #[test]
    fn test_window_boundaries() {
        let mut gate = Nightlight::new(60);

        // 06:59 is still within sunrise + 60 min
        gate.update(&day_at(t(6, 59)));
        assert!(gate.active());

        // 07:00 is not (strict <)
        gate.update(&day_at(t(7, 0)));
        assert!(!gate.active());

        // 19:00 equals sunset - 60: not yet night (strict <)
        gate.update(&day_at(t(19, 0)));
        assert!(!gate.active());

        // 19:01 is past it
        gate.update(&day_at(t(19, 1)));
        assert!(gate.active());
    }

    #[test]
    fn test_change_edge_reported_once() {
        let mut gate = Nightlight::new(60);
        assert!(gate.update(&day_at(t(12, 0))));
        assert!(!gate.update(&day_at(t(12, 1))));
        assert!(gate.update(&day_at(t(21, 0))));
        assert!(!gate.update(&day_at(t(21, 1))));
    }
}

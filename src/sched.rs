//! One-shot delayed pin writes.
//!
//! Delayed writes are not threads or async tasks: they are declarative
//! registrations that the poll runtime fires at the right future tick. At
//! most one delayed action is pending per pin; arming a pin replaces its
//! pending write and [`TimerService::cancel`] clears it. Devices talk to
//! the [`TimerService`] seam; the runtime owns a [`DelayedWrites`] and
//! drains it at the start of every tick.

use std::collections::BTreeMap;
use std::time::Duration;

/// One-shot timer registration interface used by output devices.
pub trait TimerService {
    /// Arm (or re-arm) a delayed write of `state` to `pin` after `delay`.
    fn arm(&mut self, delay: Duration, pin: u8, state: bool);

    /// Cancel any pending delayed write for `pin`.
    fn cancel(&mut self, pin: u8);
}

/// A delayed write whose deadline has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWrite {
    /// Target pin.
    pub pin: u8,
    /// Level to drive.
    pub state: bool,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: u64,
    state: bool,
}

/// Tick-driven store of pending delayed writes.
///
/// Deadlines are kept in whole ticks; the delay is converted once at arm
/// time (rounded up, minimum one tick, so a short delay never fires within
/// the tick that armed it).
#[derive(Debug)]
pub struct DelayedWrites {
    tick_ms: u128,
    now: u64,
    pending: BTreeMap<u8, Pending>,
}

impl DelayedWrites {
    /// Create an empty store for the given tick period.
    pub fn new(tick: Duration) -> Self {
        Self {
            tick_ms: tick.as_millis().max(1),
            now: 0,
            pending: BTreeMap::new(),
        }
    }

    /// Number of pins with a pending delayed write.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The state a pin is scheduled to be driven to, if any.
    pub fn pending_for(&self, pin: u8) -> Option<bool> {
        self.pending.get(&pin).map(|p| p.state)
    }

    /// Advance one tick and take every write that came due, ordered by pin.
    pub fn advance(&mut self) -> Vec<DueWrite> {
        self.now += 1;
        let now = self.now;
        let mut due = Vec::new();
        self.pending.retain(|&pin, p| {
            if p.deadline <= now {
                due.push(DueWrite { pin, state: p.state });
                false
            } else {
                true
            }
        });
        due
    }
}

impl TimerService for DelayedWrites {
    fn arm(&mut self, delay: Duration, pin: u8, state: bool) {
        let ticks = (delay.as_millis().div_ceil(self.tick_ms)).max(1) as u64;
        self.pending.insert(
            pin,
            Pending {
                deadline: self.now + ticks,
                state,
            },
        );
    }

    fn cancel(&mut self, pin: u8) {
        self.pending.remove(&pin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timers() -> DelayedWrites {
        DelayedWrites::new(Duration::from_millis(100))
    }

    #[test]
    fn test_fires_at_deadline() {
        let mut t = timers();
        t.arm(Duration::from_millis(300), 5, false);

        assert!(t.advance().is_empty());
        assert!(t.advance().is_empty());
        let due = t.advance();
        assert_eq!(due, vec![DueWrite { pin: 5, state: false }]);
        assert_eq!(t.pending_count(), 0);
    }

    #[test]
    fn test_one_pending_per_pin() {
        let mut t = timers();
        t.arm(Duration::from_secs(60), 7, false);
        t.arm(Duration::from_millis(100), 7, true);
        assert_eq!(t.pending_count(), 1);

        let due = t.advance();
        assert_eq!(due, vec![DueWrite { pin: 7, state: true }]);
    }

    #[test]
    fn test_cancel() {
        let mut t = timers();
        t.arm(Duration::from_millis(100), 3, true);
        t.cancel(3);
        assert!(t.advance().is_empty());
    }

    #[test]
    fn test_zero_delay_fires_next_tick() {
        let mut t = timers();
        t.arm(Duration::ZERO, 1, true);
        assert_eq!(t.advance().len(), 1);
    }

    #[test]
    fn test_due_ordering_by_pin() {
        let mut t = timers();
        t.arm(Duration::from_millis(50), 9, false);
        t.arm(Duration::from_millis(50), 2, true);
        let due: Vec<u8> = t.advance().iter().map(|w| w.pin).collect();
        assert_eq!(due, vec![2, 9]);
    }

    #[test]
    fn test_delay_rounds_up() {
        let mut t = timers();
        // 150 ms at a 100 ms tick arms for two ticks out
        t.arm(Duration::from_millis(150), 4, true);
        assert!(t.advance().is_empty());
        assert_eq!(t.advance().len(), 1);
    }
}

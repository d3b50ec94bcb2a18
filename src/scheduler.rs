//! Decides which source owns the display.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource {
    Clock,
    Temperature,
}

/// When the temperature interrupts the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub temperature_enabled: bool,
    /// Time spent on the clock between two temperature displays.
    pub repeat_interval: Duration,
    /// How long the temperature stays on.
    pub duration: Duration,
}

#[derive(Debug)]
pub struct Scheduler {
    schedule: Schedule,
    active: ActiveSource,
    last_switch: Instant,
}

impl Scheduler {
    pub fn new(schedule: Schedule, start: Instant) -> Self {
        Self {
            schedule,
            active: ActiveSource::Clock,
            last_switch: start,
        }
    }

    pub fn active(&self) -> ActiveSource {
        self.active
    }

    /// Moves the state machine to `now`, returns the new source if it switched.
    pub fn advance(&mut self, now: Instant) -> Option<ActiveSource> {
        let elapsed = now.saturating_duration_since(self.last_switch);

        let next = match self.active {
            ActiveSource::Clock
                if self.schedule.temperature_enabled && elapsed > self.schedule.repeat_interval =>
            {
                ActiveSource::Temperature
            }
            ActiveSource::Temperature if elapsed > self.schedule.duration => ActiveSource::Clock,
            _ => return None,
        };

        tracing::info!(from = ?self.active, to = ?next, ?elapsed, "Switching source");
        self.active = next;
        self.last_switch = now;
        Some(next)
    }
}

//! The dwell-time accumulator.

use std::time::Instant;

/// Per-region accumulation state: a sub-threshold fractional accumulator and
/// the timestamp of the last cycle.
///
/// Presence credit queues up in `fractional`; whole seconds are moved out by
/// the commit policy, which quantizes persistence writes to at most one per
/// second per active region regardless of cycle frequency. Absence never
/// decays queued credit. The state is transient: a restart loses only the
/// sub-second remainder, never committed dwell time.
#[derive(Debug, Clone)]
pub struct DwellClock {
    fractional: f64,
    last_tick: Instant,
}

impl DwellClock {
    pub fn new(now: Instant) -> Self {
        Self {
            fractional: 0.0,
            last_tick: now,
        }
    }

    /// Run one accumulation cycle.
    ///
    /// Returns the number of whole seconds committed this cycle (usually 0
    /// or 1; more when a single `dt` exceeds one second).
    pub fn tick(&mut self, now: Instant, present: bool) -> f64 {
        let dt = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if present {
            self.fractional += dt.as_secs_f64();
        }

        let mut committed = 0.0;
        while self.fractional >= 1.0 {
            self.fractional -= 1.0;
            committed += 1.0;
        }
        committed
    }

    /// Advance the cycle timestamp without accumulating.
    ///
    /// Used when the cycle is skipped (empty crop, detection failure) so the
    /// next active cycle does not see an artificial `dt` spike.
    pub fn skip(&mut self, now: Instant) {
        self.last_tick = now;
    }

    /// Queued sub-second credit, always in `[0, 1)`.
    pub fn fractional(&self) -> f64 {
        self.fractional
    }
}

//! Quantized simulation time.
//!
//! The host advances time as a real number of hours since simulation start.
//! Every lookup, window bound and plan index is expressed as a [`TimeKey`]:
//! the time in tenths of an hour, obtained by **rounding** `hours * 10`.
//! Rounding is used everywhere (table loading, planning, mode lookups) so
//! producer and consumer can never disagree by one step.

use std::fmt;

/// Number of quantization steps per hour.
pub const STEPS_PER_HOUR: i64 = 10;

/// Length of one quantization step in hours (6 minutes).
pub const STEP_HOURS: f64 = 1.0 / STEPS_PER_HOUR as f64;

/// Hours in a simulated day.
pub const HOURS_PER_DAY: i64 = 24;

/// Days in a simulated year.
pub const DAYS_PER_YEAR: u32 = 365;

const STEPS_PER_DAY: i64 = STEPS_PER_HOUR * HOURS_PER_DAY;

/// Fixed-point time index in tenths of an hour.
///
/// # Examples
///
/// ```
/// use tes_seasonal_control::sim::time::TimeKey;
///
/// let key = TimeKey::from_hours(10.0);
/// assert_eq!(key.index(), 100);
/// assert_eq!(key.offset(40).hours(), 14.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeKey(i64);

impl TimeKey {
    /// Wraps a raw step index.
    pub const fn new(index: i64) -> Self {
        Self(index)
    }

    /// Quantizes a time in hours, rounding half away from zero.
    pub fn from_hours(hours: f64) -> Self {
        Self((hours * STEPS_PER_HOUR as f64).round() as i64)
    }

    /// Raw step index.
    pub const fn index(self) -> i64 {
        self.0
    }

    /// Time in hours represented by this key.
    pub fn hours(self) -> f64 {
        self.0 as f64 / STEPS_PER_HOUR as f64
    }

    /// Key `steps` quantization steps later (earlier when negative).
    pub const fn offset(self, steps: i64) -> Self {
        Self(self.0 + steps)
    }

    /// Number of steps from `earlier` to `self`.
    pub const fn steps_since(self, earlier: Self) -> i64 {
        self.0 - earlier.0
    }

    /// Returns `true` when the key falls on a whole hour.
    pub const fn is_whole_hour(self) -> bool {
        self.0.rem_euclid(STEPS_PER_HOUR) == 0
    }

    /// Hour of day (0..24) the key falls in.
    pub const fn hour_of_day(self) -> i64 {
        self.0.div_euclid(STEPS_PER_HOUR).rem_euclid(HOURS_PER_DAY)
    }

    /// Simulated day index (0-based) since simulation start.
    pub const fn day_index(self) -> i64 {
        self.0.div_euclid(STEPS_PER_DAY)
    }

    /// Fractional hour of day in `[0, 24)`.
    pub fn hour_fraction(self) -> f64 {
        self.0.rem_euclid(STEPS_PER_DAY) as f64 / STEPS_PER_HOUR as f64
    }

    /// Calendar day of year (1..=365) for a run that starts on `start_day`.
    pub fn day_of_year(self, start_day: u32) -> u32 {
        let offset = i64::from(start_day.clamp(1, DAYS_PER_YEAR) - 1);
        ((offset + self.day_index()).rem_euclid(i64::from(DAYS_PER_YEAR)) + 1) as u32
    }
}

impl fmt::Display for TimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}h", self.hours())
    }
}

/// Converts a duration in hours to a whole number of quantization steps.
pub fn steps_for(hours: f64) -> i64 {
    (hours * STEPS_PER_HOUR as f64).round() as i64
}

/// Returns `true` when the raw host time `time_h` is exactly the daily
/// decision instant for `decision_hour`.
///
/// Checked before quantization: 5.95 h rounds onto the 6.0 h key but is not a
/// decision instant.
pub fn is_decision_time(time_h: f64, decision_hour: u32) -> bool {
    time_h.is_finite()
        && time_h.fract() == 0.0
        && (time_h as i64).rem_euclid(HOURS_PER_DAY) == i64::from(decision_hour)
}

//! Common types and traits for synthetic site profiles.

use rand::{Rng, rngs::StdRng};

use crate::forecast::ForecastTable;
use crate::sim::time::TimeKey;

/// A time-varying site quantity sampled on the quantized grid.
///
/// Implemented by the synthetic PV and baseline-demand generators so the
/// forecast tables and the live readings of the offline host come from the
/// same shapes.
pub trait Profile {
    /// Returns the value at `key` in watts.
    ///
    /// Implementations with noise advance their RNG on every call, so a fresh
    /// generator with the same seed reproduces the same sequence.
    fn value_w(&mut self, key: TimeKey) -> f64;

    /// Returns a human-readable type name for the profile.
    fn profile_type(&self) -> &'static str;
}

/// Samples `profile` at every key of `[start, end)` into a forecast table.
pub fn tabulate(profile: &mut impl Profile, start: TimeKey, end: TimeKey) -> ForecastTable {
    let len = end.steps_since(start).max(0);
    ForecastTable::from_keyed((0..len).map(|i| {
        let key = start.offset(i);
        (key, profile.value_w(key))
    }))
}

/// Half-cosine daylight fraction for a fractional hour of day.
///
/// Zero before `sunrise_h` and from `sunset_h` on, peaking at 1.0 at solar
/// noon halfway between them.
pub fn daylight_frac(hour: f64, sunrise_h: f64, sunset_h: f64) -> f64 {
    if hour < sunrise_h || hour >= sunset_h || sunset_h <= sunrise_h {
        return 0.0;
    }
    let x = (hour - sunrise_h) / (sunset_h - sunrise_h);
    (std::f64::consts::PI * x).sin().max(0.0)
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-9, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

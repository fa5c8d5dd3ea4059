use crate::devices::types::{Profile, daylight_frac, gaussian_noise};
use crate::sim::time::{DAYS_PER_YEAR, TimeKey};
use rand::{SeedableRng, rngs::StdRng};

/// Day of year with the longest, strongest production.
const SUMMER_PEAK_DAY: f64 = 172.0;

/// A solar PV generator that models production from daylight and season.
///
/// `SolarPv` creates a half-cosine shaped profile between sunrise and sunset,
/// scaled by a yearly factor that drops to `winter_factor` of peak in
/// mid-winter, with multiplicative Gaussian noise for weather.
///
/// Production is returned as a **positive** value in watts.
#[derive(Debug, Clone)]
pub struct SolarPv {
    /// Maximum production in watts on a clear summer noon.
    pub w_peak: f64,

    /// Fractional hour of sunrise.
    pub sunrise_h: f64,

    /// Fractional hour of sunset.
    pub sunset_h: f64,

    /// Fraction of `w_peak` reachable on the darkest day (0..=1).
    pub winter_factor: f64,

    /// Calendar day of year at simulation start.
    pub start_day: u32,

    /// Standard deviation of the noise as a fraction of output.
    pub noise_std: f64,

    rng: StdRng,
}

impl SolarPv {
    /// Creates a new solar PV generator.
    ///
    /// # Arguments
    ///
    /// * `w_peak` - Peak production in watts (clamped to >= 0)
    /// * `sunrise_h` - Sunrise hour
    /// * `sunset_h` - Sunset hour
    /// * `winter_factor` - Winter output relative to summer (clamped to 0..=1)
    /// * `start_day` - Day of year at simulation start
    /// * `noise_std` - Standard deviation of noise (e.g., 0.05 for +/-5% variation)
    /// * `seed` - Random seed for reproducible noise generation
    ///
    /// # Panics
    ///
    /// Panics if `sunrise_h >= sunset_h`.
    pub fn new(
        w_peak: f64,
        sunrise_h: f64,
        sunset_h: f64,
        winter_factor: f64,
        start_day: u32,
        noise_std: f64,
        seed: u64,
    ) -> Self {
        assert!(sunrise_h < sunset_h);
        Self {
            w_peak: w_peak.max(0.0),
            sunrise_h,
            sunset_h,
            winter_factor: winter_factor.clamp(0.0, 1.0),
            start_day,
            noise_std: noise_std.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Yearly production factor for a day of year, 1.0 at midsummer.
    pub fn seasonal_factor(&self, day_of_year: u32) -> f64 {
        let angle = 2.0 * std::f64::consts::PI * (f64::from(day_of_year) - SUMMER_PEAK_DAY)
            / f64::from(DAYS_PER_YEAR);
        let summer = (1.0 + angle.cos()) / 2.0;
        self.winter_factor + (1.0 - self.winter_factor) * summer
    }
}

impl Profile for SolarPv {
    /// Returns 0.0 at night; never negative.
    fn value_w(&mut self, key: TimeKey) -> f64 {
        let frac = daylight_frac(key.hour_fraction(), self.sunrise_h, self.sunset_h);
        if frac <= 0.0 {
            return 0.0;
        }

        let season = self.seasonal_factor(key.day_of_year(self.start_day));
        let noise_mult = 1.0 + gaussian_noise(&mut self.rng, self.noise_std);
        (self.w_peak * frac * season * noise_mult).max(0.0)
    }

    fn profile_type(&self) -> &'static str {
        "SolarPV"
    }
}

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::{Profile, gaussian_noise};
use crate::sim::time::{HOURS_PER_DAY, TimeKey};

/// A baseload generator that models the building's electrical consumption.
///
/// `BaseLoad` creates a sinusoidal daily demand pattern with configurable
/// baseline, amplitude, phase, and Gaussian noise. It supplies both the
/// baseline forecast table and the measured total consumption of the
/// offline host.
///
/// # Examples
///
/// ```
/// use tes_seasonal_control::devices::baseload::BaseLoad;
/// use tes_seasonal_control::devices::types::Profile;
/// use tes_seasonal_control::sim::time::TimeKey;
///
/// let mut load = BaseLoad::new(
///     3_000.0, // base_w - average consumption
///     1_500.0, // amp_w - daily variation
///     0.0,     // phase_rad
///     0.0,     // noise_std
///     42,      // seed
/// );
///
/// let demand = load.value_w(TimeKey::from_hours(6.0));
/// assert!((demand - 4_500.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    /// Baseline consumption in watts
    pub base_w: f64,

    /// Amplitude of the sinusoidal variation in watts
    pub amp_w: f64,

    /// Phase offset of the sinusoidal pattern in radians
    pub phase_rad: f64,

    /// Standard deviation of the Gaussian noise in watts
    pub noise_std: f64,

    rng: StdRng,
}

impl BaseLoad {
    /// Creates a new baseload generator.
    ///
    /// # Arguments
    ///
    /// * `base_w` - The baseline consumption in watts
    /// * `amp_w` - The amplitude of sinusoidal daily variation in watts
    /// * `phase_rad` - The phase offset in radians
    /// * `noise_std` - The standard deviation of Gaussian noise in watts
    /// * `seed` - Random seed for reproducible noise generation
    pub fn new(base_w: f64, amp_w: f64, phase_rad: f64, noise_std: f64, seed: u64) -> Self {
        Self {
            base_w,
            amp_w,
            phase_rad,
            noise_std,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Profile for BaseLoad {
    /// Consumption at `key`, never negative.
    fn value_w(&mut self, key: TimeKey) -> f64 {
        let day_pos = key.hour_fraction() / HOURS_PER_DAY as f64; // [0,1)
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        let noise = gaussian_noise(&mut self.rng, self.noise_std);

        let w = self.base_w + self.amp_w * angle.sin() + noise;
        w.max(0.0)
    }

    fn profile_type(&self) -> &'static str {
        "BaseLoad"
    }
}

use rand::{SeedableRng, rngs::StdRng};

use crate::devices::types::gaussian_noise;
use crate::forecast::DemandTable;
use crate::sim::time::DAYS_PER_YEAR;
use crate::sim::types::DemandMetric;

/// Yearly building thermal demand.
///
/// Produces the day-keyed demand metric in either representation: a
/// normalized fraction around 0.5 or a signed daily energy around zero. The
/// metric follows a cosine over the year that peaks (heating) on `peak_day`
/// and bottoms out (cooling) half a year later.
#[derive(Debug, Clone)]
pub struct SeasonalDemand {
    pub metric: DemandMetric,
    /// Swing of the metric around its season threshold.
    pub amplitude: f64,
    /// Day of year with the highest heating demand.
    pub peak_day: u32,
    /// Day-to-day noise as a fraction of `amplitude`.
    pub noise_std: f64,
    /// Peak user thermal demand in watts at full seasonal intensity.
    pub peak_demand_w: f64,
    rng: StdRng,
}

impl SeasonalDemand {
    pub fn new(
        metric: DemandMetric,
        amplitude: f64,
        peak_day: u32,
        noise_std: f64,
        peak_demand_w: f64,
        seed: u64,
    ) -> Self {
        Self {
            metric,
            amplitude: amplitude.abs(),
            peak_day,
            noise_std: noise_std.max(0.0),
            peak_demand_w: peak_demand_w.max(0.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Demand metric for one day of year, including noise.
    pub fn metric_for_day(&mut self, day_of_year: u32) -> f64 {
        let angle = 2.0 * std::f64::consts::PI
            * (f64::from(day_of_year) - f64::from(self.peak_day))
            / f64::from(DAYS_PER_YEAR);
        let swing = self.amplitude * (angle.cos() + gaussian_noise(&mut self.rng, self.noise_std));
        match self.metric {
            DemandMetric::Normalized => (0.5 + swing).clamp(0.0, 1.0),
            DemandMetric::DailyEnergy => swing,
        }
    }

    /// Full-year table for days `1..=365`.
    pub fn table(&mut self) -> DemandTable {
        let rows: Vec<(u32, f64)> = (1..=DAYS_PER_YEAR)
            .map(|day| (day, self.metric_for_day(day)))
            .collect();
        DemandTable::from_pairs(rows)
    }

    /// Seasonal intensity in `[0, 1]`: how far the metric sits from the
    /// heat/cool threshold relative to the configured swing.
    pub fn intensity(&self, metric_value: f64) -> f64 {
        if self.amplitude <= 0.0 {
            return 0.0;
        }
        let distance = (metric_value - self.metric.season_threshold()).abs();
        (distance / self.amplitude).min(1.0)
    }

    /// Live user thermal demand in watts for a day's metric.
    pub fn user_demand_w(&self, metric_value: f64) -> f64 {
        self.peak_demand_w * self.intensity(metric_value)
    }
}

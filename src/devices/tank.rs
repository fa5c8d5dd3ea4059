use crate::sim::types::{Season, TesMode};

/// A seasonal thermal energy storage tank used as the offline host's plant.
///
/// `TesTank` tracks a single state of charge. Heat charging raises it, cool
/// charging lowers it, and serving user demand through the pump moves it
/// back toward the season's discharged end. The SOC may overshoot `[0, 1]`
/// by up to `overshoot` so that target-crossing logic sees the excursion.
///
/// # Energy Convention
/// SOC 1.0 holds `max_q_kwh`, SOC 0.0 holds `min_q_kwh`. A full heat tank is
/// hot, a full cool tank is cold (SOC near 0).
#[derive(Debug, Clone)]
pub struct TesTank {
    /// State of charge as a fraction (nominally 0.0 to 1.0).
    pub soc: f64,

    /// Stored energy at SOC 1.0 (kWh).
    pub max_q_kwh: f64,

    /// Stored energy at SOC 0.0 (kWh).
    pub min_q_kwh: f64,

    /// Thermal power delivered while charging (W).
    pub charge_power_w: f64,

    /// Tank temperature at SOC 0.0 (°C).
    pub t_empty_c: f64,

    /// Tank temperature at SOC 1.0 (°C).
    pub t_full_c: f64,

    /// Largest excursion beyond `[0, 1]` the SOC may take.
    pub overshoot: f64,
}

impl TesTank {
    /// Creates a new tank.
    ///
    /// # Panics
    ///
    /// Panics if `max_q_kwh <= min_q_kwh`, the initial SOC is outside
    /// `[0, 1]` or the charge power is negative.
    pub fn new(
        soc: f64,
        max_q_kwh: f64,
        min_q_kwh: f64,
        charge_power_w: f64,
        t_empty_c: f64,
        t_full_c: f64,
    ) -> Self {
        assert!(max_q_kwh > min_q_kwh);
        assert!((0.0..=1.0).contains(&soc));
        assert!(charge_power_w >= 0.0);

        Self {
            soc,
            max_q_kwh,
            min_q_kwh,
            charge_power_w,
            t_empty_c,
            t_full_c,
            overshoot: 0.1,
        }
    }

    /// Usable capacity band (kWh).
    pub fn q_band_kwh(&self) -> f64 {
        self.max_q_kwh - self.min_q_kwh
    }

    /// Cumulative stored energy (kWh).
    pub fn total_q_kwh(&self) -> f64 {
        self.min_q_kwh + self.soc * self.q_band_kwh()
    }

    /// Temperature at the bottom of the tank (°C), linear in SOC.
    pub fn t_bottom_c(&self) -> f64 {
        self.t_empty_c + self.soc * (self.t_full_c - self.t_empty_c)
    }

    /// Advances the tank by `dt_hours`.
    ///
    /// # Arguments
    ///
    /// * `mode` - Charge mode commanded this step
    /// * `pump` - Pump command; with `mode == Off` it serves `demand_w` from storage
    /// * `season` - Season, deciding which way serving moves the SOC
    /// * `demand_w` - User thermal demand (W)
    /// * `dt_hours` - Step duration (h)
    pub fn advance(&mut self, mode: TesMode, pump: bool, season: Season, demand_w: f64, dt_hours: f64) {
        let band_wh = self.q_band_kwh() * 1_000.0;
        let charge = self.charge_power_w * dt_hours / band_wh;
        let served = demand_w.max(0.0) * dt_hours / band_wh;

        let delta = match (mode, pump, season) {
            (TesMode::Heat, _, _) => charge,
            (TesMode::Cool, _, _) => -charge,
            (TesMode::Off, true, Season::Heat) => -served,
            (TesMode::Off, true, Season::Cool) => served,
            (TesMode::Off, false, _) => 0.0,
        };
        self.soc = (self.soc + delta).clamp(-self.overshoot, 1.0 + self.overshoot);
    }
}

//! Storage circulation pump decision.

use super::types::{Season, SensorSnapshot, TesMode};

/// SOC levels at which the TES counts as fully discharged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DischargeThresholds {
    /// Heat season: discharged at or below this SOC.
    pub heat: f64,
    /// Cool season: discharged at or above this SOC.
    pub cool: f64,
}

impl DischargeThresholds {
    fn soc_discharged(&self, soc: f64, season: Season) -> bool {
        match season {
            Season::Heat => soc <= self.heat,
            Season::Cool => soc >= self.cool,
        }
    }
}

/// In heating the tank is spent once its bottom is no warmer than the
/// distribution loop; in cooling once it is no colder.
fn temperature_discharged(t_bottom_c: f64, t_mix_c: f64, season: Season) -> bool {
    match season {
        Season::Heat => t_bottom_c <= t_mix_c,
        Season::Cool => t_bottom_c >= t_mix_c,
    }
}

/// Pump enable for one timestep. Holds no state across steps.
///
/// Charging always runs the pump. Otherwise the pump serves user demand from
/// storage when no PV surplus is available, demand is nonzero and the tank is
/// discharged by neither SOC nor temperature.
pub fn pump_enabled(
    mode: TesMode,
    snapshot: &SensorSnapshot,
    season: Season,
    pv_surplus_w: f64,
    thresholds: &DischargeThresholds,
) -> bool {
    if mode != TesMode::Off {
        return true;
    }
    pv_surplus_w == 0.0
        && snapshot.demand_w != 0.0
        && !thresholds.soc_discharged(snapshot.soc, season)
        && !temperature_discharged(snapshot.t_bottom_c, snapshot.t_mix_c, season)
}

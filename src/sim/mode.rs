//! TES charge-mode state machine.

use tracing::info;

use super::planner::ChargePlan;
use super::time::TimeKey;
use super::types::{Season, TesMode};

/// Decides the TES charge mode for one timestep and clears the plan on overshoot.
///
/// Charging is enabled when the plan allows `now`, the plan's mode matches the
/// live `season`, and the SOC has not passed `target` (at or below it for heat,
/// at or above it for cool). Independently, once the SOC is past the target in
/// the plan's mode the plan is dropped, so charging stops before the window ends.
pub fn decide_mode(
    plan: &mut ChargePlan,
    now: TimeKey,
    soc: f64,
    season: Season,
    target: f64,
) -> TesMode {
    let planned = plan.mode();

    let mut mode = TesMode::Off;
    if plan.allows(now) && planned == TesMode::from(season) {
        mode = match planned {
            TesMode::Heat if soc <= target => TesMode::Heat,
            TesMode::Cool if soc >= target => TesMode::Cool,
            _ => TesMode::Off,
        };
    }

    let overshoot = match planned {
        TesMode::Heat => soc > target,
        TesMode::Cool => soc < target,
        TesMode::Off => false,
    };
    if overshoot {
        info!(%now, soc, target, mode = ?planned, "charge target reached, plan cleared");
        *plan = ChargePlan::NoCharge;
    }

    mode
}

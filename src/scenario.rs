//! Builds forecasts, plant and engine from a validated scenario.

use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::{BaseLoad, SeasonalDemand, SolarPv, TesTank, types::tabulate};
use crate::error::ForecastError;
use crate::forecast::{DemandTable, ForecastRepository, ForecastTable};
use crate::sim::controller::SeasonalController;
use crate::sim::engine::{Engine, EngineConfig};
use crate::sim::planner::Planner;
use crate::sim::time::steps_for;

/// Seed offsets keep the generator RNGs uncorrelated.
const PV_SEED_OFFSET: u64 = 1;
const EL_SEED_OFFSET: u64 = 2;
const DEMAND_SEED_OFFSET: u64 = 3;
const READING_SEED_OFFSET: u64 = 57;

/// Yearly demand model used for the synthetic table and the live user demand.
pub fn demand_model(cfg: &ScenarioConfig) -> SeasonalDemand {
    let f = &cfg.forecast;
    SeasonalDemand::new(
        cfg.control.demand_metric,
        f.demand_amplitude,
        f.demand_peak_day,
        f.demand_noise_std,
        cfg.plant.peak_demand_w,
        cfg.simulation.seed.wrapping_add(DEMAND_SEED_OFFSET),
    )
}

/// Loads every configured CSV table and generates the rest.
///
/// Synthetic time tables cover the run plus one prediction horizon so the
/// last day's plan sees a full forecast.
///
/// # Errors
///
/// Returns a `ForecastError` if a configured table cannot be loaded.
pub fn build_forecasts(cfg: &ScenarioConfig) -> Result<ForecastRepository, ForecastError> {
    let f = &cfg.forecast;
    let seed = cfg.simulation.seed;
    let (start, end) = cfg.run_keys();
    let table_end = end.offset(steps_for(cfg.control.horizon_hours));

    let pv = match &f.pv_path {
        Some(path) => ForecastTable::from_csv_path(path)?,
        None => {
            let mut pv = SolarPv::new(
                f.pv_peak_w,
                f.sunrise_h,
                f.sunset_h,
                f.pv_winter_factor,
                cfg.simulation.start_day,
                f.pv_noise_std,
                seed.wrapping_add(PV_SEED_OFFSET),
            );
            tabulate(&mut pv, start, table_end)
        }
    };

    let el_baseline = match &f.el_baseline_path {
        Some(path) => ForecastTable::from_csv_path(path)?,
        None => {
            let mut load = BaseLoad::new(
                f.el_base_w,
                f.el_amp_w,
                f.el_phase_rad,
                f.el_noise_std,
                seed.wrapping_add(EL_SEED_OFFSET),
            );
            tabulate(&mut load, start, table_end)
        }
    };

    let demand: DemandTable = match &f.demand_path {
        Some(path) => DemandTable::from_csv_path(path)?,
        None => demand_model(cfg).table(),
    };

    info!(
        pv = pv.len(),
        el_baseline = el_baseline.len(),
        demand_days = demand.len(),
        "forecast tables ready"
    );
    Ok(ForecastRepository::new(pv, el_baseline, demand))
}

/// Builds the storage plant at its initial state.
///
/// # Panics
///
/// Panics on plant parameters that [`ScenarioConfig::validate`] rejects.
pub fn build_tank(cfg: &ScenarioConfig) -> TesTank {
    let p = &cfg.plant;
    TesTank::new(
        p.initial_soc,
        cfg.storage.max_q_tes_kwh,
        cfg.storage.min_q_tes_kwh,
        p.charge_power_w,
        p.t_empty_c,
        p.t_full_c,
    )
}

/// Builds a ready-to-run engine around `planner`.
///
/// # Errors
///
/// Returns a `ForecastError` if a configured table cannot be loaded.
pub fn build_engine<P: Planner>(
    cfg: &ScenarioConfig,
    planner: P,
) -> Result<Engine<P>, ForecastError> {
    let forecasts = build_forecasts(cfg)?;
    let controller = SeasonalController::new(cfg.control_params(), planner, forecasts);
    let (start, end) = cfg.run_keys();
    let s = &cfg.simulation;
    let engine_config = EngineConfig {
        start,
        end,
        stride: steps_for(s.step_hours),
        start_day: s.start_day,
        iterations_per_step: s.iterations_per_step,
        heat_mix_c: cfg.plant.heat_mix_c,
        cool_mix_c: cfg.plant.cool_mix_c,
        reading_noise_std: cfg.plant.reading_noise_std,
        seed: s.seed.wrapping_add(READING_SEED_OFFSET),
    };
    Ok(Engine::new(
        engine_config,
        controller,
        build_tank(cfg),
        demand_model(cfg),
    ))
}

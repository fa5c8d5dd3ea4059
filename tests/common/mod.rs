//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use tes_seasonal_control::devices::{SeasonalDemand, TesTank};
use tes_seasonal_control::forecast::{DemandTable, ForecastRepository, ForecastTable};
use tes_seasonal_control::sim::controller::{ControlParams, SeasonalController};
use tes_seasonal_control::sim::engine::{Engine, EngineConfig};
use tes_seasonal_control::sim::planner::{FixedSpanPlanner, GreedyPlanner, Planner};
use tes_seasonal_control::sim::pump::DischargeThresholds;
use tes_seasonal_control::sim::time::TimeKey;
use tes_seasonal_control::sim::types::DemandMetric;

/// Steps per simulated day at the 0.1 h quantization.
pub const DAY_STEPS: i64 = 240;

/// Control parameters with decision hour 6 and a 100 kWh usable band.
pub fn params(demand_metric: DemandMetric) -> ControlParams {
    ControlParams {
        decision_hour: 6,
        demand_metric,
        discharge: DischargeThresholds {
            heat: 0.05,
            cool: 0.95,
        },
        max_q_tes: 140.0,
        min_q_tes: 40.0,
    }
}

/// Forecasts covering `days + 1` days: 5 W overproduction over hours
/// `[10, 14]` each day, zero PV elsewhere, zero baseline and a constant
/// demand metric for days `1..=demand_days`.
pub fn overproduction_forecasts(days: i64, demand_days: u32, metric: f64) -> ForecastRepository {
    let keys = (0..(days + 1) * DAY_STEPS).map(TimeKey::new);
    let pv = keys.clone().map(|k| {
        let on = (100..=140).contains(&(k.index() % DAY_STEPS));
        (k, if on { 5.0 } else { 0.0 })
    });
    ForecastRepository::new(
        ForecastTable::from_keyed(pv),
        ForecastTable::from_keyed(keys.map(|k| (k, 0.0))),
        DemandTable::from_pairs((1..=demand_days).map(|d| (d, metric))),
    )
}

/// Four-hour fixed span over a 24 h horizon, charging up to full.
pub fn fixed_span_planner() -> FixedSpanPlanner {
    FixedSpanPlanner {
        horizon_steps: DAY_STEPS,
        span_steps: 40,
        min_pv_w: 0.0,
        max_soc: 1.0,
        min_soc: 0.0,
    }
}

/// Greedy planner requiring 5 W of PV margin and runs of at least 0.5 h.
pub fn greedy_planner() -> GreedyPlanner {
    GreedyPlanner {
        horizon_steps: DAY_STEPS,
        min_span_steps: 5,
        min_pv_w: 5.0,
        simulation_end: None,
        max_soc: 1.0,
        min_soc: 0.0,
        q_band: 100.0,
    }
}

/// Noise-free run over `days` days with three host iterations per step.
pub fn engine_config(days: i64) -> EngineConfig {
    EngineConfig {
        start: TimeKey::new(0),
        end: TimeKey::new(days * DAY_STEPS),
        stride: 1,
        start_day: 1,
        iterations_per_step: 3,
        heat_mix_c: 30.0,
        cool_mix_c: 16.0,
        reading_noise_std: 0.0,
        seed: 7,
    }
}

/// 100 kWh band charged at 10 kW: 0.01 SOC per 0.1 h step.
pub fn tank(soc: f64) -> TesTank {
    TesTank::new(soc, 140.0, 40.0, 10_000.0, 10.0, 60.0)
}

/// Engine around `planner` with zero user demand, so the SOC only moves
/// while charging.
pub fn engine<P: Planner>(
    planner: P,
    demand_metric: DemandMetric,
    forecasts: ForecastRepository,
    days: i64,
    initial_soc: f64,
) -> Engine<P> {
    engine_with(planner, demand_metric, forecasts, engine_config(days), initial_soc)
}

/// Like [`engine`], with an explicit run configuration.
pub fn engine_with<P: Planner>(
    planner: P,
    demand_metric: DemandMetric,
    forecasts: ForecastRepository,
    config: EngineConfig,
    initial_soc: f64,
) -> Engine<P> {
    let controller = SeasonalController::new(params(demand_metric), planner, forecasts);
    Engine::new(
        config,
        controller,
        tank(initial_soc),
        SeasonalDemand::new(demand_metric, 0.4, 15, 0.0, 0.0, 1),
    )
}

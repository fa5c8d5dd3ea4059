//! Offline simulation host that drives the controller against a tank plant.

use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};

use crate::devices::types::gaussian_noise;
use crate::devices::{SeasonalDemand, TesTank};
use crate::error::ControlError;

use super::clock::Clock;
use super::controller::SeasonalController;
use super::host::SlotBank;
use super::planner::{PlanTraceRow, Planner};
use super::time::{STEP_HOURS, TimeKey};
use super::types::{Season, SensorSnapshot, StepRecord};

/// Run parameters of the offline host.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// First simulated key.
    pub start: TimeKey,
    /// First key after the run.
    pub end: TimeKey,
    /// Quantization steps per host timestep.
    pub stride: i64,
    /// Calendar day of year at `start`.
    pub start_day: u32,
    /// Controller invocations per timestep, emulating host convergence iterations.
    pub iterations_per_step: usize,
    /// Distribution loop temperature in the heat season (°C).
    pub heat_mix_c: f64,
    /// Distribution loop temperature in the cool season (°C).
    pub cool_mix_c: f64,
    /// Relative noise on live PV and consumption readings.
    pub reading_noise_std: f64,
    pub seed: u64,
}

/// Simulation engine owning the controller, the tank and the live site readings.
///
/// Generic over `P: Planner` for static dispatch, like the controller it drives.
pub struct Engine<P: Planner> {
    config: EngineConfig,
    clock: Clock,
    controller: SeasonalController<P>,
    tank: TesTank,
    demand: SeasonalDemand,
    rng: StdRng,
    plan_trace: Vec<PlanTraceRow>,
}

impl<P: Planner> Engine<P> {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Run parameters
    /// * `controller` - Controller under test, owning the forecast repository
    /// * `tank` - Storage plant, starting at its initial SOC
    /// * `demand` - Yearly demand model translating the daily metric into user demand
    pub fn new(
        config: EngineConfig,
        controller: SeasonalController<P>,
        tank: TesTank,
        demand: SeasonalDemand,
    ) -> Self {
        let clock = Clock::new(config.start, config.end, config.stride);
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            clock,
            controller,
            tank,
            demand,
            rng,
            plan_trace: Vec::new(),
        }
    }

    /// Executes one host timestep at `key` and returns the processed record.
    ///
    /// # Errors
    ///
    /// Propagates the controller's `ControlError`; the run must stop.
    pub fn step(&mut self, key: TimeKey) -> Result<StepRecord, ControlError> {
        let time_h = key.hours();
        let snapshot = self.sense(key);

        // 1. Host iterations at the same time; only the first one computes
        let mut bank = SlotBank::new(time_h, &snapshot);
        for _ in 0..self.config.iterations_per_step.max(1) {
            self.controller.on_host_call(&mut bank)?;
        }

        // 2. Record the step and the plan made at it, as decided
        let state = self.controller.state();
        let record = state.record(time_h);
        if record.planned {
            let planner = self.controller.planner();
            self.plan_trace.extend(state.decided_plan.trace(
                key,
                planner.horizon_steps(),
                self.controller.forecasts(),
                planner.min_pv_w(),
            ));
        }

        // 3. Apply the commands to the plant
        let dt_hours = self.config.stride as f64 * STEP_HOURS;
        self.tank.advance(
            record.outputs.mode(),
            record.outputs.pump,
            record.season,
            snapshot.demand_w,
            dt_hours,
        );

        Ok(record)
    }

    /// Executes all remaining timesteps and returns the step records.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal `ControlError`.
    pub fn run(&mut self) -> Result<Vec<StepRecord>, ControlError> {
        let mut records = Vec::with_capacity(self.clock.remaining());
        info!(
            planner = self.controller.planner().name(),
            steps = self.clock.remaining(),
            "starting run"
        );
        while let Some(key) = self.clock.tick() {
            match self.step(key) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(%key, completed = records.len(), "run halted");
                    return Err(e);
                }
            }
        }
        info!(
            steps = records.len(),
            plans = self.controller.state().plans_made,
            final_soc = self.tank.soc,
            "run complete"
        );
        Ok(records)
    }

    /// Live readings delivered to the controller at `key`.
    fn sense(&mut self, key: TimeKey) -> SensorSnapshot {
        let day_of_year = key.day_of_year(self.config.start_day);
        let forecasts = self.controller.forecasts();
        let pv_forecast_w = forecasts.pv.get(key).unwrap_or(0.0);
        let el_forecast_w = forecasts.el_baseline.get(key).unwrap_or(0.0);
        let metric = forecasts.demand_for_day(day_of_year).unwrap_or(0.0);

        let threshold = self.controller.params().demand_metric.season_threshold();
        let t_mix_c = match Season::classify(metric, threshold) {
            Season::Heat => self.config.heat_mix_c,
            Season::Cool => self.config.cool_mix_c,
        };
        let demand_w = self.demand.user_demand_w(metric);

        let std = self.config.reading_noise_std;
        let pv_w = (pv_forecast_w * (1.0 + gaussian_noise(&mut self.rng, std))).max(0.0);
        let el_total_w = (el_forecast_w * (1.0 + gaussian_noise(&mut self.rng, std))).max(0.0);

        SensorSnapshot {
            soc: self.tank.soc,
            day_of_year,
            pv_w,
            demand_w,
            el_total_w,
            t_bottom_c: self.tank.t_bottom_c(),
            t_mix_c,
            total_q_tes: self.tank.total_q_kwh(),
        }
    }

    /// Plan trace rows accumulated at every planning instant.
    pub fn plan_trace(&self) -> &[PlanTraceRow] {
        &self.plan_trace
    }

    pub fn controller(&self) -> &SeasonalController<P> {
        &self.controller
    }

    pub fn tank(&self) -> &TesTank {
        &self.tank
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

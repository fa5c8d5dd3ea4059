//! Control loop driver.
//!
//! Owns all control state and sequences, per new timestep: intermediates,
//! the daily planner (at the decision hour only), the TES mode state machine
//! and the pump decision.

use tracing::{debug, error};

use crate::error::ControlError;
use crate::forecast::ForecastRepository;

use super::host::{HostSlots, InputSlot, read_snapshot, write_outputs};
use super::mode::decide_mode;
use super::planner::{ChargePlan, Planner};
use super::pump::{DischargeThresholds, pump_enabled};
use super::time::{TimeKey, is_decision_time};
use super::types::{ControlOutputs, DemandMetric, Season, SensorSnapshot, StepRecord};

/// Static parameters of the control loop.
#[derive(Debug, Clone)]
pub struct ControlParams {
    /// Hour of day (0..24) at which the daily plan is computed.
    pub decision_hour: u32,
    pub demand_metric: DemandMetric,
    pub discharge: DischargeThresholds,
    /// Stored energy at a fully charged heat / fully discharged cool tank (kWh).
    pub max_q_tes: f64,
    /// Stored energy at a fully discharged heat / fully charged cool tank (kWh).
    pub min_q_tes: f64,
}

/// Everything the controller remembers between timesteps.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    /// Last processed simulation time; repeated calls at this time are no-ops.
    pub last_time_h: Option<f64>,
    pub snapshot: SensorSnapshot,
    pub demand_metric: f64,
    pub season: Season,
    pub target_soc: f64,
    pub pv_surplus_w: f64,
    pub seasonal_q_tes: f64,
    pub plan: ChargePlan,
    /// Plan as the planner produced it at the latest decision, before any
    /// same-step clear.
    pub decided_plan: ChargePlan,
    /// Day index of the most recent plan.
    pub last_plan_day: Option<i64>,
    pub planned_this_step: bool,
    pub outputs: ControlOutputs,
    pub plans_made: usize,
    pub plans_cleared_early: usize,
}

impl ControlState {
    /// Snapshot of this state as a trace record stamped `time_h`.
    pub fn record(&self, time_h: f64) -> StepRecord {
        StepRecord {
            time_h,
            snapshot: self.snapshot,
            outputs: self.outputs,
            plan_start_h: self.plan.start().map(TimeKey::hours),
            planned_start_h: self
                .planned_this_step
                .then(|| self.decided_plan.start().map(TimeKey::hours))
                .flatten(),
            plan_mode: self.plan.mode(),
            pv_surplus_w: self.pv_surplus_w,
            seasonal_q_tes: self.seasonal_q_tes,
            target_soc: self.target_soc,
            season: self.season,
            planned: self.planned_this_step,
        }
    }
}

/// Seasonal TES controller, generic over its planning strategy.
pub struct SeasonalController<P: Planner> {
    params: ControlParams,
    planner: P,
    forecasts: ForecastRepository,
    state: ControlState,
}

impl<P: Planner> SeasonalController<P> {
    pub fn new(params: ControlParams, planner: P, forecasts: ForecastRepository) -> Self {
        Self {
            params,
            planner,
            forecasts,
            state: ControlState::default(),
        }
    }

    /// Processes one timestep.
    ///
    /// A call with the same `time_h` as the previous processed call returns the
    /// cached outputs and leaves all state untouched, whatever `snapshot` holds.
    ///
    /// # Errors
    ///
    /// Returns a `ControlError` for an invalid time, a non-finite reading or a
    /// day missing from the demand table. State is not modified on error.
    pub fn step(
        &mut self,
        time_h: f64,
        snapshot: &SensorSnapshot,
    ) -> Result<ControlOutputs, ControlError> {
        if self.state.last_time_h == Some(time_h) {
            return Ok(self.state.outputs);
        }
        self.compute(time_h, snapshot).inspect_err(|e| {
            error!(time_h, error = %e, ?snapshot, plan = ?self.state.plan, "control step failed");
        })
    }

    /// Host callback: reads inputs, steps, and writes outputs back to the slots.
    ///
    /// Outputs are re-written on repeated calls for an already processed time.
    ///
    /// # Errors
    ///
    /// Propagates any `ControlError`; the host should halt the run.
    pub fn on_host_call(&mut self, host: &mut impl HostSlots) -> Result<(), ControlError> {
        let time_h = host.simulation_time();
        if self.state.last_time_h == Some(time_h) {
            write_outputs(host, &self.state.outputs);
            return Ok(());
        }
        let snapshot = read_snapshot(host).inspect_err(|e| {
            error!(time_h, error = %e, "rejected host inputs");
        })?;
        let outputs = self.step(time_h, &snapshot)?;
        write_outputs(host, &outputs);
        Ok(())
    }

    fn compute(
        &mut self,
        time_h: f64,
        snapshot: &SensorSnapshot,
    ) -> Result<ControlOutputs, ControlError> {
        if !time_h.is_finite() || time_h < 0.0 {
            return Err(ControlError::InvalidTime(time_h));
        }
        check_finite(snapshot)?;

        let now = TimeKey::from_hours(time_h);
        let demand_metric = match snapshot.day_of_year {
            0 => self.state.demand_metric,
            day => self
                .forecasts
                .demand_for_day(day)
                .ok_or(ControlError::MissingDemandDay(day))?,
        };
        let season = Season::classify(demand_metric, self.params.demand_metric.season_threshold());
        let pv_surplus_w = (snapshot.pv_w - snapshot.el_total_w).max(0.0);
        let seasonal_q_tes = match season {
            Season::Heat => snapshot.total_q_tes - self.params.min_q_tes,
            Season::Cool => self.params.max_q_tes - snapshot.total_q_tes,
        };
        let target_soc = self.planner.target_soc(season, demand_metric);

        let state = &mut self.state;
        state.snapshot = *snapshot;
        state.demand_metric = demand_metric;
        state.season = season;
        state.pv_surplus_w = pv_surplus_w;
        state.seasonal_q_tes = seasonal_q_tes;
        state.target_soc = target_soc;
        state.planned_this_step = false;

        let day = now.day_index();
        if is_decision_time(time_h, self.params.decision_hour) && state.last_plan_day != Some(day) {
            state.decided_plan = self.planner.plan(now, season, &self.forecasts);
            state.plan = state.decided_plan.clone();
            state.last_plan_day = Some(day);
            state.planned_this_step = true;
            state.plans_made += 1;
        }

        let had_window = state.plan.start().is_some();
        let mode = decide_mode(&mut state.plan, now, snapshot.soc, season, target_soc);
        if had_window && state.plan == ChargePlan::NoCharge {
            state.plans_cleared_early += 1;
        }

        let pump = pump_enabled(mode, snapshot, season, pv_surplus_w, &self.params.discharge);
        state.outputs = ControlOutputs {
            heat_charge: mode.heat_on(),
            cool_charge: mode.cool_on(),
            pump,
            demand_metric,
        };
        state.last_time_h = Some(time_h);

        debug!(
            %now,
            soc = snapshot.soc,
            %season,
            ?mode,
            pump,
            target_soc,
            "control step"
        );
        Ok(state.outputs)
    }

    /// Trace record of the last processed step.
    pub fn record(&self) -> Option<StepRecord> {
        self.state.last_time_h.map(|t| self.state.record(t))
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn forecasts(&self) -> &ForecastRepository {
        &self.forecasts
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }
}

fn check_finite(snapshot: &SensorSnapshot) -> Result<(), ControlError> {
    let readings = [
        (InputSlot::Soc, snapshot.soc),
        (InputSlot::Pv, snapshot.pv_w),
        (InputSlot::UserDemand, snapshot.demand_w),
        (InputSlot::ElectricalTotal, snapshot.el_total_w),
        (InputSlot::TankBottomTemp, snapshot.t_bottom_c),
        (InputSlot::MixTemp, snapshot.t_mix_c),
        (InputSlot::StoredEnergy, snapshot.total_q_tes),
    ];
    match readings.into_iter().find(|(_, value)| !value.is_finite()) {
        Some((slot, value)) => Err(ControlError::NonFiniteInput { slot, value }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::{DemandTable, ForecastTable};
    use crate::sim::host::{OutputSlot, SlotBank};
    use crate::sim::planner::{FixedSpanPlanner, GreedyPlanner};
    use crate::sim::types::TesMode;

    fn params(demand_metric: DemandMetric) -> ControlParams {
        ControlParams {
            decision_hour: 6,
            demand_metric,
            discharge: DischargeThresholds {
                heat: 0.05,
                cool: 0.95,
            },
            max_q_tes: 169.0,
            min_q_tes: 40.0,
        }
    }

    /// 5 W overproduction from hour 10 to 14 each day, zero elsewhere.
    fn forecasts(demand: f64) -> ForecastRepository {
        let keys = (0..24 * 10 * 3).map(TimeKey::new);
        let pv = keys.clone().map(|k| {
            let on = (100..140).contains(&(k.index() % 240));
            (k, if on { 5.0 } else { 0.0 })
        });
        ForecastRepository::new(
            ForecastTable::from_keyed(pv),
            ForecastTable::from_keyed(keys.map(|k| (k, 0.0))),
            DemandTable::from_pairs((1..=3).map(|d| (d, demand))),
        )
    }

    fn fixed_controller() -> SeasonalController<FixedSpanPlanner> {
        SeasonalController::new(
            params(DemandMetric::Normalized),
            FixedSpanPlanner {
                horizon_steps: 240,
                span_steps: 40,
                min_pv_w: 0.0,
                max_soc: 1.0,
                min_soc: 0.0,
            },
            forecasts(0.8),
        )
    }

    fn snapshot(soc: f64) -> SensorSnapshot {
        SensorSnapshot {
            soc,
            day_of_year: 1,
            demand_w: 1_000.0,
            t_bottom_c: 40.0,
            t_mix_c: 35.0,
            total_q_tes: 100.0,
            ..SensorSnapshot::default()
        }
    }

    #[test]
    fn plans_at_decision_hour_and_charges_in_window() {
        let mut c = fixed_controller();
        c.step(5.9, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 0);

        c.step(6.0, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 1);
        assert_eq!(c.state().plan.start(), Some(TimeKey::from_hours(10.0)));
        assert_eq!(c.state().plan.mode(), TesMode::Heat);

        let out = c.step(10.0, &snapshot(0.3)).unwrap();
        assert!(out.heat_charge && !out.cool_charge && out.pump);
        let out = c.step(14.0, &snapshot(0.5)).unwrap();
        assert!(out.heat_charge);
        let out = c.step(15.0, &snapshot(0.6)).unwrap();
        assert!(!out.heat_charge);
    }

    #[test]
    fn repeated_time_is_a_no_op() {
        let mut c = fixed_controller();
        c.step(6.0, &snapshot(0.3)).unwrap();
        let first = c.step(10.0, &snapshot(0.3)).unwrap();
        let state_before = format!("{:?}", c.state());

        let again = c.step(10.0, &snapshot(1.5)).unwrap();
        assert_eq!(first, again);
        assert_eq!(format!("{:?}", c.state()), state_before);
    }

    #[test]
    fn planner_runs_once_per_day_even_with_fine_host_steps() {
        let mut c = fixed_controller();
        c.step(6.0, &snapshot(0.3)).unwrap();
        c.step(6.01, &snapshot(0.3)).unwrap();
        c.step(6.04, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 1);
        c.step(30.0, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 2);
    }

    #[test]
    fn plans_on_the_exact_decision_hour_only() {
        let mut c = fixed_controller();
        c.step(5.95, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 0);
        assert!(!c.state().planned_this_step);

        c.step(6.0, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().plans_made, 1);
        assert!(c.state().planned_this_step);
        assert_eq!(c.state().plan.start(), Some(TimeKey::from_hours(10.0)));
    }

    #[test]
    fn plan_cleared_at_decision_keeps_the_decided_schedule() {
        let mut c = SeasonalController::new(
            params(DemandMetric::DailyEnergy),
            GreedyPlanner {
                horizon_steps: 240,
                min_span_steps: 5,
                min_pv_w: 5.0,
                simulation_end: None,
                max_soc: 1.0,
                min_soc: 0.0,
                q_band: 129.0,
            },
            forecasts(10.0),
        );
        // target (1 + 10 / 129) / 2 is about 0.54, already passed
        c.step(6.0, &snapshot(0.7)).unwrap();
        let state = c.state();
        assert_eq!(state.plan, ChargePlan::NoCharge);
        assert_eq!(state.plans_cleared_early, 1);
        let ChargePlan::Schedule(decided) = &state.decided_plan else {
            panic!("expected a schedule, got {:?}", state.decided_plan);
        };
        assert_eq!(decided.enabled_steps(), 40);

        let r = c.record().unwrap();
        assert!(r.planned);
        assert_eq!(r.plan_start_h, None);
        assert_eq!(r.planned_start_h, Some(10.0));
    }

    #[test]
    fn overshoot_clears_plan_and_counts() {
        let mut c = fixed_controller();
        c.step(6.0, &snapshot(0.3)).unwrap();
        let out = c.step(11.0, &snapshot(1.01)).unwrap();
        assert!(!out.heat_charge);
        assert_eq!(c.state().plan, ChargePlan::NoCharge);
        assert_eq!(c.state().plans_cleared_early, 1);
        let out = c.step(11.1, &snapshot(0.9)).unwrap();
        assert!(!out.heat_charge);
    }

    #[test]
    fn day_zero_keeps_previous_metric() {
        let mut c = fixed_controller();
        c.step(1.0, &snapshot(0.3)).unwrap();
        let out = c
            .step(
                1.1,
                &SensorSnapshot {
                    day_of_year: 0,
                    ..snapshot(0.3)
                },
            )
            .unwrap();
        assert_eq!(out.demand_metric, 0.8);
    }

    #[test]
    fn missing_demand_day_is_fatal_and_leaves_state() {
        let mut c = fixed_controller();
        c.step(1.0, &snapshot(0.3)).unwrap();
        let err = c
            .step(
                1.1,
                &SensorSnapshot {
                    day_of_year: 200,
                    ..snapshot(0.3)
                },
            )
            .unwrap_err();
        assert_eq!(err, ControlError::MissingDemandDay(200));
        assert_eq!(c.state().last_time_h, Some(1.0));
    }

    #[test]
    fn invalid_time_and_inputs_are_fatal() {
        let mut c = fixed_controller();
        assert_eq!(
            c.step(-1.0, &snapshot(0.3)),
            Err(ControlError::InvalidTime(-1.0))
        );
        let err = c.step(1.0, &snapshot(f64::INFINITY)).unwrap_err();
        assert!(matches!(
            err,
            ControlError::NonFiniteInput {
                slot: InputSlot::Soc,
                ..
            }
        ));
    }

    #[test]
    fn host_call_writes_and_echoes_outputs() {
        let mut c = fixed_controller();
        let mut bank = SlotBank::new(6.0, &snapshot(0.3));
        c.on_host_call(&mut bank).unwrap();
        bank.time_h = 10.0;
        c.on_host_call(&mut bank).unwrap();
        assert_eq!(bank.output(OutputSlot::HeatCharge), 1.0);
        assert_eq!(bank.output(OutputSlot::Pump), 1.0);
        assert_eq!(bank.output(OutputSlot::DemandMetric), 0.8);

        // host iteration at the same time with garbage inputs only echoes
        let mut echo = SlotBank::new(10.0, &snapshot(f64::NAN));
        c.on_host_call(&mut echo).unwrap();
        assert_eq!(echo.outputs, bank.outputs);
    }

    #[test]
    fn greedy_controller_uses_demand_tracking_target() {
        let mut c = SeasonalController::new(
            params(DemandMetric::DailyEnergy),
            GreedyPlanner {
                horizon_steps: 240,
                min_span_steps: 5,
                min_pv_w: 0.0,
                simulation_end: None,
                max_soc: 1.0,
                min_soc: 0.0,
                q_band: 129.0,
            },
            forecasts(64.5),
        );
        c.step(6.0, &snapshot(0.3)).unwrap();
        assert_eq!(c.state().target_soc, 0.75);
        assert_eq!(c.state().seasonal_q_tes, 60.0);
        // zero-overproduction steps are usable, so the schedule covers the horizon
        let out = c.step(8.0, &snapshot(0.5)).unwrap();
        assert!(out.heat_charge);
        let out = c.step(8.1, &snapshot(0.8)).unwrap();
        assert!(!out.heat_charge);
        assert_eq!(c.state().plan, ChargePlan::NoCharge);
    }

    #[test]
    fn record_reflects_last_step() {
        let mut c = fixed_controller();
        assert!(c.record().is_none());
        c.step(6.0, &snapshot(0.3)).unwrap();
        let r = c.record().unwrap();
        assert!(r.planned);
        assert_eq!(r.plan_start_h, Some(10.0));
        assert_eq!(r.season, Season::Heat);
    }
}

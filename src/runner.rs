use crate::config::{PlannerKind, ScenarioConfig};
use crate::error::RunError;
use crate::scenario::build_engine;
use crate::sim::kpi::RunReport;
use crate::sim::planner::{PlanTraceRow, Planner};
use crate::sim::types::StepRecord;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub planner: &'static str,
    pub records: Vec<StepRecord>,
    pub plan_trace: Vec<PlanTraceRow>,
    pub report: RunReport,
}

/// Runs a validated scenario with the planner variant it selects.
///
/// # Errors
///
/// Returns a `RunError` if a forecast table cannot be loaded or a control
/// step fails.
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<RunOutput, RunError> {
    match cfg.control.planner {
        PlannerKind::Greedy => run_with(cfg, cfg.greedy_planner()),
        PlannerKind::FixedSpan => run_with(cfg, cfg.fixed_span_planner()),
    }
}

fn run_with<P: Planner>(cfg: &ScenarioConfig, planner: P) -> Result<RunOutput, RunError> {
    let mut engine = build_engine(cfg, planner)?;
    let records = engine.run()?;
    let report = RunReport::from_records(&records, cfg.simulation.step_hours);
    Ok(RunOutput {
        planner: engine.controller().planner().name(),
        records,
        plan_trace: engine.plan_trace().to_vec(),
        report,
    })
}

//! Post-hoc KPI computation from control step records.

use std::fmt;

use super::types::StepRecord;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `Vec<StepRecord>` to ensure consistency between
/// the trace and reported metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Number of processed steps.
    pub steps: usize,
    /// Time spent heat-charging (h).
    pub heat_charge_hours: f64,
    /// Time spent cool-charging (h).
    pub cool_charge_hours: f64,
    /// Time the storage pump ran (h).
    pub pump_hours: f64,
    /// Planning cycles executed.
    pub plans_made: usize,
    /// Planning cycles that produced a charging opportunity.
    pub plans_with_window: usize,
    /// Plans dropped before their end because the SOC target was passed.
    pub plans_cleared_early: usize,
    pub mean_soc: f64,
    pub min_soc: f64,
    pub max_soc: f64,
    /// Steps with heat and cool charging enabled at once; must be zero.
    pub simultaneous_charge_steps: usize,
}

impl RunReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Complete run records, in time order
    /// * `step_hours` - Host timestep duration in hours
    pub fn from_records(records: &[StepRecord], step_hours: f64) -> Self {
        if records.is_empty() {
            return Self {
                steps: 0,
                heat_charge_hours: 0.0,
                cool_charge_hours: 0.0,
                pump_hours: 0.0,
                plans_made: 0,
                plans_with_window: 0,
                plans_cleared_early: 0,
                mean_soc: 0.0,
                min_soc: 0.0,
                max_soc: 0.0,
                simultaneous_charge_steps: 0,
            };
        }

        let mut heat_steps = 0_usize;
        let mut cool_steps = 0_usize;
        let mut pump_steps = 0_usize;
        let mut plans_made = 0_usize;
        let mut plans_with_window = 0_usize;
        let mut cleared = 0_usize;
        let mut simultaneous = 0_usize;
        let mut soc_sum = 0.0_f64;
        let mut min_soc = f64::INFINITY;
        let mut max_soc = f64::NEG_INFINITY;
        let mut prev_start: Option<f64> = None;

        for r in records {
            let o = &r.outputs;
            heat_steps += usize::from(o.heat_charge);
            cool_steps += usize::from(o.cool_charge);
            pump_steps += usize::from(o.pump);
            if o.heat_charge && o.cool_charge {
                simultaneous += 1;
            }

            // a plan with a window that loses it without replanning was cleared
            let had_window = if r.planned {
                plans_made += 1;
                plans_with_window += usize::from(r.planned_start_h.is_some());
                r.planned_start_h.is_some()
            } else {
                prev_start.is_some()
            };
            if had_window && r.plan_start_h.is_none() {
                cleared += 1;
            }
            prev_start = r.plan_start_h;

            let soc = r.snapshot.soc;
            soc_sum += soc;
            min_soc = min_soc.min(soc);
            max_soc = max_soc.max(soc);
        }

        let n = records.len();
        Self {
            steps: n,
            heat_charge_hours: heat_steps as f64 * step_hours,
            cool_charge_hours: cool_steps as f64 * step_hours,
            pump_hours: pump_steps as f64 * step_hours,
            plans_made,
            plans_with_window,
            plans_cleared_early: cleared,
            mean_soc: soc_sum / n as f64,
            min_soc,
            max_soc,
            simultaneous_charge_steps: simultaneous,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Report ---")?;
        writeln!(f, "Steps processed:       {}", self.steps)?;
        writeln!(f, "Heat charging:         {:.1} h", self.heat_charge_hours)?;
        writeln!(f, "Cool charging:         {:.1} h", self.cool_charge_hours)?;
        writeln!(f, "Pump running:          {:.1} h", self.pump_hours)?;
        writeln!(
            f,
            "Plans:                 {} ({} with a window, {} cleared early)",
            self.plans_made, self.plans_with_window, self.plans_cleared_early
        )?;
        writeln!(
            f,
            "SoC:                   mean {:.1}% (min {:.1}%, max {:.1}%)",
            self.mean_soc * 100.0,
            self.min_soc * 100.0,
            self.max_soc * 100.0
        )?;
        write!(f, "Simultaneous charging: {}", self.simultaneous_charge_steps)
    }
}

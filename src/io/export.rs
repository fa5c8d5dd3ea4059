//! CSV export for control and plan traces.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::planner::PlanTraceRow;
use crate::sim::types::StepRecord;

/// Column header of the per-step control trace.
const CONTROL_HEADER: &str = "time_h,soc,day_of_year,pv_w,heat_charge,cool_charge,\
                              plan_start_h,plan_mode,pump,demand_metric,pv_surplus_w,\
                              demand_w,t_bottom_c,t_mix_c,total_q_tes,seasonal_q_tes,target_soc";

/// Column header of the plan trace.
const PLAN_HEADER: &str = "time_h,enabled,pv_over_pred_w,pv_pred_w,el_pred_w";

fn flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(String::new, |v| format!("{v:.precision$}"))
}

/// Exports the control trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_control_trace(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_control_trace(records, io::BufWriter::new(file))
}

/// Writes the control trace as CSV to any writer.
///
/// One row per processed step. Flags are written as `0`/`1`, the plan mode as
/// `1` (heat), `-1` (cool) or `0` and a missing plan start as an empty field.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_control_trace(records: &[StepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(CONTROL_HEADER.split(',').map(str::trim))?;

    for r in records {
        let s = &r.snapshot;
        let o = &r.outputs;
        wtr.write_record(&[
            format!("{:.2}", r.time_h),
            format!("{:.4}", s.soc),
            s.day_of_year.to_string(),
            format!("{:.1}", s.pv_w),
            flag(o.heat_charge).to_string(),
            flag(o.cool_charge).to_string(),
            optional(r.plan_start_h, 1),
            r.plan_mode.code().to_string(),
            flag(o.pump).to_string(),
            format!("{:.4}", o.demand_metric),
            format!("{:.1}", r.pv_surplus_w),
            format!("{:.1}", s.demand_w),
            format!("{:.2}", s.t_bottom_c),
            format!("{:.2}", s.t_mix_c),
            format!("{:.3}", s.total_q_tes),
            format!("{:.3}", r.seasonal_q_tes),
            format!("{:.4}", r.target_soc),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports the plan trace to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_plan_trace(rows: &[PlanTraceRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_plan_trace(rows, io::BufWriter::new(file))
}

/// Writes the plan trace as CSV; forecast values missing from a table are blank.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_plan_trace(rows: &[PlanTraceRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(PLAN_HEADER.split(','))?;
    for r in rows {
        wtr.write_record(&[
            format!("{:.1}", r.time_h),
            flag(r.enabled).to_string(),
            optional(r.pv_over_pred_w, 1),
            optional(r.pv_pred_w, 1),
            optional(r.el_pred_w, 1),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

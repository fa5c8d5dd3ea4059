use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::ScenarioConfig;

/// Seasonal TES charging controller, run against an offline tank plant.
#[derive(Parser, Debug)]
#[command(name = "tes-seasonal-control", version)]
#[command(about = "Predictive seasonal TES charging controller", long_about = None)]
pub struct CliOptions {
    /// Load scenario from a TOML config file
    #[arg(long, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (fixed_span, demand_tracking)
    #[arg(long)]
    pub preset: Option<String>,

    /// Override the number of simulated days
    #[arg(long)]
    pub days: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// PV forecast CSV (`time_hours,watts`)
    #[arg(long)]
    pub pv: Option<PathBuf>,

    /// Baseline electrical demand CSV (`time_hours,watts`)
    #[arg(long)]
    pub el_baseline: Option<PathBuf>,

    /// Day-keyed demand metric CSV (`day,metric`)
    #[arg(long)]
    pub demand: Option<PathBuf>,

    /// Write the per-step control trace to this CSV file
    #[arg(long)]
    pub trace_out: Option<PathBuf>,

    /// Write the plan trace to this CSV file
    #[arg(long)]
    pub plan_trace_out: Option<PathBuf>,

    /// Print every processed step
    #[arg(long)]
    pub print_steps: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl CliOptions {
    /// Applies command-line overrides on top of a loaded scenario.
    pub fn apply_overrides(&self, cfg: &mut ScenarioConfig) {
        if let Some(days) = self.days {
            cfg.simulation.days = days;
        }
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        if let Some(path) = &self.pv {
            cfg.forecast.pv_path = Some(path.clone());
        }
        if let Some(path) = &self.el_baseline {
            cfg.forecast.el_baseline_path = Some(path.clone());
        }
        if let Some(path) = &self.demand {
            cfg.forecast.demand_path = Some(path.clone());
        }
    }
}

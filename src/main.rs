//! TES seasonal controller entry point: CLI wiring and config-driven run.

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use tes_seasonal_control::cli::CliOptions;
use tes_seasonal_control::config::ScenarioConfig;
use tes_seasonal_control::io::export::{export_control_trace, export_plan_trace};
use tes_seasonal_control::logging;
use tes_seasonal_control::runner::run_scenario;

fn main() -> anyhow::Result<()> {
    let cli = CliOptions::parse();
    logging::init(cli.verbose);

    // --scenario takes priority, then --preset, then the fixed-span default
    let mut scenario = if let Some(path) = &cli.scenario {
        ScenarioConfig::from_toml_file(path)?
    } else if let Some(name) = &cli.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::fixed_span()
    };
    cli.apply_overrides(&mut scenario);

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario has {} invalid field(s)", errors.len());
    }

    let output = run_scenario(&scenario)?;
    info!(planner = output.planner, steps = output.records.len(), "run complete");

    if cli.print_steps {
        for r in &output.records {
            println!("{r}");
        }
    }
    println!("\n{}", output.report);

    if let Some(path) = &cli.trace_out {
        export_control_trace(&output.records, path)
            .with_context(|| format!("failed to write control trace to {}", path.display()))?;
        eprintln!("Control trace written to {}", path.display());
    }
    if let Some(path) = &cli.plan_trace_out {
        export_plan_trace(&output.plan_trace, path)
            .with_context(|| format!("failed to write plan trace to {}", path.display()))?;
        eprintln!("Plan trace written to {}", path.display());
    }
    Ok(())
}

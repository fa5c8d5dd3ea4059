//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::sim::controller::ControlParams;
use crate::sim::planner::{FixedSpanPlanner, GreedyPlanner};
use crate::sim::pump::DischargeThresholds;
use crate::sim::time::{DAYS_PER_YEAR, HOURS_PER_DAY, TimeKey, steps_for};
use crate::sim::types::DemandMetric;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the `fixed_span` preset. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or pick a built-in preset
/// with [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Planner and state-machine parameters.
    #[serde(default)]
    pub control: ControlConfig,
    /// Stored-energy bounds.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Forecast sources and synthetic generator parameters.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Offline tank plant parameters.
    #[serde(default)]
    pub plant: PlantConfig,
}

/// Run timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Calendar day of year at hour 0 (1..=365).
    pub start_day: u32,
    /// Number of days to simulate (must be > 0).
    pub days: u32,
    /// Host timestep in hours; a whole number of 0.1 h steps.
    pub step_hours: f64,
    /// Controller invocations per host timestep (must be > 0).
    pub iterations_per_step: usize,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_day: 1,
            days: 7,
            step_hours: 0.1,
            iterations_per_step: 2,
            seed: 42,
        }
    }
}

/// Planning strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Best fixed-span window, charging to the SOC bound.
    FixedSpan,
    /// Greedy segment covering with a demand-tracking SOC target.
    Greedy,
}

/// Planner and state-machine parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub planner: PlannerKind,
    /// Interpretation of the day-keyed demand table.
    pub demand_metric: DemandMetric,
    /// Hour of day the daily plan is computed (0..24).
    pub decision_hour: u32,
    /// Prediction horizon (h).
    pub horizon_hours: f64,
    /// Fixed window length for the fixed-span planner (h).
    pub span_hours: f64,
    /// Minimum run length for the greedy planner (h).
    pub min_span_hours: f64,
    /// PV production reserved for other loads (W).
    pub min_pv_w: f64,
    pub max_soc: f64,
    pub min_soc: f64,
    /// Heat season: tank discharged at or below this SOC.
    pub soc_discharged_heat: f64,
    /// Cool season: tank discharged at or above this SOC.
    pub soc_discharged_cool: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            planner: PlannerKind::FixedSpan,
            demand_metric: DemandMetric::Normalized,
            decision_hour: 6,
            horizon_hours: 24.0,
            span_hours: 4.0,
            min_span_hours: 0.5,
            min_pv_w: 12_600.0,
            max_soc: 1.0,
            min_soc: 0.0,
            soc_discharged_heat: 0.05,
            soc_discharged_cool: 0.95,
        }
    }
}

/// Stored-energy bounds of the TES.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Energy at SOC 1.0 (kWh).
    pub max_q_tes_kwh: f64,
    /// Energy at SOC 0.0 (kWh).
    pub min_q_tes_kwh: f64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_q_tes_kwh: 169.0,
            min_q_tes_kwh: 40.0,
        }
    }
}

/// Forecast sources. Any table without a CSV path is generated synthetically.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Headerless `time_hours,watts` PV forecast.
    pub pv_path: Option<PathBuf>,
    /// Headerless `time_hours,watts` baseline electrical demand forecast.
    pub el_baseline_path: Option<PathBuf>,
    /// Headerless `day,metric` demand table.
    pub demand_path: Option<PathBuf>,
    /// Synthetic PV peak (W).
    pub pv_peak_w: f64,
    pub sunrise_h: f64,
    pub sunset_h: f64,
    /// Synthetic PV winter output relative to summer.
    pub pv_winter_factor: f64,
    /// Relative PV noise.
    pub pv_noise_std: f64,
    /// Synthetic baseline consumption (W).
    pub el_base_w: f64,
    /// Daily swing of the baseline consumption (W).
    pub el_amp_w: f64,
    pub el_phase_rad: f64,
    /// Baseline noise (W).
    pub el_noise_std: f64,
    /// Swing of the demand metric around its season threshold.
    pub demand_amplitude: f64,
    /// Day of year with the highest heating demand.
    pub demand_peak_day: u32,
    /// Day-to-day demand noise relative to the amplitude.
    pub demand_noise_std: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            pv_path: None,
            el_baseline_path: None,
            demand_path: None,
            pv_peak_w: 30_000.0,
            sunrise_h: 6.0,
            sunset_h: 20.0,
            pv_winter_factor: 0.6,
            pv_noise_std: 0.05,
            el_base_w: 3_000.0,
            el_amp_w: 1_500.0,
            el_phase_rad: 1.2,
            el_noise_std: 100.0,
            demand_amplitude: 0.4,
            demand_peak_day: 15,
            demand_noise_std: 0.1,
        }
    }
}

/// Offline tank plant and live reading parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantConfig {
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Thermal power while charging (W).
    pub charge_power_w: f64,
    /// User thermal demand at full seasonal intensity (W).
    pub peak_demand_w: f64,
    /// Tank temperature at SOC 0.0 (°C).
    pub t_empty_c: f64,
    /// Tank temperature at SOC 1.0 (°C).
    pub t_full_c: f64,
    /// Heat-season distribution temperature (°C).
    pub heat_mix_c: f64,
    /// Cool-season distribution temperature (°C).
    pub cool_mix_c: f64,
    /// Relative noise on live PV and consumption readings.
    pub reading_noise_std: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            initial_soc: 0.5,
            charge_power_w: 20_000.0,
            peak_demand_w: 8_000.0,
            t_empty_c: 10.0,
            t_full_c: 60.0,
            heat_mix_c: 30.0,
            cool_mix_c: 16.0,
            reading_noise_std: 0.03,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.days"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Fixed-span preset: normalized demand metric, 4 h best window at 06:00.
    pub fn fixed_span() -> Self {
        Self::default()
    }

    /// Demand-tracking preset: signed daily energy, greedy covering and a
    /// target SOC that follows the day's demand.
    pub fn demand_tracking() -> Self {
        Self {
            simulation: SimulationConfig {
                days: 14,
                ..SimulationConfig::default()
            },
            control: ControlConfig {
                planner: PlannerKind::Greedy,
                demand_metric: DemandMetric::DailyEnergy,
                ..ControlConfig::default()
            },
            storage: StorageConfig::default(),
            forecast: ForecastConfig {
                demand_amplitude: 60.0,
                ..ForecastConfig::default()
            },
            plant: PlantConfig::default(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["fixed_span", "demand_tracking"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "fixed_span" => Ok(Self::fixed_span()),
            "demand_tracking" => Ok(Self::demand_tracking()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !(1..=DAYS_PER_YEAR).contains(&s.start_day) {
            errors.push(ConfigError::new("simulation.start_day", "must be in [1, 365]"));
        }
        if s.days == 0 {
            errors.push(ConfigError::new("simulation.days", "must be > 0"));
        }
        if !s.step_hours.is_finite() || steps_for(s.step_hours) < 1 {
            errors.push(ConfigError::new("simulation.step_hours", "must be >= 0.1"));
        } else if !is_step_multiple(s.step_hours) {
            errors.push(ConfigError::new(
                "simulation.step_hours",
                "must be a whole multiple of 0.1 h",
            ));
        }
        if s.iterations_per_step == 0 {
            errors.push(ConfigError::new("simulation.iterations_per_step", "must be > 0"));
        }

        let c = &self.control;
        if c.decision_hour >= HOURS_PER_DAY as u32 {
            errors.push(ConfigError::new("control.decision_hour", "must be in [0, 23]"));
        }
        if !(c.horizon_hours.is_finite() && steps_for(c.horizon_hours) >= 1) {
            errors.push(ConfigError::new("control.horizon_hours", "must be >= 0.1"));
        }
        if !(c.span_hours.is_finite() && steps_for(c.span_hours) >= 1) {
            errors.push(ConfigError::new("control.span_hours", "must be >= 0.1"));
        }
        if !(c.min_span_hours.is_finite() && c.min_span_hours >= 0.0) {
            errors.push(ConfigError::new("control.min_span_hours", "must be >= 0"));
        }
        if !c.min_pv_w.is_finite() {
            errors.push(ConfigError::new("control.min_pv_w", "must be finite"));
        }
        if !(c.min_soc.is_finite() && c.max_soc.is_finite() && c.min_soc < c.max_soc) {
            errors.push(ConfigError::new("control.min_soc", "must be < control.max_soc"));
        }
        for (field, v) in [
            ("control.soc_discharged_heat", c.soc_discharged_heat),
            ("control.soc_discharged_cool", c.soc_discharged_cool),
        ] {
            if !(0.0..=1.0).contains(&v) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }

        let st = &self.storage;
        if !(st.min_q_tes_kwh.is_finite() && st.max_q_tes_kwh > st.min_q_tes_kwh) {
            errors.push(ConfigError::new(
                "storage.max_q_tes_kwh",
                "must be > storage.min_q_tes_kwh",
            ));
        }

        let f = &self.forecast;
        if f.sunrise_h >= f.sunset_h || f.sunrise_h < 0.0 || f.sunset_h > 24.0 {
            errors.push(ConfigError::new(
                "forecast.sunrise_h",
                "must satisfy 0 <= sunrise_h < sunset_h <= 24",
            ));
        }
        if !(0.0..=1.0).contains(&f.pv_winter_factor) {
            errors.push(ConfigError::new("forecast.pv_winter_factor", "must be in [0.0, 1.0]"));
        }
        if c.demand_metric == DemandMetric::Normalized && f.demand_amplitude > 0.5 {
            errors.push(ConfigError::new(
                "forecast.demand_amplitude",
                "must be <= 0.5 for a normalized demand metric",
            ));
        }

        let p = &self.plant;
        if !(0.0..=1.0).contains(&p.initial_soc) {
            errors.push(ConfigError::new("plant.initial_soc", "must be in [0.0, 1.0]"));
        }
        if !(p.charge_power_w.is_finite() && p.charge_power_w >= 0.0) {
            errors.push(ConfigError::new("plant.charge_power_w", "must be >= 0"));
        }

        errors
    }

    /// Quantized run bounds `[start, end)`.
    pub fn run_keys(&self) -> (TimeKey, TimeKey) {
        let hours = f64::from(self.simulation.days) * HOURS_PER_DAY as f64;
        (TimeKey::new(0), TimeKey::from_hours(hours))
    }

    /// Static control-loop parameters.
    pub fn control_params(&self) -> ControlParams {
        ControlParams {
            decision_hour: self.control.decision_hour,
            demand_metric: self.control.demand_metric,
            discharge: DischargeThresholds {
                heat: self.control.soc_discharged_heat,
                cool: self.control.soc_discharged_cool,
            },
            max_q_tes: self.storage.max_q_tes_kwh,
            min_q_tes: self.storage.min_q_tes_kwh,
        }
    }

    pub fn fixed_span_planner(&self) -> FixedSpanPlanner {
        let c = &self.control;
        FixedSpanPlanner {
            horizon_steps: steps_for(c.horizon_hours),
            span_steps: steps_for(c.span_hours),
            min_pv_w: c.min_pv_w,
            max_soc: c.max_soc,
            min_soc: c.min_soc,
        }
    }

    pub fn greedy_planner(&self) -> GreedyPlanner {
        let c = &self.control;
        GreedyPlanner {
            horizon_steps: steps_for(c.horizon_hours),
            min_span_steps: steps_for(c.min_span_hours),
            min_pv_w: c.min_pv_w,
            simulation_end: Some(self.run_keys().1),
            max_soc: c.max_soc,
            min_soc: c.min_soc,
            q_band: self.storage.max_q_tes_kwh - self.storage.min_q_tes_kwh,
        }
    }
}

fn is_step_multiple(hours: f64) -> bool {
    let steps = hours * 10.0;
    (steps - steps.round()).abs() < 1e-9
}

//! Core control types: seasons, TES modes, sensor snapshots and step records.

use std::fmt;

use serde::Deserialize;

/// Operating season of the building, derived from the demand metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Season {
    #[default]
    Heat,
    Cool,
}

impl Season {
    /// Classifies a demand metric: `Heat` at or above `threshold`, else `Cool`.
    pub fn classify(demand_metric: f64, threshold: f64) -> Self {
        if demand_metric >= threshold {
            Season::Heat
        } else {
            Season::Cool
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Heat => write!(f, "HEAT"),
            Season::Cool => write!(f, "COOL"),
        }
    }
}

/// TES charging mode; heat and cool charging are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TesMode {
    #[default]
    Off,
    Heat,
    Cool,
}

impl TesMode {
    /// Heat-charge enable flag.
    pub fn heat_on(self) -> bool {
        self == TesMode::Heat
    }

    /// Cool-charge enable flag.
    pub fn cool_on(self) -> bool {
        self == TesMode::Cool
    }

    /// Signed code used in traces: `1` heat, `-1` cool, `0` off.
    pub fn code(self) -> i8 {
        match self {
            TesMode::Off => 0,
            TesMode::Heat => 1,
            TesMode::Cool => -1,
        }
    }
}

impl From<Season> for TesMode {
    fn from(season: Season) -> Self {
        match season {
            Season::Heat => TesMode::Heat,
            Season::Cool => TesMode::Cool,
        }
    }
}

/// How the day-keyed demand table is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandMetric {
    /// Normalized fraction of peak demand (0..1); heat season at >= 0.5.
    Normalized,
    /// Signed daily thermal energy; heat season at >= 0.
    DailyEnergy,
}

impl DemandMetric {
    /// Season classification threshold for this metric.
    pub fn season_threshold(self) -> f64 {
        match self {
            DemandMetric::Normalized => 0.5,
            DemandMetric::DailyEnergy => 0.0,
        }
    }
}

/// Live sensor readings delivered by the host for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorSnapshot {
    /// TES state of charge (nominally 0..1, may overshoot).
    pub soc: f64,
    /// Day of year; `0` means "unknown" and keeps the previous demand metric.
    pub day_of_year: u32,
    /// PV production (W).
    pub pv_w: f64,
    /// User thermal demand (W).
    pub demand_w: f64,
    /// Total electrical consumption (W).
    pub el_total_w: f64,
    /// Tank bottom temperature (°C).
    pub t_bottom_c: f64,
    /// Mixing / distribution temperature (°C).
    pub t_mix_c: f64,
    /// Cumulative thermal energy stored in the TES (kWh).
    pub total_q_tes: f64,
}

/// Control signals produced for one timestep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlOutputs {
    pub heat_charge: bool,
    pub cool_charge: bool,
    pub pump: bool,
    /// Demand metric echoed for downstream use.
    pub demand_metric: f64,
}

impl ControlOutputs {
    /// TES mode encoded by the two charge flags.
    pub fn mode(&self) -> TesMode {
        match (self.heat_charge, self.cool_charge) {
            (true, _) => TesMode::Heat,
            (false, true) => TesMode::Cool,
            (false, false) => TesMode::Off,
        }
    }
}

/// Complete record of one processed control step, as written to the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Simulation time in hours.
    pub time_h: f64,
    pub snapshot: SensorSnapshot,
    pub outputs: ControlOutputs,
    /// Start of the active charge plan, if any.
    pub plan_start_h: Option<f64>,
    /// Start of the plan made at this step, before any same-step clear.
    pub planned_start_h: Option<f64>,
    /// Mode of the active charge plan.
    pub plan_mode: TesMode,
    /// Live PV surplus `max(0, pv - el_total)` (W).
    pub pv_surplus_w: f64,
    /// Stored energy usable in the current season (kWh).
    pub seasonal_q_tes: f64,
    pub target_soc: f64,
    pub season: Season,
    /// Whether the planner ran at this step.
    pub planned: bool,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>8.1}h day={:>3} | SoC={:>5.1}% target={:>5.1}% | pv={:>8.0} W \
             surplus={:>8.0} W demand={:>8.0} W | {} heat={} cool={} pump={}",
            self.time_h,
            self.snapshot.day_of_year,
            self.snapshot.soc * 100.0,
            self.target_soc * 100.0,
            self.snapshot.pv_w,
            self.pv_surplus_w,
            self.snapshot.demand_w,
            self.season,
            u8::from(self.outputs.heat_charge),
            u8::from(self.outputs.cool_charge),
            u8::from(self.outputs.pump),
        )
    }
}

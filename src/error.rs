//! Error types for table loading and the per-step control contract.

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::host::InputSlot;

/// Fatal failure of a control step.
///
/// Returned to the host, which is expected to halt the run: continuing from a
/// physically implausible state makes the rest of the simulation meaningless.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("simulation time {0} h is negative or not finite")]
    InvalidTime(f64),
    #[error("input slot {slot} ({slot:?}) is not a finite number: {value}")]
    NonFiniteInput { slot: InputSlot, value: f64 },
    #[error("day of year {0} is not a non-negative integer")]
    InvalidDayOfYear(f64),
    #[error("day of year {0} is missing from the demand table")]
    MissingDemandDay(u32),
}

/// Failure while loading a forecast or demand table.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("cannot read table \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed row in table \"{source_name}\": {source}")]
    Row {
        source_name: String,
        #[source]
        source: csv::Error,
    },
    #[error("non-finite value on line {line} of table \"{source_name}\"")]
    NonFinite { source_name: String, line: u64 },
}

/// Failure of a complete offline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error("run halted: {0}")]
    Control(#[from] ControlError),
}

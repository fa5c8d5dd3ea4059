//! Forecast repository: read-only PV, baseline-demand and daily-demand tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::ForecastError;
use crate::sim::time::TimeKey;

/// Time-keyed forecast values (PV production or baseline electrical demand).
///
/// Keys are produced with [`TimeKey::from_hours`], the same quantization the
/// planners use for their lookups. No interpolation is performed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    values: HashMap<TimeKey, f64>,
}

impl ForecastTable {
    /// Builds a table from `(time_hours, value)` pairs. Later duplicates win.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(hours, value)| (TimeKey::from_hours(hours), value))
            .collect();
        Self { values }
    }

    /// Builds a table keyed directly by quantized time.
    pub fn from_keyed(pairs: impl IntoIterator<Item = (TimeKey, f64)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    /// Parses headerless `time_hours,value` rows.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` on a malformed row or a non-finite value.
    pub fn from_reader(reader: impl Read, source_name: &str) -> Result<Self, ForecastError> {
        let rows: Vec<(f64, f64)> = read_rows(reader, source_name)?;
        Ok(Self::from_pairs(rows))
    }

    /// Loads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` if the file cannot be opened or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self, ForecastError> {
        let file = File::open(path).map_err(|source| ForecastError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(BufReader::new(file), &path.display().to_string())?;
        debug!(path = %path.display(), entries = table.len(), "loaded forecast table");
        Ok(table)
    }

    pub fn get(&self, key: TimeKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Day-of-year keyed demand metric (normalized fraction or signed daily energy).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandTable {
    values: HashMap<u32, f64>,
}

impl DemandTable {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    /// Parses headerless `day,value` rows.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` on a malformed row or a non-finite value.
    pub fn from_reader(reader: impl Read, source_name: &str) -> Result<Self, ForecastError> {
        let rows: Vec<(u32, f64)> = read_rows(reader, source_name)?;
        Ok(Self::from_pairs(rows))
    }

    /// Loads a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns a `ForecastError` if the file cannot be opened or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self, ForecastError> {
        let file = File::open(path).map_err(|source| ForecastError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(BufReader::new(file), &path.display().to_string())?;
        debug!(path = %path.display(), entries = table.len(), "loaded demand table");
        Ok(table)
    }

    pub fn get(&self, day: u32) -> Option<f64> {
        self.values.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Row value that can be checked for finiteness after deserialization.
trait FiniteRow {
    fn is_finite(&self) -> bool;
}

impl FiniteRow for (f64, f64) {
    fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

impl FiniteRow for (u32, f64) {
    fn is_finite(&self) -> bool {
        self.1.is_finite()
    }
}

fn read_rows<T>(reader: impl Read, source_name: &str) -> Result<Vec<T>, ForecastError>
where
    T: serde::de::DeserializeOwned + FiniteRow,
{
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.deserialize::<T>() {
        let row = record.map_err(|source| ForecastError::Row {
            source_name: source_name.to_string(),
            source,
        })?;
        if !row.is_finite() {
            return Err(ForecastError::NonFinite {
                source_name: source_name.to_string(),
                line: rows.len() as u64 + 1,
            });
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read-only forecast lookup service consumed by the planners and the driver.
#[derive(Debug, Clone, Default)]
pub struct ForecastRepository {
    pub pv: ForecastTable,
    pub el_baseline: ForecastTable,
    pub demand: DemandTable,
}

impl ForecastRepository {
    pub fn new(pv: ForecastTable, el_baseline: ForecastTable, demand: DemandTable) -> Self {
        Self {
            pv,
            el_baseline,
            demand,
        }
    }

    /// Predicted PV overproduction `pv - (el_baseline + min_pv_w)` at `key`.
    ///
    /// The sign is preserved. Returns `None` when either table lacks the key.
    pub fn overproduction(&self, key: TimeKey, min_pv_w: f64) -> Option<f64> {
        let pv = self.pv.get(key)?;
        let el = self.el_baseline.get(key)?;
        Some(pv - (el + min_pv_w))
    }

    /// Demand metric for a day of year.
    pub fn demand_for_day(&self, day: u32) -> Option<f64> {
        self.demand.get(day)
    }
}

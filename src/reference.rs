//! Known-optimal reference values
//!
//! The table is a JSON list of `{"id": ..., "value": ...}` records. The default
//! table (netlib LP optima) is embedded at compile time from
//! `resources/known_results.json`; `--known-results` swaps in another file.
//!
//! Under the current comparison semantics a reference value only contributes a
//! label line to the observed text (see [`crate::oracle`]). The label format is
//! therefore part of every recorded baseline and must never change.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::HarnessError;

/// The embedded netlib reference table.
pub const EMBEDDED_KNOWN_RESULTS: &str = include_str!("../resources/known_results.json");

/// Text placed before the formatted value on the label line.
pub const EXPECTED_LABEL: &str = "Expected optimal value: ";

/// One reference record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferenceValue {
    pub id: String,
    pub value: f64,
}

/// Test id → known-optimal value. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    values: HashMap<String, f64>,
}

impl ReferenceTable {
    /// Build a table from records, rejecting duplicate ids.
    pub fn from_records(records: Vec<ReferenceValue>) -> Result<Self, HarnessError> {
        let mut values = HashMap::with_capacity(records.len());
        for record in records {
            if record.id.is_empty() {
                return Err(HarnessError::ReferenceTable("record with empty id".to_string()));
            }
            if values.insert(record.id.clone(), record.value).is_some() {
                return Err(HarnessError::ReferenceTable(format!("duplicate id '{}'", record.id)));
            }
        }
        Ok(Self { values })
    }

    /// Parse a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        let records: Vec<ReferenceValue> =
            serde_json::from_str(json).map_err(|e| HarnessError::ReferenceTable(e.to_string()))?;
        Self::from_records(records)
    }

    /// The table compiled into the binary.
    pub fn embedded() -> Result<Self, HarnessError> {
        Self::from_json(EMBEDDED_KNOWN_RESULTS)
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let json = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let table = Self::from_json(&json)?;
        tracing::info!("loaded {} reference values from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The label line for `id`, or an empty string when the id has no reference value.
    pub fn expected_prefix(&self, id: &str) -> String {
        match self.get(id) {
            Some(value) => format!("{}{}\n", EXPECTED_LABEL, format_reference_value(value)),
            None => String::new(),
        }
    }
}

/// Render a reference value deterministically.
///
/// Shortest digits that round-trip to the same `f64`. Integral values keep a
/// trailing `.0`; magnitudes at or above `1e16` or below `1e-4` switch to
/// `<mantissa>e±XX` with at least two exponent digits.
pub fn format_reference_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", value);
        let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let plain = value.to_string();
    if plain.contains('.') { plain } else { format!("{}.0", plain) }
}

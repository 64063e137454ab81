//! Per-record and per-group metric calculators
//!
//! Every calculator that divides returns `None` instead of a sentinel when its
//! denominator is unknown, so callers exclude the record rather than plot it.

use crate::{EngineError, VehicleRecord};
use serde::Serialize;
use std::fmt;

/// `count / total * 100`, or `0.0` when `total` is zero.
pub fn percent_of(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64 * 100.0
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Miles of range per $1,000 of base MSRP. `None` unless both price and range
/// are strictly positive.
pub fn range_per_thousand_msrp(record: &VehicleRecord) -> Option<f64> {
    let msrp = record.msrp()?;
    let range = record.range()?;
    Some(range / msrp * 1000.0)
}

/// `as_of_year - model_year`. Future model years give negative ages, which are
/// kept so anomalous input stays visible.
pub fn vehicle_age(record: &VehicleRecord, as_of_year: i32) -> Option<i64> {
    record
        .model_year()
        .map(|year| i64::from(as_of_year) - i64::from(year))
}

/// Arithmetic mean over the records for which `field_fn` yields a value.
/// Records without a value count in neither numerator nor denominator.
pub fn average_of<'a, I, F>(records: I, mut field_fn: F) -> Option<f64>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
    F: FnMut(&VehicleRecord) -> Option<f64>,
{
    let (sum, n) = records
        .into_iter()
        .filter_map(|record| field_fn(record))
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));

    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Numeric record fields that can be averaged or plotted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    Msrp,
    Range,
    ModelYear,
    RangePerMsrp,
}

impl NumericField {
    pub const ALL: [NumericField; 4] = [
        NumericField::Msrp,
        NumericField::Range,
        NumericField::ModelYear,
        NumericField::RangePerMsrp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericField::Msrp => "msrp",
            NumericField::Range => "range",
            NumericField::ModelYear => "model_year",
            NumericField::RangePerMsrp => "range_per_msrp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NumericField::Msrp => "Base MSRP (USD)",
            NumericField::Range => "Electric Range (mi)",
            NumericField::ModelYear => "Model Year",
            NumericField::RangePerMsrp => "Range per $1,000 MSRP (mi/$1,000)",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<NumericField> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        match normalized.as_str() {
            "msrp" | "base_msrp" | "price" => Some(NumericField::Msrp),
            "range" | "electric_range" => Some(NumericField::Range),
            "model_year" | "modelyear" | "year" => Some(NumericField::ModelYear),
            "range_per_msrp" | "rangepermsrp" | "efficiency" => Some(NumericField::RangePerMsrp),
            _ => None,
        }
    }

    /// Like `from_str`, but names the accepted fields on failure.
    pub fn parse(raw: &str) -> Result<NumericField, EngineError> {
        Self::from_str(raw).ok_or_else(|| {
            let accepted: Vec<&str> = Self::ALL.iter().map(NumericField::as_str).collect();
            EngineError::invalid(format!(
                "unknown field '{}' (expected one of {})",
                raw,
                accepted.join(", ")
            ))
        })
    }

    /// Field value, or `None` when unknown.
    pub fn value(&self, record: &VehicleRecord) -> Option<f64> {
        match self {
            NumericField::Msrp => record.msrp(),
            NumericField::Range => record.range(),
            NumericField::ModelYear => record.model_year().map(f64::from),
            NumericField::RangePerMsrp => range_per_thousand_msrp(record),
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Declarative record filters
//!
//! Presentation selection state (the selected maker, county, country and so
//! on) reaches the engine as a `RecordFilter` on each query.

use crate::classifier::{classify_eligibility, classify_ev_type, Eligibility, EvType};
use crate::{EngineError, VehicleRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Arbitrary record predicate accepted by the query façade.
pub type Predicate = Arc<dyn Fn(&VehicleRecord) -> bool + Send + Sync>;

/// Field filters combined with AND. Text comparisons ignore ASCII case and
/// surrounding whitespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFilter {
    pub make: Option<String>,
    pub model: Option<String>,
    /// Matches the county → city → state fallback key.
    pub region: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    /// `bev`, `phev`, or any EV type label, including `Unspecified`.
    pub ev_type: Option<String>,
    /// `eligible`, `unknown`, `ineligible`, `unclassified`, or a feed label.
    pub eligibility: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        *self == RecordFilter::default()
    }

    /// Validate and compile into a predicate. Unrecognized eligibility values
    /// and inverted year bounds are rejected here, before any computation.
    pub fn into_predicate(self) -> Result<Predicate, EngineError> {
        let eligibility = match self.eligibility.as_deref() {
            Some(raw) => Some(
                Eligibility::from_str(raw)
                    .ok_or_else(|| EngineError::invalid(format!("unknown eligibility '{}'", raw)))?,
            ),
            None => None,
        };

        if let (Some(min), Some(max)) = (self.min_year, self.max_year) {
            if min > max {
                return Err(EngineError::invalid(format!(
                    "min_year {} is after max_year {}",
                    min, max
                )));
            }
        }

        let ev_type = self.ev_type.as_deref().map(EvType::parse_filter);
        let filter = self;

        Ok(Arc::new(move |record: &VehicleRecord| {
            text_matches(&filter.make, Some(record.make()))
                && text_matches(&filter.model, Some(record.model()))
                && text_matches(&filter.region, record.region_key())
                && text_matches(&filter.county, record.county())
                && text_matches(&filter.city, record.city())
                && text_matches(&filter.country, record.country())
                && ev_type
                    .as_ref()
                    .map_or(true, |wanted| wanted.matches(&classify_ev_type(record)))
                && eligibility.map_or(true, |wanted| wanted == classify_eligibility(record))
                && year_in_range(record.model_year(), filter.min_year, filter.max_year)
        }))
    }
}

fn text_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
    match wanted.as_deref().map(str::trim) {
        None => true,
        Some(wanted) => actual.is_some_and(|actual| actual.eq_ignore_ascii_case(wanted)),
    }
}

fn year_in_range(year: Option<i32>, min: Option<i32>, max: Option<i32>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(year) = year else {
        return false;
    };
    min.map_or(true, |min| year >= min) && max.map_or(true, |max| year <= max)
}

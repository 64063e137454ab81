//! Display-ready series structures
//!
//! These are the only shapes the presentation layer receives. Label order is
//! significant and is never changed here.

use crate::metrics::NumericField;
use crate::VehicleRecord;
use serde::Serialize;
use std::fmt::Display;

/// Ordered `(label, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoricalSeries {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl CategoricalSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: f64) {
        self.labels.push(label.into());
        self.values.push(value);
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for CategoricalSeries {
    fn from_iter<T: IntoIterator<Item = (L, f64)>>(iter: T) -> Self {
        let mut series = CategoricalSeries::new();
        for (label, value) in iter {
            series.push(label, value);
        }
        series
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

/// `(x, y, label)` triples for scatter-style displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointSeries {
    pub x_field: NumericField,
    pub y_field: NumericField,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<SeriesPoint>,
}

impl PointSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTabRow {
    pub key: String,
    pub series: CategoricalSeries,
}

/// One categorical series per outer group, in outer first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossTabSeries {
    pub rows: Vec<CrossTabRow>,
}

impl CrossTabSeries {
    pub fn row(&self, key: &str) -> Option<&CategoricalSeries> {
        self.rows.iter().find(|r| r.key == key).map(|r| &r.series)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The input record set was empty.
    NoRecords,
    /// The filter rejected every record.
    NoMatches,
    /// Records matched, but none produced a group or a defined metric value.
    NoGroups,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            EmptyReason::NoRecords => "No data available.",
            EmptyReason::NoMatches => "No records match the selected filters.",
            EmptyReason::NoGroups => "No data available for the selected view.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Series {
    Categorical(CategoricalSeries),
    Points(PointSeries),
    CrossTab(CrossTabSeries),
    Empty { reason: EmptyReason },
}

impl Series {
    pub fn is_empty(&self) -> bool {
        matches!(self, Series::Empty { .. })
    }

    pub fn as_categorical(&self) -> Option<&CategoricalSeries> {
        match self {
            Series::Categorical(series) => Some(series),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&PointSeries> {
        match self {
            Series::Points(series) => Some(series),
            _ => None,
        }
    }

    pub fn as_crosstab(&self) -> Option<&CrossTabSeries> {
        match self {
            Series::CrossTab(series) => Some(series),
            _ => None,
        }
    }
}

/// Numeric types a categorical value can be built from.
pub trait SeriesValue: Copy {
    fn to_f64(self) -> f64;
}

impl SeriesValue for f64 {
    fn to_f64(self) -> f64 {
        self
    }
}

impl SeriesValue for usize {
    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Build a categorical series from grouped values.
///
/// With `label_order`, those labels come first and in that order, and a label
/// with no entry is emitted with value `0`. Entries whose label is not listed
/// follow in their original order, so nothing counted is ever dropped.
pub fn build_categorical_series<K, V>(
    entries: &[(K, V)],
    label_order: Option<&[&str]>,
) -> CategoricalSeries
where
    K: Display,
    V: SeriesValue,
{
    let labelled: Vec<(String, f64)> = entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_f64()))
        .collect();

    let Some(order) = label_order else {
        return labelled.into_iter().collect();
    };

    let mut series = CategoricalSeries::new();
    for label in order {
        let value = labelled
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
            .unwrap_or(0.0);
        series.push(*label, value);
    }
    for (label, value) in labelled {
        if !order.contains(&label.as_str()) {
            series.push(label, value);
        }
    }
    series
}

/// Build a point series. `filter_fn` runs first, so rejected records never
/// reach `x_fn`/`y_fn`; records where either coordinate is `None` are skipped.
pub fn build_point_series<'a, I, X, Y, L>(
    records: I,
    x_fn: X,
    y_fn: Y,
    label_fn: L,
    filter_fn: Option<&dyn Fn(&VehicleRecord) -> bool>,
) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
    X: Fn(&VehicleRecord) -> Option<f64>,
    Y: Fn(&VehicleRecord) -> Option<f64>,
    L: Fn(&VehicleRecord) -> String,
{
    records
        .into_iter()
        .filter(|record| filter_fn.map_or(true, |keep| keep(record)))
        .filter_map(|record| {
            Some(SeriesPoint {
                x: x_fn(record)?,
                y: y_fn(record)?,
                label: label_fn(record),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Eligibility;
    use crate::test_support::priced;
    use std::cell::Cell;

    #[test]
    fn test_categorical_series_keeps_entry_order() {
        let entries = vec![("TESLA", 4usize), ("AUDI", 9), ("BMW", 1)];
        let series = build_categorical_series(&entries, None);

        assert_eq!(series.labels(), &["TESLA", "AUDI", "BMW"]);
        assert_eq!(series.values(), &[4.0, 9.0, 1.0]);
        assert_eq!(series.labels().len(), series.values().len());
    }

    #[test]
    fn test_label_order_fills_missing_with_zero() {
        let entries = vec![
            (Eligibility::Ineligible.label(), 1usize),
            (Eligibility::Eligible.label(), 2),
        ];
        let order: Vec<&str> = Eligibility::FEED_ORDER.iter().map(|e| e.label()).collect();
        let series = build_categorical_series(&entries, Some(order.as_slice()));

        assert_eq!(series.len(), 3);
        assert_eq!(series.get(Eligibility::Eligible.label()), Some(2.0));
        assert_eq!(series.get(Eligibility::Unknown.label()), Some(0.0));
        assert_eq!(series.get(Eligibility::Ineligible.label()), Some(1.0));
        assert_eq!(series.labels()[0], Eligibility::Eligible.label());
    }

    #[test]
    fn test_label_order_appends_unlisted_entries() {
        let entries = vec![("Unclassified", 5usize), ("b", 1)];
        let series = build_categorical_series(&entries, Some(&["a", "b"][..]));
        assert_eq!(series.labels(), &["a", "b", "Unclassified"]);
        assert_eq!(series.values(), &[0.0, 1.0, 5.0]);
    }

    #[test]
    fn test_point_series_filter_runs_before_mapping() {
        let records = vec![
            priced("TESLA", "MODEL S", 69900.0, 210.0),
            priced("NISSAN", "LEAF", 0.0, 84.0),
            priced("KIA", "SOUL", 33950.0, 0.0),
        ];
        let calls = Cell::new(0);
        let has_price_and_range = |r: &VehicleRecord| r.msrp().is_some() && r.range().is_some();
        let keep: &dyn Fn(&VehicleRecord) -> bool = &has_price_and_range;

        let points = build_point_series(
            &records,
            |r| {
                calls.set(calls.get() + 1);
                r.base_msrp
            },
            |r| r.electric_range,
            |r| r.display_name(),
            Some(keep),
        );

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].x, 69900.0);
        assert_eq!(points[0].y, 210.0);
        assert_eq!(points[0].label, "TESLA MODEL S");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_point_series_skips_missing_coordinates() {
        let records = vec![priced("A", "X", 1000.0, 10.0), priced("B", "Y", 0.0, 10.0)];
        let points = build_point_series(
            &records,
            |r| r.msrp(),
            |r| r.range(),
            |r| r.make().to_string(),
            None,
        );
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, "A");
    }

    #[test]
    fn test_series_serializes_with_kind_tag() {
        let series = Series::Categorical([("A", 1.0)].into_iter().collect());
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json["kind"], "categorical");
        assert_eq!(json["labels"][0], "A");

        let empty = Series::Empty {
            reason: EmptyReason::NoMatches,
        };
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["kind"], "empty");
        assert_eq!(json["reason"], "no_matches");
    }
}

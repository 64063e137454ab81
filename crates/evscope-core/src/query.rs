//! Query façade: filter → classify → group → metric → rank → series
//!
//! `query` is the only entry point the presentation layer needs. It is pure:
//! the same records and parameters always produce the same output.

use crate::classifier::Eligibility;
use crate::filter::{Predicate, RecordFilter};
use crate::grouping::{crosstab, group_by_dimension, Dimension, GroupKey, GroupMap};
use crate::metrics::{average_of, percent_of, range_per_thousand_msrp, round_to, NumericField};
use crate::ranking::top_n;
use crate::series::{
    build_categorical_series, build_point_series, CategoricalSeries, CrossTabRow, CrossTabSeries,
    EmptyReason, PointSeries, Series,
};
use crate::{EngineError, VehicleRecord};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "field", rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Count,
    /// Share of the grouped total, rounded to one decimal.
    Percent,
    /// Range per $1,000 MSRP; per vehicle, or the group mean when grouped.
    RangePerMsrp,
    Average(NumericField),
}

impl Metric {
    /// Parse `count`, `percent`, `range_per_msrp` or `average` (+ field).
    pub fn parse(name: &str, field: Option<&str>) -> Result<Metric, EngineError> {
        let normalized = name.trim().replace('-', "_").to_ascii_lowercase();
        match normalized.as_str() {
            "count" => Ok(Metric::Count),
            "percent" | "percentage" => Ok(Metric::Percent),
            "range_per_msrp" | "rangepermsrp" => Ok(Metric::RangePerMsrp),
            "average" | "avg" | "mean" => {
                let field = field
                    .ok_or_else(|| EngineError::invalid("metric 'average' requires a field"))?;
                NumericField::parse(field).map(Metric::Average)
            }
            _ => Err(EngineError::invalid(format!("unknown metric '{}'", name))),
        }
    }

    fn is_count_like(&self) -> bool {
        matches!(self, Metric::Count | Metric::Percent)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Count => f.write_str("count"),
            Metric::Percent => f.write_str("percent"),
            Metric::RangePerMsrp => f.write_str("range_per_msrp"),
            Metric::Average(field) => write!(f, "average({})", field),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// First occurrence in the input.
    #[default]
    FirstSeen,
    /// Numeric for years and ages, lexical for text keys.
    KeyAscending,
}

impl GroupOrder {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<GroupOrder> {
        match s.trim().replace('-', "_").to_ascii_lowercase().as_str() {
            "first_seen" | "firstseen" | "input" => Some(GroupOrder::FirstSeen),
            "key_ascending" | "keyascending" | "key" | "asc" => Some(GroupOrder::KeyAscending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeriesKind {
    #[default]
    Categorical,
    Scatter { x: NumericField, y: NumericField },
}

/// Typed query parameters.
#[derive(Clone, Default)]
pub struct QueryParams {
    pub filter: Option<Predicate>,
    pub group_by: Option<Dimension>,
    /// Second grouping level; produces a cross-tab.
    pub subgroup: Option<Dimension>,
    pub metric: Metric,
    pub top_n: Option<usize>,
    pub order: GroupOrder,
    /// Reference year for ages. Defaults to the current calendar year.
    pub as_of_year: Option<i32>,
    pub series_kind: SeriesKind,
}

impl fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParams")
            .field("filter", &self.filter.as_ref().map(|_| "<predicate>"))
            .field("group_by", &self.group_by)
            .field("subgroup", &self.subgroup)
            .field("metric", &self.metric)
            .field("top_n", &self.top_n)
            .field("order", &self.order)
            .field("as_of_year", &self.as_of_year)
            .field("series_kind", &self.series_kind)
            .finish()
    }
}

impl QueryParams {
    pub fn grouped(dimension: Dimension, metric: Metric) -> Self {
        Self {
            group_by: Some(dimension),
            metric,
            ..Default::default()
        }
    }

    pub fn scatter(x: NumericField, y: NumericField) -> Self {
        Self {
            series_kind: SeriesKind::Scatter { x, y },
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn with_subgroup(mut self, dimension: Dimension) -> Self {
        self.subgroup = Some(dimension);
        self
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn with_order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_as_of_year(mut self, year: i32) -> Self {
        self.as_of_year = Some(year);
        self
    }

    /// Reject parameter combinations the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.top_n == Some(0) {
            return Err(EngineError::invalid("top_n must be a positive integer"));
        }
        if self.top_n.is_some() && self.group_by.is_none() {
            return Err(EngineError::invalid("top_n requires a grouping dimension"));
        }
        if self.subgroup.is_some() {
            if self.group_by.is_none() {
                return Err(EngineError::invalid("a subgroup requires a grouping dimension"));
            }
            if !self.metric.is_count_like() {
                return Err(EngineError::invalid(format!(
                    "metric '{}' is not supported for cross-tabs",
                    self.metric
                )));
            }
        }
        if matches!(self.series_kind, SeriesKind::Scatter { .. })
            && (self.group_by.is_some() || self.metric != Metric::Count)
        {
            return Err(EngineError::invalid(
                "scatter series take no grouping dimension or metric",
            ));
        }
        Ok(())
    }
}

/// Audit counters for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    pub input_records: usize,
    pub filtered_records: usize,
    /// Filtered records with no group key, or with no defined metric value.
    pub excluded_records: usize,
    pub groups: usize,
    pub emitted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub series: Series,
    pub stats: QueryStats,
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Run the full pipeline over `records`.
pub fn query(records: &[VehicleRecord], params: &QueryParams) -> Result<QueryOutput, EngineError> {
    params.validate()?;
    let as_of_year = params.as_of_year.unwrap_or_else(current_year);

    let mut stats = QueryStats {
        input_records: records.len(),
        ..Default::default()
    };

    if records.is_empty() {
        return Ok(empty(EmptyReason::NoRecords, stats));
    }

    let filtered: Vec<&VehicleRecord> = match &params.filter {
        Some(predicate) => records.iter().filter(|r| predicate(r)).collect(),
        None => records.iter().collect(),
    };
    stats.filtered_records = filtered.len();

    if filtered.is_empty() {
        return Ok(empty(EmptyReason::NoMatches, stats));
    }

    let series = match (params.series_kind, params.group_by, params.subgroup) {
        (SeriesKind::Scatter { x, y }, _, _) => scatter_series(&filtered, x, y, &mut stats),
        (SeriesKind::Categorical, None, _) => ungrouped_series(&filtered, params.metric, &mut stats),
        (SeriesKind::Categorical, Some(outer), None) => {
            grouped_series(&filtered, outer, params, as_of_year, &mut stats)?
        }
        (SeriesKind::Categorical, Some(outer), Some(inner)) => {
            crosstab_series(&filtered, outer, inner, params, as_of_year, &mut stats)?
        }
    };

    let output = match series {
        Some(series) => QueryOutput { series, stats },
        None => empty(EmptyReason::NoGroups, stats),
    };

    tracing::debug!(
        input = output.stats.input_records,
        filtered = output.stats.filtered_records,
        excluded = output.stats.excluded_records,
        groups = output.stats.groups,
        emitted = output.stats.emitted,
        "query complete"
    );

    Ok(output)
}

/// Convenience wrapper: declarative filter plus typed parameters.
pub fn query_filtered(
    records: &[VehicleRecord],
    filter: RecordFilter,
    params: QueryParams,
) -> Result<QueryOutput, EngineError> {
    let params = if filter.is_empty() {
        params
    } else {
        params.with_filter(filter.into_predicate()?)
    };
    query(records, &params)
}

fn empty(reason: EmptyReason, stats: QueryStats) -> QueryOutput {
    QueryOutput {
        series: Series::Empty { reason },
        stats,
    }
}

fn scatter_series(
    filtered: &[&VehicleRecord],
    x: NumericField,
    y: NumericField,
    stats: &mut QueryStats,
) -> Option<Series> {
    let both_known = |r: &VehicleRecord| x.value(r).is_some() && y.value(r).is_some();
    let keep: &dyn Fn(&VehicleRecord) -> bool = &both_known;
    let points = build_point_series(
        filtered.iter().copied(),
        |r| x.value(r),
        |r| y.value(r),
        point_label,
        Some(keep),
    );

    stats.excluded_records = filtered.len() - points.len();
    stats.emitted = points.len();
    if points.is_empty() {
        return None;
    }

    Some(Series::Points(PointSeries {
        x_field: x,
        y_field: y,
        x_label: x.label().to_string(),
        y_label: y.label().to_string(),
        points,
    }))
}

fn point_label(record: &VehicleRecord) -> String {
    match record.model_year() {
        Some(year) => format!("{} ({})", record.display_name(), year),
        None => record.display_name(),
    }
}

fn ungrouped_series(
    filtered: &[&VehicleRecord],
    metric: Metric,
    stats: &mut QueryStats,
) -> Option<Series> {
    let total = filtered.len();
    let series: CategoricalSeries = match metric {
        Metric::Count => [("Total", total as f64)].into_iter().collect(),
        Metric::Percent => [("Total", round_to(percent_of(total, total), 1))]
            .into_iter()
            .collect(),
        Metric::RangePerMsrp => {
            let series: CategoricalSeries = filtered
                .iter()
                .filter_map(|r| range_per_thousand_msrp(r).map(|v| (r.display_name(), v)))
                .collect();
            stats.excluded_records = total - series.len();
            series
        }
        Metric::Average(field) => {
            let known = filtered.iter().filter(|r| field.value(r).is_some()).count();
            stats.excluded_records = total - known;
            match average_of(filtered.iter().copied(), |r| field.value(r)) {
                Some(mean) => [(field.label(), mean)].into_iter().collect(),
                None => CategoricalSeries::new(),
            }
        }
    };

    stats.emitted = series.len();
    if series.is_empty() {
        None
    } else {
        Some(Series::Categorical(series))
    }
}

fn grouped_series(
    filtered: &[&VehicleRecord],
    dimension: Dimension,
    params: &QueryParams,
    as_of_year: i32,
    stats: &mut QueryStats,
) -> Result<Option<Series>, EngineError> {
    let groups = ordered(
        group_by_dimension(filtered.iter().copied(), dimension, as_of_year),
        params.order,
    );
    stats.excluded_records = groups.excluded();
    stats.groups = groups.len();
    if groups.is_empty() {
        return Ok(None);
    }

    let selected = select(&groups, params.top_n)?;
    let grouped_total = groups.grouped();

    let mut entries: Vec<(GroupKey, f64)> = Vec::with_capacity(selected.len());
    for (key, count) in selected {
        let members = groups.get(&key).unwrap_or_default();
        let value = match params.metric {
            Metric::Count => Some(count as f64),
            Metric::Percent => Some(round_to(percent_of(count, grouped_total), 1)),
            Metric::RangePerMsrp => average_of(members.iter().copied(), range_per_thousand_msrp),
            Metric::Average(field) => average_of(members.iter().copied(), |r| field.value(r)),
        };
        match value {
            Some(value) => entries.push((key, value)),
            // No member has a defined value: drop the group rather than plot a sentinel
            None => stats.excluded_records += count,
        }
    }

    let label_order = fixed_label_order(dimension, params);
    let series = build_categorical_series(&entries, label_order.as_deref());

    stats.emitted = series.len();
    if series.is_empty() {
        return Ok(None);
    }
    Ok(Some(Series::Categorical(series)))
}

fn crosstab_series(
    filtered: &[&VehicleRecord],
    outer: Dimension,
    inner: Dimension,
    params: &QueryParams,
    as_of_year: i32,
    stats: &mut QueryStats,
) -> Result<Option<Series>, EngineError> {
    let table = crosstab(
        filtered.iter().copied(),
        |r| outer.key_for(r, as_of_year),
        |r| inner.key_for(r, as_of_year),
    );
    stats.excluded_records = table.total_excluded();

    let mut rows: Vec<(GroupKey, GroupMap<'_>)> = table.rows;
    if params.order == GroupOrder::KeyAscending {
        rows.sort_by(|a, b| a.0.cmp(&b.0));
    }
    if let Some(n) = params.top_n {
        let sizes: Vec<(usize, usize)> = rows
            .iter()
            .enumerate()
            .map(|(slot, (_, inner))| (slot, inner.grouped()))
            .collect();
        let keep: Vec<usize> = top_n(&sizes, n)?.into_iter().map(|(slot, _)| slot).collect();
        let mut slots: Vec<Option<(GroupKey, GroupMap<'_>)>> = rows.into_iter().map(Some).collect();
        rows = keep.into_iter().filter_map(|slot| slots[slot].take()).collect();
    }

    let label_order = fixed_label_order(inner, params);
    let mut series = CrossTabSeries::default();
    for (key, inner_groups) in rows {
        let inner_groups = ordered(inner_groups, params.order);
        if inner_groups.is_empty() {
            continue;
        }
        let row_total = inner_groups.grouped();
        let entries: Vec<(GroupKey, f64)> = inner_groups
            .counts()
            .into_iter()
            .map(|(k, count)| {
                let value = match params.metric {
                    Metric::Percent => round_to(percent_of(count, row_total), 1),
                    _ => count as f64,
                };
                (k, value)
            })
            .collect();
        stats.groups += entries.len();
        series.rows.push(CrossTabRow {
            key: key.to_string(),
            series: build_categorical_series(&entries, label_order.as_deref()),
        });
    }

    stats.emitted = series.rows.len();
    if series.rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(Series::CrossTab(series)))
}

fn ordered<'a>(groups: GroupMap<'a>, order: GroupOrder) -> GroupMap<'a> {
    match order {
        GroupOrder::FirstSeen => groups,
        GroupOrder::KeyAscending => groups.sorted_by_key(),
    }
}

fn select(groups: &GroupMap<'_>, n: Option<usize>) -> Result<Vec<(GroupKey, usize)>, EngineError> {
    let counts = groups.counts();
    match n {
        Some(n) => top_n(&counts, n),
        None => Ok(counts),
    }
}

/// The CAFV chart always shows its three bars, in feed order.
fn fixed_label_order(dimension: Dimension, params: &QueryParams) -> Option<Vec<&'static str>> {
    let applies = dimension == Dimension::Eligibility
        && params.metric.is_count_like()
        && params.top_n.is_none()
        && params.order == GroupOrder::FirstSeen;
    applies.then(|| Eligibility::FEED_ORDER.iter().map(|e| e.label()).collect())
}

// =============================================================================
// String-typed options
// =============================================================================

/// Query options as they arrive from flags or a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub filter: RecordFilter,
    pub group_by: Option<String>,
    pub then_by: Option<String>,
    pub metric: Option<String>,
    pub field: Option<String>,
    pub top_n: Option<i64>,
    pub order: Option<String>,
    pub as_of_year: Option<i32>,
    /// `categorical` (default) or `scatter`.
    pub series: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl QueryOptions {
    /// Resolve into typed parameters. Any unrecognized value rejects the whole
    /// query before computation starts.
    pub fn resolve(self) -> Result<QueryParams, EngineError> {
        let group_by = self.group_by.as_deref().map(parse_dimension).transpose()?;
        let subgroup = self.then_by.as_deref().map(parse_dimension).transpose()?;

        let metric = match self.metric.as_deref() {
            Some(name) => Metric::parse(name, self.field.as_deref())?,
            None => Metric::Count,
        };

        let top_n = match self.top_n {
            Some(n) if n <= 0 => {
                return Err(EngineError::invalid(format!(
                    "top_n must be a positive integer, got {}",
                    n
                )))
            }
            Some(n) => Some(n as usize),
            None => None,
        };

        let order = match self.order.as_deref() {
            Some(raw) => GroupOrder::from_str(raw)
                .ok_or_else(|| EngineError::invalid(format!("unknown order '{}'", raw)))?,
            None => GroupOrder::default(),
        };

        let series_kind = match self.series.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
            None => SeriesKind::Categorical,
            Some(kind) if kind == "categorical" => SeriesKind::Categorical,
            Some(kind) if kind == "scatter" || kind == "points" => SeriesKind::Scatter {
                x: NumericField::parse(self.x.as_deref().unwrap_or("msrp"))?,
                y: NumericField::parse(self.y.as_deref().unwrap_or("range"))?,
            },
            Some(kind) => {
                return Err(EngineError::invalid(format!("unknown series kind '{}'", kind)))
            }
        };

        let filter = if self.filter.is_empty() {
            None
        } else {
            Some(self.filter.into_predicate()?)
        };

        let params = QueryParams {
            filter,
            group_by,
            subgroup,
            metric,
            top_n,
            order,
            as_of_year: self.as_of_year,
            series_kind,
        };
        params.validate()?;
        Ok(params)
    }
}

fn parse_dimension(raw: &str) -> Result<Dimension, EngineError> {
    Dimension::from_str(raw)
        .ok_or_else(|| EngineError::invalid(format!("unknown grouping dimension '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dated, eligible, located, priced, record};
    use pretty_assertions::assert_eq;

    fn categorical(output: &QueryOutput) -> &CategoricalSeries {
        output
            .series
            .as_categorical()
            .expect("expected a categorical series")
    }

    fn fleet() -> Vec<VehicleRecord> {
        let mut records = vec![
            located("TESLA", "King", "Seattle", "WA"),
            located("NISSAN", "", "Tacoma", "WA"),
            located("TESLA", "King", "Bellevue", "WA"),
            located("BMW", "", "", ""),
            located("TESLA", "Pierce", "Tacoma", "WA"),
            located("NISSAN", "King", "Seattle", "WA"),
        ];
        for (i, r) in records.iter_mut().enumerate() {
            r.model_year = Some(2015 + i as i32);
        }
        records
    }

    #[test]
    fn test_partition_invariant_for_every_dimension() {
        let records = fleet();
        for dimension in Dimension::ALL {
            let output = query(&records, &QueryParams::grouped(dimension, Metric::Count)).unwrap();
            let total: f64 = categorical(&output).total();
            assert_eq!(
                total as usize + output.stats.excluded_records,
                output.stats.filtered_records,
                "dimension {}",
                dimension
            );
        }
    }

    #[test]
    fn test_count_by_maker_first_seen_order() {
        let output = query(&fleet(), &QueryParams::grouped(Dimension::Maker, Metric::Count)).unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["TESLA", "NISSAN", "BMW"]);
        assert_eq!(series.values(), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_region_grouping_reports_exclusions() {
        let output = query(&fleet(), &QueryParams::grouped(Dimension::Region, Metric::Count)).unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["King", "Tacoma", "Pierce"]);
        assert_eq!(series.values(), &[3.0, 1.0, 1.0]);
        assert_eq!(output.stats.excluded_records, 1);
    }

    #[test]
    fn test_range_per_msrp_series_excludes_unknown_price() {
        let records = vec![
            priced("A", "X", 10000.0, 200.0),
            priced("B", "Y", 0.0, 150.0),
        ];
        let params = QueryParams {
            metric: Metric::RangePerMsrp,
            ..Default::default()
        };

        let output = query(&records, &params).unwrap();
        let series = categorical(&output);
        assert_eq!(series.len(), 1);
        assert_eq!(series.labels(), &["A X"]);
        assert_eq!(series.values(), &[20.0]);
        assert_eq!(output.stats.excluded_records, 1);
    }

    #[test]
    fn test_range_per_msrp_only_priced_records_with_range() {
        let records = vec![
            priced("A", "X", 10000.0, 200.0),
            priced("B", "Y", 50000.0, 0.0),
            priced("C", "Z", 25000.0, 100.0),
            record("D", "W"),
        ];
        let params = QueryParams {
            metric: Metric::RangePerMsrp,
            ..Default::default()
        };
        let output = query(&records, &params).unwrap();
        let expected = records
            .iter()
            .filter(|r| r.msrp().is_some() && r.range().is_some())
            .count();
        assert_eq!(categorical(&output).len(), expected);
    }

    #[test]
    fn test_grouped_range_per_msrp_drops_undefined_groups() {
        let records = vec![
            priced("A", "X", 10000.0, 200.0),
            priced("A", "X", 20000.0, 200.0),
            priced("B", "Y", 0.0, 150.0),
        ];
        let output = query(
            &records,
            &QueryParams::grouped(Dimension::Maker, Metric::RangePerMsrp),
        )
        .unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["A"]);
        assert_eq!(series.values(), &[15.0]);
        assert_eq!(output.stats.excluded_records, 1);
    }

    #[test]
    fn test_eligibility_series_always_has_three_bars() {
        let records = vec![
            eligible("A", "Clean Alternative Fuel Vehicle Eligible"),
            eligible("B", "Not eligible due to low battery range"),
            eligible("C", "Clean Alternative Fuel Vehicle Eligible"),
        ];
        let output = query(
            &records,
            &QueryParams::grouped(Dimension::Eligibility, Metric::Count),
        )
        .unwrap();
        let series = categorical(&output);
        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), &[2.0, 0.0, 1.0]);

        let percent = query(
            &records,
            &QueryParams::grouped(Dimension::Eligibility, Metric::Percent),
        )
        .unwrap();
        assert_eq!(categorical(&percent).values(), &[66.7, 0.0, 33.3]);
    }

    #[test]
    fn test_unclassified_eligibility_is_appended() {
        let records = vec![
            eligible("A", "Clean Alternative Fuel Vehicle Eligible"),
            eligible("B", "new category"),
        ];
        let output = query(
            &records,
            &QueryParams::grouped(Dimension::Eligibility, Metric::Count),
        )
        .unwrap();
        let series = categorical(&output);
        assert_eq!(series.len(), 4);
        assert_eq!(series.get("Unclassified"), Some(1.0));
        assert_eq!(series.total(), 2.0);
    }

    #[test]
    fn test_top_n_ranks_by_count() {
        let records = vec![
            record("KIA", "NIRO"),
            record("TESLA", "MODEL 3"),
            record("FORD", "MACH-E"),
            record("TESLA", "MODEL Y"),
            record("FORD", "F-150"),
            record("AUDI", "Q4"),
        ];
        let params = QueryParams::grouped(Dimension::Maker, Metric::Count).with_top_n(3);
        let output = query(&records, &params).unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["TESLA", "FORD", "KIA"]);
        assert_eq!(series.values(), &[2.0, 2.0, 1.0]);

        let again = query(&records, &params).unwrap();
        assert_eq!(output, again);
    }

    #[test]
    fn test_age_distribution_key_ascending() {
        let records = vec![
            dated("A", "X", 2020),
            dated("B", "X", 2012),
            dated("C", "X", 2020),
            dated("D", "X", 2026),
        ];
        let params = QueryParams::grouped(Dimension::Age, Metric::Count)
            .with_order(GroupOrder::KeyAscending)
            .with_as_of_year(2025);
        let output = query(&records, &params).unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["-1", "5", "13"]);
        assert_eq!(series.values(), &[1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_average_by_maker() {
        let records = vec![
            priced("TESLA", "S", 80000.0, 300.0),
            priced("TESLA", "3", 40000.0, 0.0),
            priced("KIA", "SOUL", 0.0, 0.0),
        ];
        let output = query(
            &records,
            &QueryParams::grouped(Dimension::Maker, Metric::Average(NumericField::Msrp)),
        )
        .unwrap();
        let series = categorical(&output);
        assert_eq!(series.labels(), &["TESLA"]);
        assert_eq!(series.values(), &[60000.0]);
    }

    #[test]
    fn test_scatter_series_skips_degenerate_points() {
        let mut tesla = priced("TESLA", "MODEL S", 69900.0, 210.0);
        tesla.model_year = Some(2016);
        let records = vec![tesla, priced("NISSAN", "LEAF", 0.0, 84.0)];

        let output = query(
            &records,
            &QueryParams::scatter(NumericField::Msrp, NumericField::Range),
        )
        .unwrap();
        let points = output.series.as_points().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points.points[0].label, "TESLA MODEL S (2016)");
        assert_eq!(output.stats.excluded_records, 1);
    }

    #[test]
    fn test_county_city_crosstab() {
        let params = QueryParams::grouped(Dimension::County, Metric::Count)
            .with_subgroup(Dimension::City);
        let output = query(&fleet(), &params).unwrap();
        let table = output.series.as_crosstab().unwrap();

        assert_eq!(table.rows.len(), 2);
        let king = table.row("King").unwrap();
        assert_eq!(king.labels(), &["Seattle", "Bellevue"]);
        assert_eq!(king.values(), &[2.0, 1.0]);
        assert_eq!(table.row("Pierce").unwrap().values(), &[1.0]);
    }

    #[test]
    fn test_region_eligibility_crosstab_has_three_bars_per_region() {
        let mut a = eligible("A", "Clean Alternative Fuel Vehicle Eligible");
        a.county = Some("King".to_string());
        let mut b = eligible("B", "Not eligible due to low battery range");
        b.city = Some("Yakima".to_string());

        let params = QueryParams::grouped(Dimension::Region, Metric::Count)
            .with_subgroup(Dimension::Eligibility);
        let output = query(&[a, b], &params).unwrap();
        let table = output.series.as_crosstab().unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|row| row.series.len() == 3));
        assert_eq!(table.row("Yakima").unwrap().values(), &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_results_are_distinguishable() {
        let none = query(&[], &QueryParams::default()).unwrap();
        assert_eq!(
            none.series,
            Series::Empty {
                reason: EmptyReason::NoRecords
            }
        );

        let filter = RecordFilter {
            make: Some("RIVIAN".to_string()),
            ..Default::default()
        };
        let no_match = query_filtered(&fleet(), filter, QueryParams::default()).unwrap();
        assert_eq!(
            no_match.series,
            Series::Empty {
                reason: EmptyReason::NoMatches
            }
        );

        let no_groups = query(
            &[record("A", "X")],
            &QueryParams::grouped(Dimension::ModelYear, Metric::Count),
        )
        .unwrap();
        assert_eq!(
            no_groups.series,
            Series::Empty {
                reason: EmptyReason::NoGroups
            }
        );
        assert_eq!(no_groups.stats.excluded_records, 1);
    }

    #[test]
    fn test_filter_selects_a_maker() {
        let filter = RecordFilter {
            make: Some("tesla".to_string()),
            ..Default::default()
        };
        let output = query_filtered(
            &fleet(),
            filter,
            QueryParams::grouped(Dimension::Region, Metric::Count),
        )
        .unwrap();
        assert_eq!(output.stats.filtered_records, 3);
        assert_eq!(categorical(&output).labels(), &["King", "Pierce"]);
    }

    #[test]
    fn test_invalid_queries_are_rejected() {
        let records = fleet();
        let zero_top = QueryParams::grouped(Dimension::Maker, Metric::Count).with_top_n(0);
        assert!(matches!(query(&records, &zero_top), Err(EngineError::InvalidQuery(_))));

        let orphan_subgroup = QueryParams {
            subgroup: Some(Dimension::City),
            ..Default::default()
        };
        assert!(query(&records, &orphan_subgroup).is_err());

        let options = QueryOptions {
            group_by: Some("colour".to_string()),
            ..Default::default()
        };
        assert!(matches!(options.resolve(), Err(EngineError::InvalidQuery(_))));

        let negative = QueryOptions {
            group_by: Some("maker".to_string()),
            top_n: Some(-3),
            ..Default::default()
        };
        assert!(negative.resolve().is_err());

        let bad_metric = QueryOptions {
            metric: Some("median".to_string()),
            ..Default::default()
        };
        assert!(bad_metric.resolve().is_err());
    }

    #[test]
    fn test_query_options_resolve() {
        let options = QueryOptions {
            group_by: Some("modelYear".to_string()),
            metric: Some("average".to_string()),
            field: Some("range".to_string()),
            top_n: Some(2),
            order: Some("first-seen".to_string()),
            as_of_year: Some(2024),
            ..Default::default()
        };
        let params = options.resolve().unwrap();
        assert_eq!(params.group_by, Some(Dimension::ModelYear));
        assert_eq!(params.metric, Metric::Average(NumericField::Range));
        assert_eq!(params.top_n, Some(2));
        assert_eq!(params.as_of_year, Some(2024));
        assert!(params.filter.is_none());

        let scatter = QueryOptions {
            series: Some("scatter".to_string()),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(
            scatter.series_kind,
            SeriesKind::Scatter {
                x: NumericField::Msrp,
                y: NumericField::Range
            }
        );
    }

    #[test]
    fn test_query_options_deserialize_from_json() {
        let options: QueryOptions = serde_json::from_str(
            r#"{"groupBy": "region", "metric": "percent", "filter": {"make": "TESLA", "minYear": 2018}}"#,
        )
        .unwrap();
        assert_eq!(options.group_by.as_deref(), Some("region"));
        assert_eq!(options.filter.min_year, Some(2018));
        assert!(options.resolve().is_ok());
    }
}

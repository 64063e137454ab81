//! Dashboard views expressed as engine queries.

use anyhow::{Context, Result};
use evscope_core::{
    fleet_summary, query, Dimension, FleetSummary, GroupOrder, LoadReport, Metric, NumericField,
    QueryOptions, QueryOutput, QueryParams, QueryStats, RecordFilter, Series, VehicleRecord,
};
use serde::Serialize;

/// How a panel's values are printed in table mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    #[default]
    Count,
    Percent,
    Currency,
    Decimal,
    /// Calendar year, printed without thousands separators.
    Year,
}

impl ValueFormat {
    fn for_metric(metric: Metric) -> Self {
        match metric {
            Metric::Count => ValueFormat::Count,
            Metric::Percent => ValueFormat::Percent,
            Metric::RangePerMsrp => ValueFormat::Decimal,
            Metric::Average(field) => ValueFormat::for_field(field),
        }
    }

    pub fn for_field(field: NumericField) -> Self {
        match field {
            NumericField::Msrp => ValueFormat::Currency,
            NumericField::ModelYear => ValueFormat::Year,
            NumericField::Range | NumericField::RangePerMsrp => ValueFormat::Decimal,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub title: String,
    pub key_heading: String,
    pub value_heading: String,
    #[serde(skip)]
    pub format: ValueFormat,
    pub series: Series,
    pub stats: QueryStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub view: &'static str,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<FleetSummary>,
    pub panels: Vec<Panel>,
    pub load: LoadReport,
}

#[derive(Debug, Clone)]
pub enum View {
    Summary,
    Adoption,
    Types,
    Top { limit: Option<usize>, by: String },
    Eligibility { region: Option<String> },
    Geography { county: Option<String> },
    Makers { make: Option<String> },
    Ages,
    Scatter,
    Efficiency { country: Option<String>, make: Option<String> },
    Query(QueryOptions),
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Summary => "summary",
            View::Adoption => "adoption",
            View::Types => "types",
            View::Top { .. } => "top",
            View::Eligibility { .. } => "eligibility",
            View::Geography { .. } => "geography",
            View::Makers { .. } => "makers",
            View::Ages => "ages",
            View::Scatter => "scatter",
            View::Efficiency { .. } => "efficiency",
            View::Query(_) => "query",
        }
    }
}

/// Settings shared by every view.
#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    pub top_n: usize,
    pub as_of_year: i32,
}

struct PanelSpec<'a> {
    title: String,
    key_heading: &'a str,
    value_heading: &'a str,
    params: QueryParams,
}

impl PanelSpec<'_> {
    fn run(self, records: &[VehicleRecord]) -> Result<Panel> {
        let format = ValueFormat::for_metric(self.params.metric);
        let QueryOutput { series, stats } = query(records, &self.params)
            .with_context(|| format!("Failed to build '{}'", self.title))?;
        Ok(Panel {
            title: self.title,
            key_heading: self.key_heading.to_string(),
            value_heading: self.value_heading.to_string(),
            format,
            series,
            stats,
        })
    }
}

pub fn build_report(
    view: &View,
    records: &[VehicleRecord],
    load: &LoadReport,
    settings: ViewSettings,
) -> Result<Report> {
    let mut summary = None;
    let mut panels = Vec::new();

    let title = match view {
        View::Summary => {
            summary = Some(fleet_summary(records));
            "Fleet summary".to_string()
        }
        View::Adoption => {
            panels.push(
                PanelSpec {
                    title: "Registrations by model year".to_string(),
                    key_heading: "Model Year",
                    value_heading: "Vehicles",
                    params: by(Dimension::ModelYear, Metric::Count, settings)
                        .with_order(GroupOrder::KeyAscending),
                }
                .run(records)?,
            );
            "EV adoption over time".to_string()
        }
        View::Types => {
            for (metric, heading) in [(Metric::Count, "Vehicles"), (Metric::Percent, "Share")] {
                panels.push(
                    PanelSpec {
                        title: format!("{} by EV type", heading),
                        key_heading: "EV Type",
                        value_heading: heading,
                        params: by(Dimension::EvType, metric, settings),
                    }
                    .run(records)?,
                );
            }
            "EV type distribution".to_string()
        }
        View::Top { limit, by: dimension } => {
            let dimension = parse_dimension(dimension)?;
            let limit = limit.unwrap_or(settings.top_n);
            panels.push(
                PanelSpec {
                    title: format!("Top {} by {}", limit, dimension),
                    key_heading: heading_for(dimension),
                    value_heading: "Vehicles",
                    params: by(dimension, Metric::Count, settings).with_top_n(limit),
                }
                .run(records)?,
            );
            format!("Top {}", plural(dimension))
        }
        View::Eligibility { region } => {
            let region = region
                .clone()
                .or_else(|| first_value(records, |r| r.region_key()));
            let filter = RecordFilter {
                region: region.clone(),
                ..Default::default()
            };
            let scope = region.as_deref().unwrap_or("all regions");
            for (metric, heading) in [(Metric::Count, "Vehicles"), (Metric::Percent, "Share")] {
                panels.push(
                    PanelSpec {
                        title: format!("CAFV eligibility in {} ({})", scope, heading.to_lowercase()),
                        key_heading: "Eligibility",
                        value_heading: heading,
                        params: filtered(by(Dimension::Eligibility, metric, settings), &filter)?,
                    }
                    .run(records)?,
                );
            }
            format!("Eligibility analysis: {}", scope)
        }
        View::Geography { county } => {
            let spec = match county {
                Some(county) => PanelSpec {
                    title: format!("Cities in {}", county),
                    key_heading: "City",
                    value_heading: "Vehicles",
                    params: filtered(
                        by(Dimension::City, Metric::Count, settings),
                        &RecordFilter {
                            county: Some(county.clone()),
                            ..Default::default()
                        },
                    )?,
                },
                None => PanelSpec {
                    title: "Vehicles by county and city".to_string(),
                    key_heading: "County / City",
                    value_heading: "Vehicles",
                    params: by(Dimension::County, Metric::Count, settings)
                        .with_subgroup(Dimension::City),
                },
            };
            panels.push(spec.run(records)?);
            "Geographical insights".to_string()
        }
        View::Makers { make } => {
            let make = make
                .clone()
                .or_else(|| records.first().map(|r| r.make().to_string()));
            let filter = RecordFilter {
                make: make.clone(),
                ..Default::default()
            };
            let scope = make.as_deref().unwrap_or("all makers");
            panels.push(
                PanelSpec {
                    title: format!("Models by {}", scope),
                    key_heading: "Model",
                    value_heading: "Vehicles",
                    params: filtered(by(Dimension::Model, Metric::Count, settings), &filter)?,
                }
                .run(records)?,
            );
            panels.push(
                PanelSpec {
                    title: "Range per $1,000 MSRP".to_string(),
                    key_heading: "Vehicle",
                    value_heading: "mi/$1,000",
                    params: filtered(
                        by(Dimension::MakeModel, Metric::RangePerMsrp, settings),
                        &filter,
                    )?,
                }
                .run(records)?,
            );
            format!("Maker analysis: {}", scope)
        }
        View::Ages => {
            panels.push(
                PanelSpec {
                    title: format!("Vehicle age as of {}", settings.as_of_year),
                    key_heading: "Age (years)",
                    value_heading: "Vehicles",
                    params: by(Dimension::Age, Metric::Count, settings)
                        .with_order(GroupOrder::KeyAscending),
                }
                .run(records)?,
            );
            "Vehicle age distribution".to_string()
        }
        View::Scatter => {
            panels.push(
                PanelSpec {
                    title: "Electric range vs base MSRP".to_string(),
                    key_heading: "Vehicle",
                    value_heading: "Range",
                    params: QueryParams::scatter(NumericField::Msrp, NumericField::Range)
                        .with_as_of_year(settings.as_of_year),
                }
                .run(records)?,
            );
            "Range vs MSRP".to_string()
        }
        View::Efficiency { country, make } => {
            let country = country
                .clone()
                .or_else(|| first_value(records, |r| r.country()));
            let filter = RecordFilter {
                country: country.clone(),
                make: make.clone(),
                ..Default::default()
            };
            let scope = country.as_deref().unwrap_or("all countries");
            let params = QueryParams {
                metric: Metric::RangePerMsrp,
                as_of_year: Some(settings.as_of_year),
                ..Default::default()
            };
            panels.push(
                PanelSpec {
                    title: format!("Range per $1,000 MSRP in {}", scope),
                    key_heading: "Vehicle",
                    value_heading: "mi/$1,000",
                    params: filtered(params, &filter)?,
                }
                .run(records)?,
            );
            format!("Cost efficiency: {}", scope)
        }
        View::Query(options) => {
            let mut options = options.clone();
            options.as_of_year = options.as_of_year.or(Some(settings.as_of_year));
            let key_heading = options
                .group_by
                .as_deref()
                .and_then(Dimension::from_str)
                .map(heading_for)
                .unwrap_or("Key");
            let params = options.resolve()?;
            let value_heading = params.metric.to_string();
            let title = match params.group_by {
                Some(dimension) => format!("{} by {}", params.metric, dimension),
                None => params.metric.to_string(),
            };
            panels.push(
                PanelSpec {
                    title,
                    key_heading,
                    value_heading: &value_heading,
                    params,
                }
                .run(records)?,
            );
            "Custom query".to_string()
        }
    };

    Ok(Report {
        view: view.name(),
        title,
        summary,
        panels,
        load: load.clone(),
    })
}

fn by(dimension: Dimension, metric: Metric, settings: ViewSettings) -> QueryParams {
    QueryParams::grouped(dimension, metric).with_as_of_year(settings.as_of_year)
}

fn filtered(params: QueryParams, filter: &RecordFilter) -> Result<QueryParams> {
    if filter.is_empty() {
        return Ok(params);
    }
    Ok(params.with_filter(filter.clone().into_predicate()?))
}

fn first_value<F>(records: &[VehicleRecord], field: F) -> Option<String>
where
    F: Fn(&VehicleRecord) -> Option<&str>,
{
    records.iter().find_map(|r| field(r).map(str::to_string))
}

fn parse_dimension(raw: &str) -> Result<Dimension> {
    Dimension::from_str(raw).ok_or_else(|| {
        let known: Vec<&str> = Dimension::ALL.iter().map(|d| d.as_str()).collect();
        anyhow::anyhow!("Unknown dimension '{}' (expected one of: {})", raw, known.join(", "))
    })
}

fn heading_for(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Maker => "Make",
        Dimension::Model => "Model",
        Dimension::MakeModel => "Vehicle",
        Dimension::Region => "Region",
        Dimension::County => "County",
        Dimension::City => "City",
        Dimension::ModelYear => "Model Year",
        Dimension::Age => "Age (years)",
        Dimension::EvType => "EV Type",
        Dimension::Eligibility => "Eligibility",
    }
}

fn plural(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Maker => "makes",
        Dimension::Model => "models",
        Dimension::MakeModel => "vehicles",
        Dimension::Region => "regions",
        Dimension::County => "counties",
        Dimension::City => "cities",
        Dimension::ModelYear => "model years",
        Dimension::Age => "ages",
        Dimension::EvType => "EV types",
        Dimension::Eligibility => "eligibility categories",
    }
}

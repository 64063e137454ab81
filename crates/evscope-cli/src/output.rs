use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use evscope_core::{CategoricalSeries, CrossTabSeries, FleetSummary, PointSeries, Series};

use crate::commands::{Panel, Report, ValueFormat};

pub fn print_report(report: &Report, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n  {}\n", report.title.bold().cyan());

    if let Some(summary) = &report.summary {
        println!("{}", summary_table(summary));
    }

    for panel in &report.panels {
        print_panel(panel);
    }

    let load = &report.load;
    let mut footer = format!(
        "  {} records from {} file(s)",
        format_count(load.records as f64),
        load.files
    );
    if load.skipped > 0 {
        footer.push_str(&format!(", {} malformed skipped", load.skipped));
    }
    println!("{}", footer.bright_black());
    Ok(())
}

fn print_panel(panel: &Panel) {
    println!("  {}", panel.title.bold());

    match &panel.series {
        Series::Categorical(series) => println!("{}", categorical_table(panel, series)),
        Series::Points(points) => println!("{}", points_table(points)),
        Series::CrossTab(table) => println!("{}", crosstab_table(panel, table)),
        Series::Empty { reason } => println!("  {}", reason.message().yellow()),
    }

    if panel.stats.excluded_records > 0 {
        println!(
            "{}",
            format!(
                "  {} record(s) without a value were excluded",
                panel.stats.excluded_records
            )
            .bright_black()
        );
    }
    println!();
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn categorical_table(panel: &Panel, series: &CategoricalSeries) -> Table {
    let mut table = new_table(vec![panel.key_heading.as_str(), panel.value_heading.as_str()]);
    for (label, value) in series.iter() {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format_value(value, panel.format)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn points_table(series: &PointSeries) -> Table {
    let mut table = new_table(vec!["Vehicle", series.x_label.as_str(), series.y_label.as_str()]);
    let x_format = ValueFormat::for_field(series.x_field);
    let y_format = ValueFormat::for_field(series.y_field);
    for point in &series.points {
        table.add_row(vec![
            Cell::new(&point.label),
            Cell::new(format_value(point.x, x_format)).set_alignment(CellAlignment::Right),
            Cell::new(format_value(point.y, y_format)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn crosstab_table(panel: &Panel, series: &CrossTabSeries) -> Table {
    let mut table = new_table(vec![panel.key_heading.as_str(), "", panel.value_heading.as_str()]);
    for row in &series.rows {
        let mut first = true;
        for (label, value) in row.series.iter() {
            let key = if first { row.key.as_str() } else { "" };
            first = false;
            table.add_row(vec![
                Cell::new(key),
                Cell::new(label),
                Cell::new(format_value(value, panel.format)).set_alignment(CellAlignment::Right),
            ]);
        }
    }
    table
}

fn summary_table(summary: &FleetSummary) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    let optional = |value: Option<String>| value.unwrap_or_else(|| "n/a".to_string());

    let years = match (summary.model_year_start, summary.model_year_end) {
        (Some(start), Some(end)) => format!("{}-{}", start, end),
        _ => "n/a".to_string(),
    };

    let mut rows = vec![
        ("Total vehicles", format_count(summary.total_vehicles as f64)),
        (
            "CAFV eligible",
            format!(
                "{} ({})",
                format_count(summary.eligibility.eligible as f64),
                format_percent(summary.eligible_percent)
            ),
        ),
        ("Average base MSRP", optional(summary.average_msrp.map(format_currency))),
        (
            "Average electric range",
            optional(summary.average_range.map(|r| format!("{:.1} mi", r))),
        ),
        ("Vehicles with a known MSRP", format_count(summary.priced_vehicles as f64)),
        ("Vehicles with a known range", format_count(summary.ranged_vehicles as f64)),
        ("Distinct makes", format_count(summary.distinct_makers as f64)),
        ("Model years", years),
    ];

    for (category, percent) in summary.eligibility.percentages() {
        rows.push((
            category.label(),
            format!(
                "{} ({})",
                format_count(summary.eligibility.count(category) as f64),
                format_percent(percent)
            ),
        ));
    }

    for (metric, value) in rows {
        table.add_row(vec![
            Cell::new(metric),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

fn format_value(value: f64, format: ValueFormat) -> String {
    match format {
        ValueFormat::Count => format_count(value),
        ValueFormat::Percent => format_percent(value),
        ValueFormat::Currency => format_currency(value),
        ValueFormat::Decimal => format!("{:.2}", value),
        ValueFormat::Year => format_year(value),
    }
}

/// Whole years print bare; a mean year keeps one decimal.
fn format_year(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn format_currency(value: f64) -> String {
    let cents = format!("{:.2}", value.abs());
    let (whole, fraction) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, group_thousands(whole), fraction)
}

fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = group_thousands(&rounded.unsigned_abs().to_string());
    if rounded < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// Splits an ASCII digit string into comma-separated groups of three.
fn group_thousands(digits: &str) -> String {
    let mut groups = Vec::with_capacity(digits.len() / 3 + 1);
    let mut end = digits.len();
    while end > 3 {
        groups.push(&digits[end - 3..end]);
        end -= 3;
    }
    groups.push(&digits[..end]);
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use evscope_core::{NumericField, SeriesPoint};

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1234567.0), "1,234,567");
        assert_eq!(format_count(-2.0), "-2");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(69900.0), "$69,900.00");
        assert_eq!(format_currency(12.5), "$12.50");
        assert_eq!(format_currency(1234567.5), "$1,234,567.50");
    }

    #[test]
    fn test_format_value_by_kind() {
        assert_eq!(format_value(66.7, ValueFormat::Percent), "66.7%");
        assert_eq!(format_value(20.0, ValueFormat::Decimal), "20.00");
        assert_eq!(format_value(3.0, ValueFormat::Count), "3");
        assert_eq!(format_value(2020.0, ValueFormat::Year), "2020");
        assert_eq!(format_value(2019.5, ValueFormat::Year), "2019.5");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(""), "");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("123456"), "123,456");
    }

    #[test]
    fn test_points_table_formats_each_axis_by_field() {
        let series = PointSeries {
            x_field: NumericField::Range,
            y_field: NumericField::ModelYear,
            x_label: NumericField::Range.label().to_string(),
            y_label: NumericField::ModelYear.label().to_string(),
            points: vec![SeriesPoint {
                x: 210.0,
                y: 2020.0,
                label: "TESLA MODEL S".to_string(),
            }],
        };

        let rendered = points_table(&series).to_string();
        assert!(rendered.contains("210.00"), "{}", rendered);
        assert!(rendered.contains("2020"), "{}", rendered);
        assert!(!rendered.contains('$'), "{}", rendered);
        assert!(!rendered.contains("2,020"), "{}", rendered);
    }
}

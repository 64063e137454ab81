mod commands;
mod config;
mod output;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{build_report, View, ViewSettings};
use config::Config;
use evscope_core::{load_records, QueryOptions, RecordFilter};

#[derive(Parser)]
#[command(name = "evscope")]
#[command(author, version, about = "Electric vehicle registration analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Record file or directory (JSON, JSONL or CSV)")]
    input: Option<PathBuf>,

    #[arg(long, global = true, help = "Config file (default: <config dir>/evscope/config.toml)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,

    #[arg(long, global = true, help = "Enable debug logging on stderr")]
    debug: bool,

    #[arg(short, long, global = true, help = "Reload and re-run every N seconds (0 runs once)")]
    refresh: Option<u64>,

    #[arg(long, global = true, help = "Reference year for vehicle ages (default: current year)")]
    as_of_year: Option<i32>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show fleet-wide headline figures")]
    Summary,
    #[command(about = "Show registrations by model year")]
    Adoption,
    #[command(about = "Show the EV type distribution")]
    Types,
    #[command(about = "Show the most registered makes or models")]
    Top {
        #[arg(short, long, help = "Number of entries (default: top_n from config)")]
        limit: Option<usize>,
        #[arg(long, default_value = "maker", help = "maker, model or make_model")]
        by: String,
    },
    #[command(about = "Show CAFV eligibility for a region")]
    Eligibility {
        #[arg(long, help = "County, city or state (default: first region in the data)")]
        region: Option<String>,
    },
    #[command(about = "Show vehicles by county and city")]
    Geography {
        #[arg(long, help = "Show only the cities of this county")]
        county: Option<String>,
    },
    #[command(about = "Show model counts and cost efficiency for one make")]
    Makers {
        #[arg(long, help = "Make to analyse (default: make of the first record)")]
        make: Option<String>,
    },
    #[command(about = "Show the vehicle age distribution")]
    Ages,
    #[command(about = "Show electric range against base MSRP")]
    Scatter,
    #[command(about = "Show range per $1,000 MSRP by country")]
    Efficiency {
        #[arg(long, help = "Country (default: first country in the data)")]
        country: Option<String>,
        #[arg(long, help = "Restrict to one make")]
        make: Option<String>,
    },
    #[command(about = "Run a custom grouping query")]
    Query(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long, help = "Grouping dimension")]
    group_by: Option<String>,
    #[arg(long, help = "Second grouping dimension (cross-tab)")]
    then_by: Option<String>,
    #[arg(long, default_value = "count", help = "count, percent, range_per_msrp or average")]
    metric: String,
    #[arg(long, help = "Field for the average metric: msrp, range, model_year, range_per_msrp")]
    field: Option<String>,
    #[arg(long, allow_negative_numbers = true, help = "Keep the N largest groups")]
    top: Option<i64>,
    #[arg(long, help = "first_seen or key_ascending")]
    order: Option<String>,
    #[arg(long, help = "categorical or scatter")]
    series: Option<String>,
    #[arg(long, help = "Scatter x field (default: msrp)")]
    x: Option<String>,
    #[arg(long, help = "Scatter y field (default: range)")]
    y: Option<String>,
    #[arg(long)]
    make: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    county: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    country: Option<String>,
    #[arg(long, help = "bev, phev or a feed label")]
    ev_type: Option<String>,
    #[arg(long, help = "eligible, unknown, ineligible or unclassified")]
    eligibility: Option<String>,
    #[arg(long)]
    min_year: Option<i32>,
    #[arg(long)]
    max_year: Option<i32>,
}

impl QueryArgs {
    fn into_options(self) -> QueryOptions {
        QueryOptions {
            filter: RecordFilter {
                make: self.make,
                model: self.model,
                region: self.region,
                county: self.county,
                city: self.city,
                country: self.country,
                ev_type: self.ev_type,
                eligibility: self.eligibility,
                min_year: self.min_year,
                max_year: self.max_year,
            },
            group_by: self.group_by,
            then_by: self.then_by,
            metric: Some(self.metric),
            field: self.field,
            top_n: self.top,
            order: self.order,
            as_of_year: None,
            series: self.series,
            x: self.x,
            y: self.y,
        }
    }
}

impl Commands {
    fn into_view(self) -> View {
        match self {
            Commands::Summary => View::Summary,
            Commands::Adoption => View::Adoption,
            Commands::Types => View::Types,
            Commands::Top { limit, by } => View::Top { limit, by },
            Commands::Eligibility { region } => View::Eligibility { region },
            Commands::Geography { county } => View::Geography { county },
            Commands::Makers { make } => View::Makers { make },
            Commands::Ages => View::Ages,
            Commands::Scatter => View::Scatter,
            Commands::Efficiency { country, make } => View::Efficiency { country, make },
            Commands::Query(args) => View::Query(args.into_options()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = Config::load(cli.config.as_deref())?;

    let input = cli
        .input
        .or_else(|| config.input.clone())
        .ok_or_else(|| anyhow::anyhow!("No input given. Pass --input or set `input` in the config file"))?;
    let settings = ViewSettings {
        top_n: config.top_n,
        as_of_year: cli
            .as_of_year
            .or(config.as_of_year)
            .unwrap_or_else(evscope_core::current_year),
    };
    let json = cli.json || config.json;
    let refresh = cli.refresh.unwrap_or(config.refresh_secs);
    let view = cli.command.into_view();

    tracing::debug!(view = view.name(), input = %input.display(), refresh, "starting");

    if refresh == 0 {
        run_view(&view, &input, settings, json)
    } else {
        run_refresh_loop(&view, &input, settings, json, refresh)
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_view(view: &View, input: &Path, settings: ViewSettings, json: bool) -> Result<()> {
    let loaded = load_records(input)
        .with_context(|| format!("Could not load records from {}", input.display()))?;
    let report = build_report(view, &loaded.records, &loaded.report, settings)?;
    output::print_report(&report, json)
}

/// Re-read the input and re-run the view every `secs` seconds until Ctrl-C.
/// A failure after the first successful run is logged and the loop continues.
fn run_refresh_loop(
    view: &View,
    input: &Path,
    settings: ViewSettings,
    json: bool,
    secs: u64,
) -> Result<()> {
    use colored::Colorize;
    use tokio::runtime::Runtime;

    run_view(view, input, settings, json)?;

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        // The first tick completes immediately and the view has already run
        ticker.tick().await;

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !json {
                        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                        println!("{}", format!("  Refreshed at {}", stamp).bright_black());
                    }
                    if let Err(e) = run_view(view, input, settings, json) {
                        tracing::warn!(error = %format!("{:#}", e), "refresh failed, keeping previous output");
                    }
                }
                _ = &mut shutdown => break,
            }
        }
    });

    Ok(())
}

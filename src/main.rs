//! CLI entry point for the delivery performance analyzer.
//!
//! Provides subcommands for reporting metrics over a delivery extract,
//! listing the dependent selector options, and validating an extract's
//! schema. The engine itself lives in the library; this binary is the thin
//! presentation shell that feeds it a CSV extract and prints JSON.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use delivery_perf::ingest::{ColumnMap, RawTable};
use delivery_perf::metrics::TimeGrain;
use delivery_perf::query::{Filter, Session};
use delivery_perf::report::{PerformanceReport, SelectorOptions, print_json};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "delivery_perf")]
#[command(about = "A tool to analyze vehicle-delivery performance extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum GrainArg {
    Day,
    Week,
    Month,
}

impl From<GrainArg> for TimeGrain {
    fn from(g: GrainArg) -> Self {
        match g {
            GrainArg::Day => TimeGrain::Day,
            GrainArg::Week => TimeGrain::Week,
            GrainArg::Month => TimeGrain::Month,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the performance report for a filter context
    Report {
        /// Path to the CSV delivery extract
        #[arg(short, long)]
        input: String,

        /// JSON file mapping logical column names to source column names
        #[arg(long)]
        mapping: Option<String>,

        /// Restrict to one delivery city
        #[arg(long)]
        city: Option<String>,

        /// Restrict to one month (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Restrict to one operator
        #[arg(long)]
        operator: Option<String>,

        /// How many slowest deliveries to rank
        #[arg(short = 'n', long, default_value_t = 10)]
        slowest_n: usize,

        /// Temporal grain for trend and contribution grouping
        #[arg(short, long, value_enum, default_value_t = GrainArg::Month)]
        group_by: GrainArg,
    },
    /// List selector options (cities, and months/operators for a chosen city)
    Options {
        /// Path to the CSV delivery extract
        #[arg(short, long)]
        input: String,

        /// JSON file mapping logical column names to source column names
        #[arg(long)]
        mapping: Option<String>,

        /// City whose dependent month options to list
        #[arg(long)]
        city: Option<String>,

        /// Month (YYYY-MM) whose operator options to list, with --city
        #[arg(long)]
        month: Option<String>,
    },
    /// Ingest an extract and report accepted/rejected rows without querying
    Validate {
        /// Path to the CSV delivery extract
        #[arg(short, long)]
        input: String,

        /// JSON file mapping logical column names to source column names
        #[arg(long)]
        mapping: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/delivery_perf.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("delivery_perf.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            input,
            mapping,
            city,
            month,
            operator,
            slowest_n,
            group_by,
        } => {
            let session = ingest_file(&input, mapping.as_deref())?;
            let dataset = session.dataset().expect("ingest installed a dataset");

            let filter = Filter {
                city,
                month,
                operator,
            };
            let subset = dataset.filter(&filter);
            info!(
                total = dataset.len(),
                matched = subset.len(),
                "Filter applied"
            );

            let report = PerformanceReport::build(&subset, slowest_n, group_by.into());
            print_json(&report)?;
        }
        Commands::Options {
            input,
            mapping,
            city,
            month,
        } => {
            let session = ingest_file(&input, mapping.as_deref())?;
            let dataset = session.dataset().expect("ingest installed a dataset");

            let months = city
                .as_deref()
                .map(|c| dataset.months_for_city(c))
                .unwrap_or_default();
            let operators = match (city.as_deref(), month.as_deref()) {
                (Some(c), Some(m)) => dataset.operators_for(c, m),
                _ => Vec::new(),
            };

            let options = SelectorOptions {
                cities: dataset.cities(),
                months,
                operators,
            };
            print_json(&options)?;
        }
        Commands::Validate { input, mapping } => {
            let session = ingest_file(&input, mapping.as_deref())?;
            let dataset = session.dataset().expect("ingest installed a dataset");

            for rejection in &dataset.summary().rejections {
                warn!(row = rejection.row, reason = %rejection.reason, "Row rejected");
            }
            print_json(dataset.summary())?;
        }
    }

    Ok(())
}

/// Loads the extract, resolves the column mapping, and runs one ingestion.
#[tracing::instrument(skip(mapping))]
fn ingest_file(input: &str, mapping: Option<&str>) -> Result<Session> {
    let map = match mapping {
        Some(path) => ColumnMap::from_json_file(path)?,
        None => ColumnMap::default(),
    };

    let table = RawTable::from_csv_path(input)?;
    info!(rows = table.rows.len(), "Extract loaded");

    let mut session = Session::new();
    session.ingest(&table, &map)?;
    Ok(session)
}

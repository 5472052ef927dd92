//! CLI entry point for the traffic count report tool.
//!
//! Provides subcommands for building total-volume and fifteen-minute
//! reports from a survey dataset, listing the count categories a survey
//! offers, and listing the known directions.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use traffic_count_report::analyzers::types::{DIRECTIONS, EntityLevel, ReportKind, all_directions};
use traffic_count_report::category::CountType;
use traffic_count_report::output::{format_json, format_table, format_titled, write_report};
use traffic_count_report::source::{CsvSurveyStore, SurveySource};
use traffic_count_report::time::DmgTime;
use traffic_count_report::{ReportRequest, build_report};

#[derive(Parser)]
#[command(name = "traffic_count_report")]
#[command(about = "Reports traffic survey counts by station or screenline", long_about = None)]
struct Cli {
    /// Directory holding the survey CSV tables
    #[arg(short, long, env = "COUNT_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Station,
    Screenline,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    TotalVolume,
    FifteenMinute,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryFilter {
    Technology,
    VehicleTotal,
    PersonTotal,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a count report for a region and survey
    Report {
        #[arg(long)]
        region: u32,

        #[arg(long)]
        survey: u32,

        #[arg(long, value_enum, default_value_t = Level::Station)]
        level: Level,

        #[arg(long, value_enum, default_value_t = Kind::TotalVolume)]
        kind: Kind,

        /// Direction to include (repeatable, default all)
        #[arg(long = "direction")]
        directions: Vec<char>,

        /// Window start as a DMG time, e.g. 600
        #[arg(long)]
        start: u32,

        /// Window end as a DMG time, e.g. 900
        #[arg(long)]
        end: u32,

        /// Category id, repeated in column order
        #[arg(long = "category", required = true)]
        categories: Vec<u32>,

        /// Restrict the report to a station or screenline code (repeatable)
        #[arg(long = "only")]
        entities: Vec<String>,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// File to write the report to (default stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Omit the region and year line above the table
        #[arg(long, default_value_t = false)]
        no_title: bool,
    },
    /// List the count categories observed in a survey
    Categories {
        #[arg(long)]
        survey: u32,

        /// Only list one count type
        #[arg(long, value_enum)]
        count_type: Option<CategoryFilter>,
    },
    /// List the known directions
    Directions,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/traffic_count_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("traffic_count_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Directions => {
            for direction in DIRECTIONS {
                println!("{direction}");
            }
        }
        Commands::Categories { survey, count_type } => {
            let store = open_store(&cli.data_dir)?;
            let catalog = store.categories(survey)?;

            let wanted = count_type.map(|filter| match filter {
                CategoryFilter::Technology => CountType::Technology,
                CategoryFilter::VehicleTotal => CountType::VehicleTotal,
                CategoryFilter::PersonTotal => CountType::PersonTotal,
            });

            for category in catalog
                .iter()
                .filter(|c| wanted.is_none_or(|w| c.count_type == w))
            {
                println!("{}\t{}\t{}", category.id, category.display_name, category.count_type);
            }
        }
        Commands::Report {
            region,
            survey,
            level,
            kind,
            directions,
            start,
            end,
            categories,
            entities,
            format,
            output,
            no_title,
        } => {
            let request = ReportRequest {
                region_id: region,
                survey_id: survey,
                level: match level {
                    Level::Station => EntityLevel::Station,
                    Level::Screenline => EntityLevel::Screenline,
                },
                kind: match kind {
                    Kind::TotalVolume => ReportKind::TotalVolume,
                    Kind::FifteenMinute => ReportKind::FifteenMinute,
                },
                directions: if directions.is_empty() {
                    all_directions()
                } else {
                    directions
                },
                start: DmgTime::new(start)?,
                end: DmgTime::new(end)?,
                categories,
                entities: (!entities.is_empty()).then_some(entities),
            };

            let store = open_store(&cli.data_dir)?;
            let report = build_report(&store, &request)?;
            if report.is_empty() {
                warn!("No observations matched the request");
            }

            let text = match (format, no_title) {
                (Format::Json, _) => format_json(&report)?,
                (Format::Csv, true) => format_table(&report)?,
                (Format::Csv, false) => format_titled(&report)?,
            };

            match output {
                Some(path) => write_report(&path, &text)?,
                None => print!("{text}"),
            }
        }
    }

    Ok(())
}

/// Loads the survey tables, logging how long it took.
#[tracing::instrument(skip(dir), fields(data_dir = %dir.display()))]
fn open_store(dir: &Path) -> Result<CsvSurveyStore> {
    let started = std::time::Instant::now();
    let store = CsvSurveyStore::open(dir)
        .with_context(|| format!("failed to load survey data from {}", dir.display()))?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Survey data loaded");
    Ok(store)
}

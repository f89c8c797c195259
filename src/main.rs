//! CLI entry point for the ridership demand tool.
//!
//! Provides subcommands for aggregating raw survey exports, fitting demand
//! curves by demographic segment, and estimating consumer surplus.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ridership_demand::{
    aggregate::aggregate_survey,
    curve::{DemandTable, fit_curves},
    output::{FitRecord, append_record, ensure_parent, print_json, write_survey},
    parser::load_survey,
    plot::{render_curves, render_surplus},
    schema::{AttentionCheck, DEFAULT_EXCLUDE_MARKER},
    surplus::estimate_surplus,
    tiers::PriceSchedule,
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_SUBJECT: &str = "Berkeley AC Transit Buses";

#[derive(Parser)]
#[command(name = "ridership_demand")]
#[command(about = "Price-demand curves and consumer surplus from a transit survey", long_about = None)]
struct Cli {
    /// JSON file mapping tier names to fares (defaults to the built-in table)
    #[arg(long, global = true, value_name = "JSON")]
    price_tiers: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop failed attention checks and add per-tier average demand columns
    Aggregate {
        /// Raw survey export
        #[arg(value_name = "INPUT")]
        input: String,

        /// Where to write the augmented survey
        #[arg(short, long)]
        output: String,

        /// Column holding the attention-check answer
        #[arg(long, default_value = "Q136")]
        attention_column: String,

        /// Answer a respondent must give to be kept
        #[arg(long, default_value = "2")]
        attention_answer: String,

        /// Columns containing this marker are not demand answers
        #[arg(long, default_value = DEFAULT_EXCLUDE_MARKER)]
        exclude_marker: String,
    },
    /// Fit one demand curve per value of each grouping field and chart them
    Curves {
        /// Augmented survey produced by `aggregate`
        #[arg(value_name = "INPUT")]
        input: String,

        /// Grouping field; repeat for several charts. Omit for one overall curve
        #[arg(short, long = "by", value_name = "FIELD")]
        by: Vec<String>,

        /// Directory for chart images
        #[arg(short = 'd', long, default_value = "Figures/multiple_lr")]
        figures_dir: String,

        /// Subject named in chart titles
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Optional: CSV file to append fit summaries to
        #[arg(long)]
        summary: Option<String>,
    },
    /// Fit the overall demand curve and estimate consumer surplus
    Surplus {
        /// Augmented survey produced by `aggregate`
        #[arg(value_name = "INPUT")]
        input: String,

        /// Directory for the chart image
        #[arg(short = 'd', long, default_value = "Figures")]
        figures_dir: String,

        /// Subject named in the chart title
        #[arg(long, default_value = DEFAULT_SUBJECT)]
        subject: String,

        /// Optional: CSV file to append the estimate to
        #[arg(long)]
        summary: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/ridership_demand.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ridership_demand.log"));

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

    let schedule = match &cli.price_tiers {
        Some(path) => PriceSchedule::load(path)
            .with_context(|| format!("failed to load price tiers from '{path}'"))?,
        None => PriceSchedule::default(),
    };
    info!(tiers = schedule.len(), "Price schedule ready");

    match cli.command {
        Commands::Aggregate {
            input,
            output,
            attention_column,
            attention_answer,
            exclude_marker,
        } => {
            let check = AttentionCheck {
                column: attention_column,
                expected: attention_answer,
            };
            run_aggregate(&input, &output, &schedule, &check, &exclude_marker)?;
        }
        Commands::Curves {
            input,
            by,
            figures_dir,
            subject,
            summary,
        } => {
            run_curves(&input, &by, &figures_dir, &subject, summary.as_deref(), &schedule)?;
        }
        Commands::Surplus {
            input,
            figures_dir,
            subject,
            summary,
        } => {
            run_surplus(&input, &figures_dir, &subject, summary.as_deref(), &schedule)?;
        }
    }

    Ok(())
}

/// Filters and augments the raw survey, writing the result to `output`.
#[tracing::instrument(skip(schedule, check))]
fn run_aggregate(
    input: &str,
    output: &str,
    schedule: &PriceSchedule,
    check: &AttentionCheck,
    exclude_marker: &str,
) -> Result<()> {
    let table = load_survey(input).with_context(|| format!("failed to read survey '{input}'"))?;
    let (augmented, report) = aggregate_survey(&table, schedule, check, exclude_marker)?;

    write_survey(output, &augmented)?;
    print_json(&report)?;
    info!(output, "CSV updated with average demand columns for each price point");
    Ok(())
}

/// Fits and charts demand curves for each grouping field in `by`.
#[tracing::instrument(skip(schedule, summary))]
fn run_curves(
    input: &str,
    by: &[String],
    figures_dir: &str,
    subject: &str,
    summary: Option<&str>,
    schedule: &PriceSchedule,
) -> Result<()> {
    let table = load_survey(input).with_context(|| format!("failed to read survey '{input}'"))?;
    let demand = DemandTable::bind(&table, schedule)?;

    let fields: Vec<Option<&str>> = if by.is_empty() {
        vec![None]
    } else {
        by.iter().map(|f| Some(f.as_str())).collect()
    };

    for field in fields {
        let set = fit_curves(&demand, field)?;
        if set.curves.is_empty() {
            warn!(field = ?field, "No group produced a demand sample; skipping chart");
            continue;
        }

        let path = Path::new(figures_dir).join(set.file_name());
        ensure_parent(&path)?;
        render_curves(&path, &set, subject)?;
        info!(path = %path.display(), groups = set.curves.len(), "Demand chart saved");

        if let Some(summary) = summary {
            for curve in &set.curves {
                let mut record = FitRecord::from_curve(field, curve);
                if curve.fit.is_none() {
                    record = record.with_error("fewer than 2 distinct demand samples");
                }
                append_record(summary, &record)?;
            }
        }
    }

    Ok(())
}

/// Estimates consumer surplus for the whole population and charts it.
#[tracing::instrument(skip(schedule, summary))]
fn run_surplus(
    input: &str,
    figures_dir: &str,
    subject: &str,
    summary: Option<&str>,
    schedule: &PriceSchedule,
) -> Result<()> {
    let table = load_survey(input).with_context(|| format!("failed to read survey '{input}'"))?;
    let demand = DemandTable::bind(&table, schedule)?;
    let samples = demand.population_samples();
    let sample_count = samples.len();

    let estimate = match estimate_surplus(samples) {
        Ok(estimate) => estimate,
        Err(e) => {
            if let Some(summary) = summary {
                append_record(
                    summary,
                    &FitRecord::from_error("All respondents", sample_count, &e.to_string()),
                )?;
            }
            return Err(e).context("consumer surplus could not be estimated");
        }
    };

    let record = FitRecord::from_surplus(&estimate);
    print_json(&record)?;
    if let Some(summary) = summary {
        append_record(summary, &record)?;
    }

    let path = Path::new(figures_dir).join("consumer_surplus.png");
    ensure_parent(&path)?;
    render_surplus(&path, &estimate, subject)?;
    info!(
        path = %path.display(),
        consumer_surplus = estimate.consumer_surplus,
        "Surplus chart saved"
    );
    Ok(())
}

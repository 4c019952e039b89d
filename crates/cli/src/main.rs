mod config;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tickstream_core::{BarInterval, TickTimePeriod};
use tickstream_data::{CsvFeed, DateFormat};
use tickstream_engine::{BarStream, StreamError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{IndicatorSet, Summary};

#[derive(Parser)]
#[command(name = "tickstream")]
#[command(about = "Run streaming technical indicators over a bar file")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "TICKSTREAM_LOG")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a CSV bar file through a set of indicators
    Run {
        /// Path to CSV data file (date, open, high, low, close, volume)
        #[arg(short, long)]
        data: PathBuf,

        /// TOML file with [[indicator]] tables; a default set is used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bar interval: daily, weekly, monthly or <n>m
        #[arg(short, long, default_value = "daily", value_parser = parse_interval)]
        interval: BarInterval,

        /// Date column format: auto, ymd, y/m/d or a chrono pattern
        #[arg(long, default_value = "auto")]
        date_format: DateFormat,

        /// The file has no header row
        #[arg(long)]
        no_headers: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the standard tick time periods
    Periods,
}

fn parse_interval(s: &str) -> Result<BarInterval, String> {
    match s {
        "daily" => Ok(BarInterval::Daily),
        "weekly" => Ok(BarInterval::Weekly),
        "monthly" => Ok(BarInterval::Monthly),
        other => other
            .strip_suffix('m')
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|minutes| *minutes > 0)
            .map(|minutes| BarInterval::Intraday { minutes })
            .ok_or_else(|| format!("unknown interval '{other}'")),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Run {
            data,
            config,
            interval,
            date_format,
            no_headers,
            json,
        } => run(data, config, interval, date_format, no_headers, json).await?,
        Commands::Periods => {
            println!("{:<16} {:>10}", "period", "seconds");
            for period in TickTimePeriod::ALL {
                println!("{:<16} {:>10}", format!("{period:?}"), period.seconds());
            }
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct RunReport {
    interval: String,
    bars: usize,
    first: Option<String>,
    last: Option<String>,
    low: Option<f64>,
    high: Option<f64>,
    faulted: usize,
    indicators: Vec<Summary>,
}

async fn run(
    data: PathBuf,
    config: Option<PathBuf>,
    interval: BarInterval,
    date_format: DateFormat,
    no_headers: bool,
    json: bool,
) -> Result<()> {
    let set = match &config {
        Some(path) => IndicatorSet::load(path)?,
        None => IndicatorSet::default_set(),
    };

    tracing::info!(
        data = %data.display(),
        %interval,
        indicators = set.indicators.len(),
        "Starting run"
    );

    let bars = CsvFeed::dohlcv(&data, date_format)
        .has_headers(!no_headers)
        .load()?;
    if bars.is_empty() {
        anyhow::bail!("No bars loaded from CSV file");
    }
    tracing::info!(bars = bars.len(), "Loaded bar file");

    let mut stream = BarStream::new(interval);
    let attached = set.attach_all(&mut stream)?;

    let mut faulted = 0;
    for bar in bars {
        match stream.receive_bar(bar).await {
            Ok(_) => {}
            Err(StreamError::SubscriberFaulted { bar_index, faults }) => {
                faulted += faults.len();
                tracing::warn!(bar_index, faults = faults.len(), "Indicators detached after fault");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let report = RunReport {
        interval: interval.to_string(),
        bars: stream.len(),
        first: stream.min_date().ok().map(|d| d.to_rfc3339()),
        last: stream.max_date().ok().map(|d| d.to_rfc3339()),
        low: stream.min_value(),
        high: stream.max_value(),
        faulted,
        indicators: attached.iter().map(|a| a.summary()).collect(),
    };
    tracing::info!(bars = report.bars, faulted, "Run complete");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn print_report(report: &RunReport) {
    let sep = "=".repeat(86);
    println!("\n{sep}");
    println!("  RUN SUMMARY");
    println!("{sep}");
    println!("  Interval:   {}", report.interval);
    println!("  Bars:       {}", report.bars);
    println!(
        "  Period:     {} → {}",
        report.first.as_deref().unwrap_or("-"),
        report.last.as_deref().unwrap_or("-")
    );
    println!(
        "  Range:      {} .. {}",
        fmt_value(report.low),
        fmt_value(report.high)
    );
    if report.faulted > 0 {
        println!("  Faulted:    {}", report.faulted);
    }
    println!("{sep}");
    println!(
        "  {:<32} {:>8} {:>8} {:>10} {:>12} {:>12}",
        "indicator", "lookback", "results", "from bar", "min", "max"
    );
    for s in &report.indicators {
        println!(
            "  {:<32} {:>8} {:>8} {:>10} {:>12} {:>12}",
            s.label,
            s.lookback,
            s.len,
            fmt_opt(s.valid_from_bar),
            fmt_value(s.min),
            fmt_value(s.max)
        );
    }
    println!("{sep}\n");
}

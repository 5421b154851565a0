//! TrailSignal CLI: scan, watch and evaluate commands.
//!
//! Commands:
//! - `scan`: fetch every configured (coin, timeframe) window once and report signals
//! - `watch`: repeat the scan on an interval
//! - `evaluate`: run the engine over a local CSV file
//! - `config`: print the effective configuration as TOML
//! - `coins`: list the known USDT pairs

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use trailsignal_core::data::load_csv;
use trailsignal_core::domain::Timeframe;
use trailsignal_core::engine::{evaluate, indicator_rows, IndicatorRow, SignalParams};
use trailsignal_core::indicators::StopSeed;
use trailsignal_runner::{
    build_provider, export_csv, export_json, render_text, run_scan, run_watch, ScanConfig,
    ScanReport, ScanSummary, SourceOptions, WatchOptions, KNOWN_COINS,
};

#[derive(Parser)]
#[command(
    name = "trailsignal",
    about = "TrailSignal CLI: ATR trailing-stop Buy/Sell signals for crypto pairs"
)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Path to a TOML scan config. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every coin/timeframe pair once and print the signals.
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-scan on an interval until interrupted.
    Watch {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Seconds between scans. Overrides [watch] interval_secs.
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many scans.
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Evaluate a local CSV file (timestamp,open,high,low,close[,volume]).
    Evaluate {
        /// CSV file to evaluate.
        file: PathBuf,

        #[command(flatten)]
        signal: SignalArgs,

        /// Print every indicator row, not just the final decision.
        #[arg(long, default_value_t = false)]
        trace: bool,

        /// Print JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
    /// List the known USDT pairs.
    Coins,
}

#[derive(Args)]
struct ScanArgs {
    /// Coins to scan (e.g. BTCUSDT,ETHUSDT). Overrides [scan] coins.
    #[arg(long, value_delimiter = ',')]
    coins: Vec<String>,

    /// Timeframes to scan (e.g. 1m,15m,1h). Overrides [scan] timeframes.
    #[arg(long, value_delimiter = ',')]
    timeframes: Vec<Timeframe>,

    /// Candles requested per pair. Overrides [scan] limit.
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct SignalArgs {
    /// ATR multiplier.
    #[arg(long)]
    sensitivity: Option<f64>,

    /// ATR averaging window.
    #[arg(long)]
    window: Option<usize>,

    /// Span of the trend reference EMA (1 = close).
    #[arg(long)]
    trend_span: Option<usize>,

    /// Leave the first stop unseeded instead of seeding it at the first close.
    #[arg(long, default_value_t = false)]
    unseeded: bool,
}

#[derive(Args)]
struct SourceArgs {
    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Directory of <SYMBOL>_<timeframe>.csv files, tried before the network.
    #[arg(long)]
    csv_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl ScanArgs {
    fn apply(&self, config: &mut ScanConfig) {
        if !self.coins.is_empty() {
            config.scan.coins = self.coins.iter().map(|c| c.trim().to_uppercase()).collect();
        }
        if !self.timeframes.is_empty() {
            config.scan.timeframes = self.timeframes.clone();
        }
        if let Some(limit) = self.limit {
            config.scan.limit = limit;
        }
    }
}

impl SignalArgs {
    fn apply(&self, params: &mut SignalParams) {
        if let Some(s) = self.sensitivity {
            params.sensitivity = s;
        }
        if let Some(w) = self.window {
            params.window_size = w;
        }
        if let Some(span) = self.trend_span {
            params.trend_span = span;
        }
        if self.unseeded {
            params.seed = StopSeed::Unseeded;
        }
    }
}

impl SourceArgs {
    fn options(&self) -> SourceOptions {
        SourceOptions {
            offline: self.offline,
            synthetic: self.synthetic,
            csv_dir: self.csv_dir.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            scan,
            signal,
            source,
            format,
            output,
        } => {
            scan.apply(&mut config);
            signal.apply(&mut config.signal);
            run_scan_cmd(&config, &source.options(), format, output.as_deref())
        }
        Commands::Watch {
            scan,
            signal,
            source,
            interval,
            iterations,
        } => {
            scan.apply(&mut config);
            signal.apply(&mut config.signal);
            if let Some(secs) = interval {
                config.watch.interval_secs = secs;
            }
            run_watch_cmd(&config, &source.options(), iterations)
        }
        Commands::Evaluate {
            file,
            signal,
            trace,
            json,
        } => {
            signal.apply(&mut config.signal);
            run_evaluate_cmd(&file, &config.signal, trace, json)
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Coins => {
            for coin in KNOWN_COINS {
                println!("{coin}");
            }
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(p) => ScanConfig::from_file(p)?,
        None => ScanConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

fn run_scan_cmd(
    config: &ScanConfig,
    opts: &SourceOptions,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let provider = build_provider(config, opts, Utc::now())?;
    let report = run_scan(config, &provider, Utc::now())?;

    let rendered = match format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => export_json(&report)?,
        OutputFormat::Csv => export_csv(&report)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Report saved to: {}", path.display());
        }
        None => print!("{rendered}"),
    }
    eprintln!("{}", ScanSummary::from_report(&report));
    Ok(())
}

fn run_watch_cmd(config: &ScanConfig, opts: &SourceOptions, iterations: Option<usize>) -> Result<()> {
    if iterations == Some(0) {
        bail!("--iterations must be >= 1");
    }
    let provider = build_provider(config, opts, Utc::now())?;
    let watch_opts = WatchOptions {
        max_iterations: iterations,
        ..WatchOptions::from_config(config)
    };

    let summary = run_watch(config, &provider, watch_opts, None, |report: &ScanReport| {
        println!("Scan at {}", report.started_at.format("%Y-%m-%d %H:%M:%S"));
        print!("{}", render_text(report));
        println!("{}", ScanSummary::from_report(report));
    })?;

    tracing::info!(iterations = summary.iterations, "watch finished");
    Ok(())
}

fn run_evaluate_cmd(file: &Path, params: &SignalParams, trace: bool, json: bool) -> Result<()> {
    let candles =
        load_csv(file).with_context(|| format!("failed to load candles from {}", file.display()))?;

    if trace {
        let rows = indicator_rows(&candles, params)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            print_rows(&rows);
        }
        return Ok(());
    }

    let result = evaluate(&candles, params)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match (result.reference_price, result.timestamp) {
        (Some(price), Some(ts)) => println!(
            "Signal: {} | Price: {price} | Time: {}",
            result.classification,
            ts.format("%Y-%m-%d %H:%M:%S")
        ),
        _ => println!("No signal. ({})", result.classification),
    }
    Ok(())
}

fn print_rows(rows: &[IndicatorRow]) {
    println!(
        "{:<20} {:>14} {:>12} {:>12} {:>14} {:>14} {:>6}",
        "time", "close", "tr", "atr", "stop", "trend", "class"
    );
    for row in rows {
        let stop = row
            .trailing_stop
            .map(|s| format!("{s:.6}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<20} {:>14.6} {:>12.6} {:>12.6} {:>14} {:>14.6} {:>6}",
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.close,
            row.true_range,
            row.average_true_range,
            stop,
            row.trend_reference,
            row.classification.as_str()
        );
    }
}

//! Integration tests for the scan pipeline.
//!
//! These tests assemble providers the way the CLI does (offline, CSV fixture
//! directory, synthetic fallback) and check the reports end to end.

use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;
use std::time::Duration;
use trailsignal_core::data::DataSource;
use trailsignal_core::domain::{Classification, Timeframe};
use trailsignal_core::engine::SignalParams;
use trailsignal_runner::{
    build_provider, export_csv, render_text, run_scan, run_watch, ScanConfig, ScanSummary,
    SourceOptions, WatchOptions,
};

fn core_fixture_dir() -> PathBuf {
    // The fixture lives in trailsignal-core's test directory
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("trailsignal-core/tests/fixtures")
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn fixture_config() -> ScanConfig {
    let mut config = ScanConfig::default();
    config.scan.coins = vec!["BTCUSDT".into()];
    config.scan.timeframes = vec![Timeframe::H1, Timeframe::D1];
    config.signal = SignalParams::new(1.0, 2);
    config
}

#[test]
fn offline_csv_scan_reports_fixture_signal() {
    let config = fixture_config();
    let opts = SourceOptions {
        offline: true,
        synthetic: false,
        csv_dir: Some(core_fixture_dir()),
    };
    let provider = build_provider(&config, &opts, now()).unwrap();
    let report = run_scan(&config, &provider, now()).unwrap();

    assert_eq!(report.entries.len(), 2);
    let hourly = &report.entries[0];
    assert_eq!(hourly.source, Some(DataSource::CsvImport));
    let result = hourly.outcome.result().unwrap();
    assert_eq!(result.classification, Classification::Sell);
    assert_eq!(result.reference_price, Some(95.0));

    // No 1d fixture: the pair degrades to an empty window with the error kept.
    let daily = &report.entries[1];
    assert_eq!(daily.candle_count, 0);
    assert!(daily.fetch_error.as_deref().unwrap().contains("all providers failed"));
    assert_eq!(
        daily.outcome.result().unwrap().classification,
        Classification::Empty
    );

    let text = render_text(&report);
    assert!(text.contains("Timeframe: 1h | Signal: Sell | Price: 95.0 | Time: 2024-01-02 02:00:00"));
    assert!(text.contains("Timeframe: 1d | No signal."));

    let summary = ScanSummary::from_report(&report);
    assert_eq!(summary.sell, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.fetch_failures, 1);
}

#[test]
fn synthetic_fallback_fills_missing_pairs() {
    let config = fixture_config();
    let opts = SourceOptions {
        offline: true,
        synthetic: true,
        csv_dir: Some(core_fixture_dir()),
    };
    let provider = build_provider(&config, &opts, now()).unwrap();
    let report = run_scan(&config, &provider, now()).unwrap();

    assert_eq!(report.entries[0].source, Some(DataSource::CsvImport));
    assert_eq!(report.entries[1].source, Some(DataSource::Synthetic));
    assert_eq!(report.entries[1].candle_count, config.scan.limit);
    assert!(report.entries.iter().all(|e| e.fetch_error.is_none()));

    let csv = export_csv(&report).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn config_file_drives_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.toml");
    std::fs::write(
        &path,
        r#"
[scan]
coins = ["SOLUSDT", "ADAUSDT"]
timeframes = ["5m"]
limit = 30

[signal]
sensitivity = 2.0
window_size = 5
"#,
    )
    .unwrap();

    let config = ScanConfig::from_file(&path).unwrap();
    let opts = SourceOptions {
        offline: true,
        synthetic: true,
        csv_dir: None,
    };
    let provider = build_provider(&config, &opts, now()).unwrap();
    let report = run_scan(&config, &provider, now()).unwrap();

    assert_eq!(report.params.sensitivity, 2.0);
    let symbols: Vec<&str> = report.entries.iter().map(|e| e.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["SOLUSDT", "ADAUSDT"]);
    assert!(report.entries.iter().all(|e| e.candle_count == 30));
}

#[test]
fn watch_reuses_cached_windows() {
    let mut config = fixture_config();
    config.cache.ttl_secs = 3600;
    let opts = SourceOptions {
        offline: true,
        synthetic: true,
        csv_dir: None,
    };
    let provider = build_provider(&config, &opts, now()).unwrap();

    let mut sources = Vec::new();
    let mut hashes = Vec::new();
    let watch_opts = WatchOptions {
        interval: Duration::ZERO,
        max_iterations: Some(2),
    };
    let summary = run_watch(&config, &provider, watch_opts, None, |report| {
        sources.push(report.entries[0].source);
        hashes.push(report.entries[0].window_hash.clone());
    })
    .unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(sources, vec![Some(DataSource::Synthetic), Some(DataSource::Cache)]);
    assert_eq!(hashes[0], hashes[1]);
}

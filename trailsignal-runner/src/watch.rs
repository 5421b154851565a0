//! Periodic re-scanning.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use trailsignal_core::data::CandleProvider;

use crate::config::ScanConfig;
use crate::scanner::{ScanError, ScanReport, Scanner};

/// Granularity of the cancellation check while waiting between scans.
const POLL_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: Duration,
    /// Stop after this many scans; `None` runs until cancelled.
    pub max_iterations: Option<usize>,
}

impl WatchOptions {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            interval: config.watch_interval(),
            max_iterations: None,
        }
    }
}

/// Summary returned when the loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub iterations: usize,
    pub cancelled: bool,
}

/// Run scans every `interval` until the iteration limit or cancellation.
///
/// # Arguments
/// - `on_report`: called with every completed scan.
/// - `cancel`: optional flag checked before each scan and while waiting.
pub fn run_watch<P, F>(
    config: &ScanConfig,
    provider: &P,
    opts: WatchOptions,
    cancel: Option<&AtomicBool>,
    mut on_report: F,
) -> Result<WatchSummary, ScanError>
where
    P: CandleProvider + ?Sized,
    F: FnMut(&ScanReport),
{
    let scanner = Scanner::new(config, provider);
    let is_cancelled = || cancel.is_some_and(|f| f.load(Ordering::Relaxed));
    let mut iterations = 0;

    loop {
        if is_cancelled() {
            tracing::info!(iterations, "watch cancelled");
            return Ok(WatchSummary {
                iterations,
                cancelled: true,
            });
        }

        let report = scanner.run(Utc::now())?;
        iterations += 1;
        on_report(&report);

        if opts.max_iterations.is_some_and(|max| iterations >= max) {
            return Ok(WatchSummary {
                iterations,
                cancelled: false,
            });
        }

        tracing::debug!(interval_secs = opts.interval.as_secs(), "waiting for next scan");
        let deadline = Instant::now() + opts.interval;
        while !is_cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(POLL_SLICE.min(deadline - now));
        }
    }
}

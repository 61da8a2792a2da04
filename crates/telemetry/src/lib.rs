//! Logging and scan metrics for the vCard tools
//!
//! `fs-vcard` installs one stderr subscriber at startup and records per-file
//! counters and parse timings into a process-wide [`MetricsRegistry`]. The
//! registry is dumped as JSON with `-vv`.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

static METRICS: Lazy<MetricsRegistry> = Lazy::new(MetricsRegistry::new);

/// Ties a metrics dump to the log lines of the same run
static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Metric names recorded by `fs-vcard`
pub mod names {
    /// Gauge: files matched by the scanner
    pub const FILES_FOUND: &str = "files_found";
    /// Counter: files read, parsed or not
    pub const FILES_SCANNED: &str = "files_scanned";
    /// Counter: records produced by successful parses
    pub const RECORDS_PARSED: &str = "records_parsed";
    /// Counter: files that failed to read or parse
    pub const PARSE_ERRORS: &str = "parse_errors";
    /// Histogram: milliseconds spent on one file
    pub const SCAN_FILE_MS: &str = "scan_file_ms";
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn init_with_config(config: TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .compact());

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %SESSION_ID.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialized"
    );

    Ok(())
}

/// Subscriber settings, taken from `[logging]` and the `-v`/`--quiet` flags
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub show_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            show_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Pick the log level from CLI flags
    ///
    /// `quiet` wins; each `-v` raises `base_level` one step (warn, info,
    /// debug, trace).
    pub fn with_verbosity(mut self, base_level: &str, verbose: u8, quiet: bool) -> Self {
        const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

        self.log_level = if quiet {
            "error".to_string()
        } else {
            let base = LEVELS
                .iter()
                .position(|l| l.eq_ignore_ascii_case(base_level))
                .unwrap_or(1);
            let idx = (base + verbose as usize).min(LEVELS.len() - 1);
            LEVELS[idx].to_string()
        };
        self.show_target |= verbose >= 2;
        self
    }
}

/// Named counters, gauges and millisecond histograms
///
/// Shared by the rayon workers of `fs-vcard scan`.
pub struct MetricsRegistry {
    counters: RwLock<HashMap<String, AtomicU64>>,
    gauges: RwLock<HashMap<String, u64>>,
    histograms: RwLock<HashMap<String, Vec<f64>>>,
    start_time: Instant,
}

impl MetricsRegistry {
    fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    pub fn increment_by(&self, name: &str, value: u64) {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        drop(counters);
        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current counter value, 0 when never incremented
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Overwrite a gauge
    pub fn gauge(&self, name: &str, value: u64) {
        self.gauges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }

    pub fn histogram(&self, name: &str, value: f64) {
        self.histograms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    /// Summary of one histogram, `None` when nothing was recorded
    pub fn histogram_stats(&self, name: &str) -> Option<HistogramStats> {
        self.histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|values| HistogramStats::from_values(values))
    }

    /// Everything recorded so far, tagged with the session id
    pub fn export_json(&self) -> serde_json::Value {
        let counters: HashMap<String, u64> = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect();
        let gauges = self.gauges.read().unwrap_or_else(PoisonError::into_inner).clone();
        let histograms: HashMap<String, HistogramStats> = self
            .histograms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), HistogramStats::from_values(v)))
            .collect();

        serde_json::json!({
            "session_id": SESSION_ID.as_str(),
            "uptime_secs": self.start_time.elapsed().as_secs(),
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
        })
    }
}

/// Count, range, mean and nearest-rank percentiles of a histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl HistogramStats {
    fn from_values(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let Some((&min, &max)) = sorted.first().zip(sorted.last()) else {
            return Self {
                count: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
                p99: 0.0,
            };
        };

        let count = sorted.len();
        Self {
            count,
            min,
            max,
            mean: sorted.iter().sum::<f64>() / count as f64,
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        }
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// The process-wide registry
pub fn metrics() -> &'static MetricsRegistry {
    &METRICS
}

/// Records elapsed milliseconds into a histogram, once, on `stop` or drop
pub struct Timer {
    name: &'static str,
    start: Instant,
    recorded: bool,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            recorded: false,
        }
    }

    pub fn stop(mut self) -> Duration {
        let duration = self.record();
        tracing::trace!(metric = self.name, duration_ms = duration.as_millis(), "Timer stopped");
        duration
    }

    fn record(&mut self) -> Duration {
        let duration = self.start.elapsed();
        if !self.recorded {
            metrics().histogram(self.name, duration.as_secs_f64() * 1000.0);
            self.recorded = true;
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.record();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let registry = MetricsRegistry::new();
        registry.increment(names::FILES_SCANNED);
        registry.increment(names::FILES_SCANNED);
        registry.increment_by(names::RECORDS_PARSED, 3);

        assert_eq!(registry.counter(names::FILES_SCANNED), 2);
        assert_eq!(registry.counter(names::RECORDS_PARSED), 3);
        assert_eq!(registry.counter(names::PARSE_ERRORS), 0);
    }

    #[test]
    fn test_gauge_keeps_last_value() {
        let registry = MetricsRegistry::new();
        registry.gauge(names::FILES_FOUND, 12);
        registry.gauge(names::FILES_FOUND, 3);

        assert_eq!(registry.export_json()["gauges"][names::FILES_FOUND], 3);
    }

    #[test]
    fn test_histogram_stats() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let stats = HistogramStats::from_values(&values);

        assert_eq!(stats.count, 10);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 10.0);
        assert_eq!(stats.mean, 5.5);
        assert_eq!(stats.p99, 10.0);

        assert_eq!(HistogramStats::from_values(&[]).count, 0);
        assert!(MetricsRegistry::new().histogram_stats("none").is_none());
    }

    #[test]
    fn test_timer_records_once() {
        let timer = Timer::start("test_timer_once");
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.stop();
        assert!(duration.as_millis() >= 10);

        let stats = metrics().histogram_stats("test_timer_once").unwrap();
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn test_verbosity_levels() {
        let config = TelemetryConfig::default();
        assert_eq!(config.clone().with_verbosity("warn", 0, false).log_level, "warn");
        assert_eq!(config.clone().with_verbosity("warn", 1, false).log_level, "info");
        assert_eq!(config.clone().with_verbosity("info", 9, false).log_level, "trace");
        assert_eq!(config.clone().with_verbosity("debug", 2, true).log_level, "error");
        assert!(config.with_verbosity("warn", 2, false).show_target);
    }

    #[test]
    fn test_export_json() {
        let registry = MetricsRegistry::new();
        registry.increment(names::FILES_SCANNED);
        registry.histogram(names::SCAN_FILE_MS, 2.5);

        let json = registry.export_json();
        assert_eq!(json["counters"][names::FILES_SCANNED], 1);
        assert_eq!(json["histograms"][names::SCAN_FILE_MS]["count"], 1);
        assert!(Uuid::parse_str(json["session_id"].as_str().unwrap()).is_ok());
    }
}

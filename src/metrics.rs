//! Internal observability metrics for pihole-stats
//!
//! Counters and gauges describing the poller's own operation.
//!
//! # Metrics
//!
//! - `pihole_stats_refresh_success_total` - Counter of published snapshots
//! - `pihole_stats_refresh_failure_total{kind="..."}` - Counter of failed cycles per failure kind
//! - `pihole_stats_logins_total` - Counter of login calls that produced a session
//! - `pihole_stats_refresh_duration_seconds` - Duration of the last cycle
//! - `pihole_stats_last_success_timestamp_seconds` - Unix time of the last published snapshot

use once_cell::sync::Lazy;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::FailureKind;

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe gauge using atomic operations
#[derive(Debug, Default)]
pub struct Gauge {
    /// Stored as bits of f64 for atomic operations
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn set(&self, v: f64) {
        self.value.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.value.load(Ordering::Relaxed))
    }

    /// Set the gauge to the current Unix timestamp
    pub fn set_to_current_time(&self) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        self.set(timestamp);
    }
}

/// Refresh cycle metrics registry
#[derive(Debug, Default)]
pub struct RefreshMetrics {
    pub success_total: Counter,
    pub auth_failure_total: Counter,
    pub connectivity_failure_total: Counter,
    pub data_failure_total: Counter,
    pub logins_total: Counter,
    pub last_duration_seconds: Gauge,
    pub last_success_timestamp: Gauge,
}

impl RefreshMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published snapshot
    pub fn record_success(&self, duration_seconds: f64) {
        self.success_total.inc();
        self.last_duration_seconds.set(duration_seconds);
        self.last_success_timestamp.set_to_current_time();
    }

    /// Record a failed cycle
    pub fn record_failure(&self, kind: FailureKind, duration_seconds: f64) {
        self.failure_counter(kind).inc();
        self.last_duration_seconds.set(duration_seconds);
    }

    /// Record a login that produced a session
    pub fn record_login(&self) {
        self.logins_total.inc();
    }

    pub fn failures(&self, kind: FailureKind) -> u64 {
        self.failure_counter(kind).get()
    }

    fn failure_counter(&self, kind: FailureKind) -> &Counter {
        match kind {
            FailureKind::Authentication => &self.auth_failure_total,
            FailureKind::Connectivity => &self.connectivity_failure_total,
            FailureKind::Data => &self.data_failure_total,
        }
    }

    /// Render in Prometheus text exposition format
    pub fn format_prometheus(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "# HELP pihole_stats_refresh_success_total Published snapshots\n\
             # TYPE pihole_stats_refresh_success_total counter\n\
             pihole_stats_refresh_success_total {}",
            self.success_total.get()
        );

        let _ = writeln!(
            out,
            "# HELP pihole_stats_refresh_failure_total Failed refresh cycles\n\
             # TYPE pihole_stats_refresh_failure_total counter"
        );
        for kind in [
            FailureKind::Authentication,
            FailureKind::Connectivity,
            FailureKind::Data,
        ] {
            let _ = writeln!(
                out,
                "pihole_stats_refresh_failure_total{{kind=\"{}\"}} {}",
                kind,
                self.failures(kind)
            );
        }

        let _ = writeln!(
            out,
            "# HELP pihole_stats_logins_total Logins that produced a session\n\
             # TYPE pihole_stats_logins_total counter\n\
             pihole_stats_logins_total {}",
            self.logins_total.get()
        );

        let _ = writeln!(
            out,
            "# HELP pihole_stats_refresh_duration_seconds Duration of the last refresh cycle\n\
             # TYPE pihole_stats_refresh_duration_seconds gauge\n\
             pihole_stats_refresh_duration_seconds {}",
            self.last_duration_seconds.get()
        );

        let _ = writeln!(
            out,
            "# HELP pihole_stats_last_success_timestamp_seconds Unix time of the last published snapshot\n\
             # TYPE pihole_stats_last_success_timestamp_seconds gauge\n\
             pihole_stats_last_success_timestamp_seconds {}",
            self.last_success_timestamp.get()
        );

        out
    }
}

static REFRESH_METRICS: Lazy<RefreshMetrics> = Lazy::new(RefreshMetrics::new);

/// Process-wide refresh metrics
pub fn refresh_metrics() -> &'static RefreshMetrics {
    &REFRESH_METRICS
}

//! Conversion metrics.
//!
//! Counters are atomics; recent durations live in a bounded sample window
//! behind a mutex for percentile estimates.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum number of duration samples to keep in memory.
const MAX_DURATION_SAMPLES: usize = 512;

/// Conversion metrics collector.
#[derive(Debug)]
pub struct ConversionMetrics {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cache_hits: AtomicU64,
    duration_samples: Mutex<VecDeque<Duration>>,
}

impl ConversionMetrics {
    /// Create a new empty metrics collector.
    pub fn new() -> Self {
        Self {
            started: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            duration_samples: Mutex::new(VecDeque::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    /// Record a conversion start.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reused cached output.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful toolchain run.
    pub fn record_success(&self, duration: Duration) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.pop_front();
            }
            samples.push_back(duration);
        }
    }

    /// Record a failed conversion.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed-out step. Also counts as a failure.
    pub fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current snapshot of metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut sorted: Vec<Duration> = self
            .duration_samples
            .lock()
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        sorted.sort();

        let percentile = |pct: usize| -> Option<u64> {
            if sorted.is_empty() {
                return None;
            }
            let idx = ((sorted.len() - 1) * pct) / 100;
            sorted.get(idx).map(|d| d.as_millis() as u64)
        };

        MetricsSnapshot {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            duration_p50_ms: percentile(50),
            duration_p95_ms: percentile(95),
            sample_count: sorted.len() as u64,
        }
    }
}

impl Default for ConversionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of conversion metrics.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Conversions started.
    pub started: u64,
    /// Toolchain runs that produced a board.
    pub succeeded: u64,
    /// Conversions that failed, including timeouts.
    pub failed: u64,
    /// Steps that exceeded their time limit.
    pub timed_out: u64,
    /// Conversions answered from a cached output.
    pub cache_hits: u64,
    /// Median toolchain run duration.
    pub duration_p50_ms: Option<u64>,
    /// 95th percentile toolchain run duration.
    pub duration_p95_ms: Option<u64>,
    /// Number of duration samples collected.
    pub sample_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let m = ConversionMetrics::new();
        m.record_started();
        m.record_started();
        m.record_cache_hit();
        m.record_success(Duration::from_secs(2));
        m.record_timeout();

        let snap = m.snapshot();
        assert_eq!(snap.started, 2);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.timed_out, 1);
        assert_eq!(snap.cache_hits, 1);
    }

    #[test]
    fn test_percentiles() {
        let m = ConversionMetrics::new();
        for i in 1..=100 {
            m.record_success(Duration::from_millis(i * 10));
        }
        let snap = m.snapshot();
        let p50 = snap.duration_p50_ms.expect("p50");
        let p95 = snap.duration_p95_ms.expect("p95");
        assert!(p95 > p50);
        assert_eq!(snap.sample_count, 100);
    }

    #[test]
    fn test_window_is_bounded() {
        let m = ConversionMetrics::new();
        for _ in 0..(MAX_DURATION_SAMPLES + 10) {
            m.record_success(Duration::from_millis(1));
        }
        assert_eq!(m.snapshot().sample_count, MAX_DURATION_SAMPLES as u64);
    }

    #[test]
    fn test_empty_percentiles() {
        let snap = ConversionMetrics::new().snapshot();
        assert!(snap.duration_p50_ms.is_none());
        assert!(snap.duration_p95_ms.is_none());
    }
}

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A percentile tracker over a sliding window of measurements
#[derive(Debug, Clone)]
pub struct PercentileTracker {
    measurements: Arc<Mutex<VecDeque<u64>>>,
    window_size: usize,
}

impl PercentileTracker {
    /// Create a new percentile tracker with a specified window size
    pub fn new(window_size: usize) -> Self {
        Self {
            measurements: Arc::new(Mutex::new(VecDeque::with_capacity(window_size))),
            window_size,
        }
    }

    /// Record a measurement (in nanoseconds)
    pub fn record(&self, nanos: u64) {
        let mut measurements = self.measurements.lock();
        if measurements.len() >= self.window_size {
            measurements.pop_front();
        }
        measurements.push_back(nanos);
    }

    /// Compute a percentile (0.0..=1.0) over the current window, in microseconds
    pub fn percentile_us(&self, p: f64) -> f64 {
        let measurements = self.measurements.lock();
        if measurements.is_empty() {
            return 0.0;
        }

        let mut sorted: Vec<_> = measurements.iter().copied().collect();
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * p).ceil() as usize).saturating_sub(1);
        sorted[idx] as f64 / 1000.0
    }

    /// Get the count of recorded measurements
    pub fn count(&self) -> usize {
        self.measurements.lock().len()
    }
}

/// Per-stage metrics collector.
///
/// Stages are lossless, so instead of the usual processed/dropped pair this
/// tracks inputs consumed and outputs emitted; the two differ for batching
/// and aggregating stages.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    /// Number of input items consumed
    items_processed: Arc<AtomicU64>,
    /// Number of output items emitted downstream
    items_emitted: Arc<AtomicU64>,
    /// Per-item processing latency window
    latency_tracker: PercentileTracker,
    /// Creation time for throughput calculation
    start_time: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            items_processed: Arc::new(AtomicU64::new(0)),
            items_emitted: Arc::new(AtomicU64::new(0)),
            latency_tracker: PercentileTracker::new(1000),
            start_time: Instant::now(),
        }
    }

    /// Record a consumed input item
    pub fn record_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an emitted output item
    pub fn record_emitted(&self) {
        self.items_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a latency measurement in nanoseconds
    pub fn record_latency(&self, nanos: u64) {
        self.latency_tracker.record(nanos);
    }

    /// Get the total number of input items consumed
    pub fn total_processed(&self) -> u64 {
        self.items_processed.load(Ordering::Relaxed)
    }

    /// Get the total number of output items emitted
    pub fn total_emitted(&self) -> u64 {
        self.items_emitted.load(Ordering::Relaxed)
    }

    /// Calculate current throughput in items per second
    pub fn throughput_ips(&self) -> f64 {
        let elapsed = self.start_time.elapsed();
        if elapsed.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.total_processed() as f64 / elapsed.as_secs_f64()
        }
    }

    /// Get P50 latency in microseconds
    pub fn latency_p50_us(&self) -> f64 {
        self.latency_tracker.percentile_us(0.50)
    }

    /// Get P99 latency in microseconds
    pub fn latency_p99_us(&self) -> f64 {
        self.latency_tracker.percentile_us(0.99)
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_processed: self.total_processed(),
            total_emitted: self.total_emitted(),
            throughput_ips: self.throughput_ips(),
            latency_p50_us: self.latency_p50_us(),
            latency_p99_us: self.latency_p99_us(),
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of stage metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub total_processed: u64,
    pub total_emitted: u64,
    pub throughput_ips: f64,
    pub latency_p50_us: f64,
    pub latency_p99_us: f64,
    pub elapsed: Duration,
}

impl MetricsSnapshot {
    /// Format metrics as a human-readable string
    pub fn format(&self) -> String {
        format!(
            "In: {}, Out: {}, Throughput: {:.2} items/s, \
             Latency P50: {:.2}µs, P99: {:.2}µs, Elapsed: {:.2}s",
            self.total_processed,
            self.total_emitted,
            self.throughput_ips,
            self.latency_p50_us,
            self.latency_p99_us,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_tracker() {
        let tracker = PercentileTracker::new(10);
        for i in 1..=10 {
            tracker.record(i * 1000); // 1us to 10us in nanos
        }
        assert!(tracker.percentile_us(0.50) > 0.0);
        assert!(tracker.percentile_us(0.99) >= tracker.percentile_us(0.50));
    }

    #[test]
    fn test_window_slides() {
        let tracker = PercentileTracker::new(5);
        for i in 0..20 {
            tracker.record(i);
        }
        assert_eq!(tracker.count(), 5);
    }

    #[test]
    fn test_stage_metrics() {
        let metrics = StageMetrics::new();
        for _ in 0..100 {
            metrics.record_processed();
            metrics.record_latency(1000);
        }
        metrics.record_emitted();
        assert_eq!(metrics.total_processed(), 100);
        assert_eq!(metrics.total_emitted(), 1);
        assert!(metrics.throughput_ips() > 0.0);
    }
}

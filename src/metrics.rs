// Scan metrics
//
// Lightweight counters for the scan loop. Errors and empty reads are silent on
// the output topic, so these counters are the only place they show up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for the scan loop
///
/// Uses atomic operations so a clone of the `Arc` can be read from other tasks
/// (e.g. the shutdown path) while the loop is running.
#[derive(Debug)]
pub struct ScanMetrics {
    /// Completed ticks
    pub ticks: AtomicU64,

    /// Reads that returned at least one tag
    pub reads_with_tags: AtomicU64,

    /// Reads that returned no tags
    pub empty_reads: AtomicU64,

    /// Reads that failed with a driver fault
    pub read_failures: AtomicU64,

    /// Per-antenna read plan switches that failed
    pub read_plan_failures: AtomicU64,

    /// Messages handed to the publish sink
    pub messages_published: AtomicU64,

    /// EPCs carried by published messages
    pub epcs_published: AtomicU64,

    /// Reads that filled all `max_tags` slots
    pub saturated_reads: AtomicU64,

    start_time: Instant,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            reads_with_tags: AtomicU64::new(0),
            empty_reads: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            read_plan_failures: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            epcs_published: AtomicU64::new(0),
            saturated_reads: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count a completed tick and return the new total
    pub fn record_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_empty_read(&self) {
        self.empty_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_plan_failure(&self) {
        self.read_plan_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_saturated_read(&self) {
        self.saturated_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a non-empty read and its published message
    pub fn record_published(&self, tag_count: usize) {
        self.reads_with_tags.fetch_add(1, Ordering::Relaxed);
        self.messages_published.fetch_add(1, Ordering::Relaxed);
        self.epcs_published
            .fetch_add(tag_count as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Share of reads that failed, over all attempted reads
    pub fn read_failure_rate(&self) -> f64 {
        let failed = self.read_failures.load(Ordering::Relaxed);
        let total = failed
            + self.reads_with_tags.load(Ordering::Relaxed)
            + self.empty_reads.load(Ordering::Relaxed);
        if total > 0 {
            failed as f64 / total as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Scan Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Ticks: {}, reads: {} with tags, {} empty, {} failed ({:.1}% failure rate)",
            self.ticks.load(Ordering::Relaxed),
            self.reads_with_tags.load(Ordering::Relaxed),
            self.empty_reads.load(Ordering::Relaxed),
            self.read_failures.load(Ordering::Relaxed),
            self.read_failure_rate() * 100.0
        );
        tracing::info!(
            "Read plan failures: {}, saturated reads: {}",
            self.read_plan_failures.load(Ordering::Relaxed),
            self.saturated_reads.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Published: {} messages, {} EPCs",
            self.messages_published.load(Ordering::Relaxed),
            self.epcs_published.load(Ordering::Relaxed)
        );
    }

    pub fn log_periodic(&self) {
        tracing::info!(
            "Metrics: {} ticks, {} messages, {} read failures, {} plan failures, uptime {:.0}s",
            self.ticks.load(Ordering::Relaxed),
            self.messages_published.load(Ordering::Relaxed),
            self.read_failures.load(Ordering::Relaxed),
            self.read_plan_failures.load(Ordering::Relaxed),
            self.uptime().as_secs_f64()
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

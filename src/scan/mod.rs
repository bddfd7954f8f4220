//! Scan loop - Timer-driven cycle over the configured antennas.
//!
//! Each tick walks the antennas in configured order:
//!
//! ```text
//! for antenna in antennas:
//!     select_antenna(antenna)   ── error ──► skip antenna
//!     read_epcs(...)            ── error ──► skip antenna
//!     0 tags                    ──────────► nothing
//!     k tags                    ──────────► publish "ant=<id> count=<k> <epc>..."
//! ```
//!
//! Per-antenna failures are absorbed here: they are counted in [`ScanMetrics`] and
//! logged at debug level, but never retried within the tick and never propagated.
//! The only state is **Running**; the loop leaves it when the shutdown channel fires.

use crate::metrics::ScanMetrics;
use crate::models::{AntennaId, ReaderConfig, ScanResult};
use crate::publish::PublishSink;
use crate::reader::{ReaderDriver, ReaderSession};
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// What happened on each antenna during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Antennas whose scan produced a published message
    pub published: Vec<AntennaId>,
    /// Antennas read successfully with zero tags
    pub empty: Vec<AntennaId>,
    /// Antennas skipped because the read plan or the read failed
    pub failed: Vec<AntennaId>,
}

/// Periodic scanner owning the reader session and the publish sink
pub struct ScanLoop<D: ReaderDriver, S: PublishSink> {
    session: ReaderSession<D>,
    sink: S,
    config: ReaderConfig,

    /// Tag buffer pre-sized to `max_tags`, cleared before every read
    epcs: Vec<String>,

    metrics: Arc<ScanMetrics>,
}

impl<D: ReaderDriver, S: PublishSink> ScanLoop<D, S> {
    pub fn new(session: ReaderSession<D>, sink: S, config: ReaderConfig) -> Self {
        let epcs = Vec::with_capacity(config.max_tags);
        Self {
            session,
            sink,
            config,
            epcs,
            metrics: Arc::new(ScanMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<ScanMetrics> {
        &self.metrics
    }

    pub fn session(&self) -> &ReaderSession<D> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ReaderSession<D> {
        &mut self.session
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Scan every configured antenna once.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        for index in 0..self.config.antennas.len() {
            let antenna = self.config.antennas[index];
            self.scan_antenna(antenna, &mut report);
        }

        let ticks = self.metrics.record_tick();
        if self.config.metrics_every_ticks > 0 && ticks % self.config.metrics_every_ticks == 0 {
            self.metrics.log_periodic();
        }

        report
    }

    fn scan_antenna(&mut self, antenna: AntennaId, report: &mut TickReport) {
        if let Err(e) = self.session.select_antenna(antenna) {
            tracing::debug!(error = &e as &dyn Error, "Antenna {} skipped", antenna);
            self.metrics.record_read_plan_failure();
            report.failed.push(antenna);
            return;
        }

        let read = self.session.read_epcs(
            &mut self.epcs,
            self.config.max_tags,
            self.config.epc_buf_size,
            self.config.timeout(),
        );

        if let Err(e) = read {
            tracing::debug!(error = &e as &dyn Error, "Antenna {} read failed", antenna);
            self.metrics.record_read_failure();
            report.failed.push(antenna);
            return;
        }

        let result = ScanResult::new(antenna, &self.epcs);
        let Some(message) = result.to_message() else {
            tracing::trace!("Antenna {}: no tags", antenna);
            self.metrics.record_empty_read();
            report.empty.push(antenna);
            return;
        };

        // Saturation is not signalled on the wire
        if result.is_saturated(self.config.max_tags) {
            tracing::debug!(
                "Antenna {} filled all {} tag slots; more tags may be present",
                antenna,
                self.config.max_tags
            );
            self.metrics.record_saturated_read();
        }

        let tag_count = result.tag_count();
        self.sink.publish(message);
        self.metrics.record_published(tag_count);
        report.published.push(antenna);
    }

    /// Tick every `loop_sleep_ms` until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// Ticks never overlap: if one overruns the period the missed ticks are
    /// skipped. The tick body blocks on the driver, so it runs under
    /// `block_in_place` and needs the multi-thread runtime.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.loop_period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Scan loop running: period={}ms, timeout={}ms, antennas={:?}",
            self.config.loop_sleep_ms,
            self.config.timeout_ms,
            self.config.antennas
        );

        if *shutdown.borrow() {
            tracing::info!("Shutdown requested before first tick");
            return;
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    tokio::task::block_in_place(|| {
                        self.tick();
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            "Scan loop stopped after {} ticks",
            self.metrics.ticks.load(Ordering::Relaxed)
        );
    }

    /// Stop scanning and close the reader session.
    pub fn shutdown(mut self) -> Arc<ScanMetrics> {
        self.session.close();
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutboundMessage;
    use crate::reader::SimulatedDriver;

    #[derive(Default)]
    struct Collected(Vec<String>);

    impl PublishSink for Collected {
        fn publish(&mut self, message: OutboundMessage) {
            self.0.push(message.text);
        }
    }

    fn scan_loop(
        driver: SimulatedDriver,
        antennas: Vec<AntennaId>,
    ) -> ScanLoop<SimulatedDriver, Collected> {
        let config = ReaderConfig {
            uri: "sim://test".to_string(),
            antennas,
            ..ReaderConfig::default()
        };
        let session = ReaderSession::open(driver, &config).unwrap();
        ScanLoop::new(session, Collected::default(), config)
    }

    #[test]
    fn test_tick_publishes_non_empty_antennas() {
        let driver = SimulatedDriver::new().with_tags(1, ["E1", "E2"]);
        let mut scan = scan_loop(driver, vec![1, 2]);

        let report = scan.tick();

        assert_eq!(report.published, vec![1]);
        assert_eq!(report.empty, vec![2]);
        assert!(report.failed.is_empty());
        assert_eq!(scan.sink().0, vec!["ant=1 count=2 E1 E2".to_string()]);
    }

    #[test]
    fn test_antennas_scanned_in_configured_order() {
        let driver = SimulatedDriver::new()
            .with_tags(1, ["A"])
            .with_tags(2, ["B"])
            .with_tags(3, ["C"]);
        let mut scan = scan_loop(driver, vec![3, 1, 2]);

        scan.tick();

        assert_eq!(
            scan.sink().0,
            vec![
                "ant=3 count=1 C".to_string(),
                "ant=1 count=1 A".to_string(),
                "ant=2 count=1 B".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_antenna_does_not_stop_tick() {
        let driver = SimulatedDriver::new().with_faulty(1).with_tags(2, ["E3"]);
        let mut scan = scan_loop(driver, vec![1, 2]);

        let report = scan.tick();

        assert_eq!(report.failed, vec![1]);
        assert_eq!(report.published, vec![2]);
        assert_eq!(scan.sink().0, vec!["ant=2 count=1 E3".to_string()]);
        assert_eq!(scan.metrics().read_failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_buffer_reused_across_ticks() {
        let driver = SimulatedDriver::new().with_tags(1, ["E1"]);
        let mut scan = scan_loop(driver, vec![1]);
        let capacity = scan.epcs.capacity();

        scan.tick();
        scan.session_mut().driver_mut().set_tags(1, Vec::<String>::new());
        let report = scan.tick();

        assert_eq!(report.empty, vec![1]);
        assert_eq!(scan.sink().0.len(), 1);
        assert_eq!(scan.epcs.capacity(), capacity);
        assert_eq!(scan.metrics().ticks.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_shutdown_closes_session() {
        let scan = scan_loop(SimulatedDriver::new(), vec![1]);
        let metrics = scan.shutdown();
        assert_eq!(metrics.ticks.load(Ordering::Relaxed), 0);
    }
}

// Reader session - owns one live reader connection
//
// The session is either fully connected-and-configured or closed. Opening
// unwinds whatever earlier steps acquired when a later step fails, and closing
// runs disconnect + destroy exactly once no matter how often it is called.

use super::driver::{DriverError, ReadPlan, ReaderDriver};
use crate::models::{AntennaId, ReaderConfig};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Configuration step that failed while talking to the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStep {
    Region,
    ReadPlan,
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigStep::Region => f.write_str("region"),
            ConfigStep::ReadPlan => f.write_str("read plan"),
        }
    }
}

/// Errors surfaced by [`ReaderSession`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Failed to allocate reader")]
    Allocation(#[source] DriverError),

    #[error("Failed to connect to {uri}")]
    Connect { uri: String, source: DriverError },

    #[error("Failed to set {step}")]
    Config { step: ConfigStep, source: DriverError },

    #[error("Tag read failed")]
    Read(#[source] DriverError),

    #[error("Reader session is closed")]
    Closed,
}

impl ReaderError {
    /// Whether the error happened while bringing the reader up.
    pub fn is_startup_error(&self) -> bool {
        matches!(
            self,
            ReaderError::Allocation(_) | ReaderError::Connect { .. } | ReaderError::Config { .. }
        )
    }
}

/// Exclusive connection to one reader
///
/// Created once at startup by [`open`](Self::open) and owned by the scan loop.
/// Dropping the session closes it.
pub struct ReaderSession<D: ReaderDriver> {
    driver: D,
    uri: String,
    is_open: bool,
    /// Reused for per-antenna plans so switching antennas doesn't allocate
    plan: ReadPlan,
}

impl<D: ReaderDriver> ReaderSession<D> {
    /// Bring the reader up: create → connect → region → read plan (all antennas).
    ///
    /// On failure, only the resources acquired by earlier steps are released
    /// before the error is returned; no half-configured session escapes.
    pub fn open(mut driver: D, config: &ReaderConfig) -> Result<Self, ReaderError> {
        driver.create().map_err(ReaderError::Allocation)?;

        if let Err(source) = driver.connect(&config.uri) {
            driver.destroy();
            return Err(ReaderError::Connect {
                uri: config.uri.clone(),
                source,
            });
        }

        if let Err(source) = driver.set_region(config.region) {
            driver.disconnect();
            driver.destroy();
            return Err(ReaderError::Config {
                step: ConfigStep::Region,
                source,
            });
        }

        let plan = ReadPlan::new(config.antennas.clone(), config.session);
        if let Err(source) = driver.set_read_plan(&plan) {
            driver.disconnect();
            driver.destroy();
            return Err(ReaderError::Config {
                step: ConfigStep::ReadPlan,
                source,
            });
        }

        tracing::info!(
            "Reader session opened: uri={}, region={}, antennas={:?}",
            config.uri,
            config.region,
            config.antennas
        );

        Ok(Self {
            driver,
            uri: config.uri.clone(),
            is_open: true,
            plan,
        })
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Restrict subsequent reads to `antennas`.
    pub fn set_read_plan(&mut self, antennas: &[AntennaId]) -> Result<(), ReaderError> {
        if !self.is_open {
            return Err(ReaderError::Closed);
        }

        self.plan.antennas.clear();
        self.plan.antennas.extend_from_slice(antennas);

        self.driver
            .set_read_plan(&self.plan)
            .map_err(|source| ReaderError::Config {
                step: ConfigStep::ReadPlan,
                source,
            })
    }

    /// Restrict subsequent reads to a single antenna.
    pub fn select_antenna(&mut self, antenna: AntennaId) -> Result<(), ReaderError> {
        self.set_read_plan(&[antenna])
    }

    /// Read tags into `out` (cleared first) and return how many were read.
    ///
    /// Zero tags is a normal outcome, including when the driver reports
    /// [`DriverError::NoTags`]. At most `max_tags` EPCs are kept, each cut to
    /// `epc_buf_size - 1` bytes.
    pub fn read_epcs(
        &mut self,
        out: &mut Vec<String>,
        max_tags: usize,
        epc_buf_size: usize,
        timeout: Duration,
    ) -> Result<usize, ReaderError> {
        out.clear();

        if !self.is_open {
            return Err(ReaderError::Closed);
        }

        match self.driver.read_epcs(out, max_tags, epc_buf_size, timeout) {
            Ok(()) => {}
            Err(DriverError::NoTags) => {
                out.clear();
                return Ok(0);
            }
            Err(e) => {
                out.clear();
                return Err(ReaderError::Read(e));
            }
        }

        out.truncate(max_tags);
        let limit = epc_buf_size.saturating_sub(1);
        for epc in out.iter_mut() {
            truncate_at_boundary(epc, limit);
        }

        Ok(out.len())
    }

    /// Disconnect and release the reader. Later calls do nothing.
    pub fn close(&mut self) {
        if !self.is_open {
            return;
        }

        self.is_open = false;
        self.driver.disconnect();
        self.driver.destroy();

        tracing::info!("Reader session closed: uri={}", self.uri);
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: ReaderDriver> Drop for ReaderSession<D> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<D: ReaderDriver> fmt::Debug for ReaderSession<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSession")
            .field("uri", &self.uri)
            .field("is_open", &self.is_open)
            .field("plan", &self.plan)
            .finish()
    }
}

fn truncate_at_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}

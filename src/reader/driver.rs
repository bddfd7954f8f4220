use crate::models::{AntennaId, Region};
use std::time::Duration;
use thiserror::Error;

/// Antennas (and Gen2 session) the reader uses for subsequent reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub antennas: Vec<AntennaId>,
    /// `None` maps to the driver's default session (`-1` on the wire)
    pub session: Option<u8>,
}

impl ReadPlan {
    pub fn new(antennas: Vec<AntennaId>, session: Option<u8>) -> Self {
        Self { antennas, session }
    }

    /// Session value as the vendor API expects it.
    pub fn raw_session(&self) -> i32 {
        self.session.map_or(-1, i32::from)
    }
}

/// Errors reported by a reader driver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Handle allocation failed: {0}")]
    Allocation(String),

    #[error("No reader driver for URI scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Reader not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Reader rejected request: {0}")]
    Rejected(String),

    /// The read completed but no tag answered. Not a fault.
    #[error("No tags in field")]
    NoTags,
}

/// Capability interface over a physical (or simulated) reader
///
/// Calls follow the lifecycle `create → connect → set_region → set_read_plan
/// → read_epcs* → disconnect → destroy`. Ordering and exactly-once teardown
/// are enforced by [`ReaderSession`](super::ReaderSession), not by drivers.
pub trait ReaderDriver: Send {
    /// Allocate the driver-side handle.
    fn create(&mut self) -> Result<(), DriverError>;

    fn connect(&mut self, uri: &str) -> Result<(), DriverError>;

    fn set_region(&mut self, region: Region) -> Result<(), DriverError>;

    fn set_read_plan(&mut self, plan: &ReadPlan) -> Result<(), DriverError>;

    /// Block for up to `timeout` and append the EPCs read to `out`.
    ///
    /// Drivers should stop at `max_tags` entries of at most `epc_buf_size - 1`
    /// bytes each; the session trims anything beyond that.
    fn read_epcs(
        &mut self,
        out: &mut Vec<String>,
        max_tags: usize,
        epc_buf_size: usize,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    fn disconnect(&mut self);

    /// Release the handle allocated by [`create`](Self::create).
    fn destroy(&mut self);
}

impl<D: ReaderDriver + ?Sized> ReaderDriver for Box<D> {
    fn create(&mut self) -> Result<(), DriverError> {
        (**self).create()
    }

    fn connect(&mut self, uri: &str) -> Result<(), DriverError> {
        (**self).connect(uri)
    }

    fn set_region(&mut self, region: Region) -> Result<(), DriverError> {
        (**self).set_region(region)
    }

    fn set_read_plan(&mut self, plan: &ReadPlan) -> Result<(), DriverError> {
        (**self).set_read_plan(plan)
    }

    fn read_epcs(
        &mut self,
        out: &mut Vec<String>,
        max_tags: usize,
        epc_buf_size: usize,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        (**self).read_epcs(out, max_tags, epc_buf_size, timeout)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn destroy(&mut self) {
        (**self).destroy()
    }
}

/// Scheme part of a reader URI (`tmr:///dev/ttyUSB0` → `tmr`).
pub fn uri_scheme(uri: &str) -> Option<&str> {
    uri.split_once("://")
        .map(|(scheme, _)| scheme)
        .filter(|scheme| !scheme.is_empty())
}

//! Reader module - Lifecycle of the single RFID reader connection.
//!
//! # Components
//!
//! - [`ReaderDriver`]: Capability trait over the hardware driver
//!   (`create`, `connect`, `set_region`, `set_read_plan`, `read_epcs`, `disconnect`, `destroy`).
//!   The air protocol and transport live behind it.
//! - [`ReaderSession`]: Owns one driver handle. Opening runs the startup protocol and unwinds
//!   partially acquired resources on failure; closing is idempotent.
//! - [`SimulatedDriver`]: In-memory reader for `sim://` URIs, used for bench runs and tests.
//!
//! # Startup protocol
//!
//! ```text
//! create ──► connect ──► set_region ──► set_read_plan(all antennas) ──► open
//!   │          │             │                    │
//!   ▼          ▼             ▼                    ▼
//! Allocation  destroy     disconnect+destroy   disconnect+destroy
//! ```
//!
//! Any failure is fatal for the node: [`ReaderError::is_startup_error`] is true and the
//! process exits without entering the scan loop.

pub mod driver;
pub mod session;
pub mod simulated;

pub use driver::{DriverError, ReadPlan, ReaderDriver, uri_scheme};
pub use session::{ConfigStep, ReaderError, ReaderSession};
pub use simulated::SimulatedDriver;

use crate::models::SimulationConfig;

/// Pick the driver for a reader URI.
///
/// Only `sim://` is built in; vendor transports (e.g. `tmr://`) must be
/// provided by a [`ReaderDriver`] implementation outside this crate.
pub fn driver_for_uri(
    uri: &str,
    simulation: &SimulationConfig,
) -> Result<Box<dyn ReaderDriver>, ReaderError> {
    match uri_scheme(uri) {
        Some("sim") => Ok(Box::new(SimulatedDriver::from_config(simulation))),
        Some(scheme) => Err(ReaderError::Allocation(DriverError::UnsupportedScheme(
            scheme.to_string(),
        ))),
        None => Err(ReaderError::Allocation(DriverError::UnsupportedScheme(
            uri.to_string(),
        ))),
    }
}

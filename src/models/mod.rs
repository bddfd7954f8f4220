//! Data models for the RFID scan node.
//!
//! - [`NodeConfig`]: Everything loaded from `rfid_node.yaml`, split into reader, publisher,
//!   logging and simulation sections
//! - [`ReaderConfig`]: Connection string, timeouts, tag capacity and the ordered antenna list
//! - [`Region`]: Regulatory RF region applied once at startup
//! - [`ScanResult`]: Tags read on a single antenna during one tick (borrowed from the scan buffer)
//! - [`OutboundMessage`]: The published `ant=<id> count=<n> <epc>...` line
//!
//! Only the configuration types outlive a tick; scan results and messages are built,
//! published and dropped within the same antenna pass.

pub mod config;
pub mod scan;

pub use config::{
    AntennaId, ConfigError, LoggingConfig, MAX_EPC_BUF_SIZE, MAX_TAGS_LIMIT, NodeConfig,
    PublisherConfig, ReaderConfig, Region, SimulatedAntenna, SimulationConfig,
};
pub use scan::{OutboundMessage, ScanResult};

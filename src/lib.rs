// rfid-tmreader - Multi-antenna RFID reader scan node
//
// This is the library crate containing the scan loop, the reader session and
// the publish side. The binary crate (main.rs) wires them to config, logging
// and the tokio runtime.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod publish;
pub mod reader;
pub mod scan;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::ScanMetrics;
pub use models::{NodeConfig, OutboundMessage, ReaderConfig, Region, ScanResult};
pub use publish::{BroadcastPublisher, PublishSink};
pub use reader::{DriverError, ReaderDriver, ReaderError, ReaderSession, SimulatedDriver};
pub use scan::{ScanLoop, TickReport};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

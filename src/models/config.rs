use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Physical antenna port number on the reader (1-based).
pub type AntennaId = u8;

/// Upper bound for `max_tags`; the scan buffer is pre-allocated to this size
pub const MAX_TAGS_LIMIT: usize = 4096;

/// Upper bound for `epc_buf_size`; EPC-496 needs 125 bytes as hex text
pub const MAX_EPC_BUF_SIZE: usize = 1024;

/// Complete node configuration loaded from `rfid_node.yaml`
///
/// Every section falls back to its defaults when absent, so an empty file
/// (or no file at all) yields a runnable configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub reader: ReaderConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl NodeConfig {
    /// Validate all sections that carry invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reader.validate()?;
        self.publisher.validate()
    }
}

/// Reader connection and scan parameters.
///
/// Immutable once the node has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Connection string, e.g. `tmr:///dev/ttyUSB0` or `sim://bench`
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Per-read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Scan period in milliseconds
    #[serde(default = "default_loop_sleep_ms")]
    pub loop_sleep_ms: u64,

    /// Maximum number of EPCs collected per read
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    /// Per-EPC buffer size in bytes, terminator included
    #[serde(default = "default_epc_buf_size")]
    pub epc_buf_size: usize,

    /// Antennas scanned each tick, in this order
    #[serde(default = "default_antennas")]
    pub antennas: Vec<AntennaId>,

    #[serde(default)]
    pub region: Region,

    /// Gen2 session for read plans; `None` leaves the driver default
    #[serde(default)]
    pub session: Option<u8>,

    /// Log a metrics line every N ticks (0 disables)
    #[serde(default = "default_metrics_every_ticks")]
    pub metrics_every_ticks: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            timeout_ms: default_timeout_ms(),
            loop_sleep_ms: default_loop_sleep_ms(),
            max_tags: default_max_tags(),
            epc_buf_size: default_epc_buf_size(),
            antennas: default_antennas(),
            region: Region::default(),
            session: None,
            metrics_every_ticks: default_metrics_every_ticks(),
        }
    }
}

impl ReaderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_sleep_ms)
    }

    /// Worst-case tick duration in milliseconds when it exceeds the scan period.
    ///
    /// Every antenna timing out costs `antennas × timeout_ms`. A longer tick is
    /// allowed but causes missed periods to be skipped.
    pub fn tick_budget_overrun(&self) -> Option<u64> {
        let worst_case_ms = self.timeout_ms.saturating_mul(self.antennas.len() as u64);
        (worst_case_ms > self.loop_sleep_ms).then_some(worst_case_ms)
    }

    /// Check the numeric bounds and the antenna list.
    ///
    /// Antennas must be non-empty, positive and distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uri.trim().is_empty() {
            return Err(ConfigError::EmptyUri);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::NotPositive("timeout_ms"));
        }
        if self.loop_sleep_ms == 0 {
            return Err(ConfigError::NotPositive("loop_sleep_ms"));
        }
        if self.max_tags == 0 {
            return Err(ConfigError::NotPositive("max_tags"));
        }
        if self.epc_buf_size == 0 {
            return Err(ConfigError::NotPositive("epc_buf_size"));
        }
        if self.max_tags > MAX_TAGS_LIMIT {
            return Err(ConfigError::TooLarge {
                field: "max_tags",
                max: MAX_TAGS_LIMIT,
            });
        }
        if self.epc_buf_size > MAX_EPC_BUF_SIZE {
            return Err(ConfigError::TooLarge {
                field: "epc_buf_size",
                max: MAX_EPC_BUF_SIZE,
            });
        }
        if self.antennas.is_empty() {
            return Err(ConfigError::NoAntennas);
        }

        let mut seen = HashSet::new();
        for &ant in &self.antennas {
            if ant == 0 {
                return Err(ConfigError::InvalidAntenna(ant));
            }
            if !seen.insert(ant) {
                return Err(ConfigError::DuplicateAntenna(ant));
            }
        }

        Ok(())
    }
}

/// Output topic settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Messages buffered per subscriber before the oldest are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Print every published message to stdout
    #[serde(default = "default_echo")]
    pub echo: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            queue_depth: default_queue_depth(),
            echo: default_echo(),
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::NotPositive("queue_depth"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            prefix: default_log_prefix(),
            debug: false,
            console: default_console(),
        }
    }
}

/// Tag population for the `sim://` driver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// EPCs visible to each antenna
    #[serde(default)]
    pub tags: Vec<SimulatedAntenna>,

    /// Antennas whose reads report a transport fault
    #[serde(default)]
    pub faulty_antennas: Vec<AntennaId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedAntenna {
    pub antenna: AntennaId,

    #[serde(default)]
    pub epcs: Vec<String>,
}

/// Regulatory RF region the reader must be set to before operating
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Na,
    Eu3,
    #[default]
    Kr2,
    In,
    Jp,
    Prc,
    Au,
    Nz,
    Open,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Na => "NA",
            Region::Eu3 => "EU3",
            Region::Kr2 => "KR2",
            Region::In => "IN",
            Region::Jp => "JP",
            Region::Prc => "PRC",
            Region::Au => "AU",
            Region::Nz => "NZ",
            Region::Open => "OPEN",
        };
        f.write_str(name)
    }
}

/// Invalid configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Reader URI is empty")]
    EmptyUri,

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: usize },

    #[error("No antennas configured")]
    NoAntennas,

    #[error("Antenna {0} is not a valid port (must be >= 1)")]
    InvalidAntenna(AntennaId),

    #[error("Antenna {0} is listed more than once")]
    DuplicateAntenna(AntennaId),
}

fn default_uri() -> String {
    "tmr:///dev/ttyUSB0".to_string()
}

fn default_timeout_ms() -> u64 {
    200
}

fn default_loop_sleep_ms() -> u64 {
    100
}

fn default_max_tags() -> usize {
    64
}

fn default_epc_buf_size() -> usize {
    256
}

fn default_antennas() -> Vec<AntennaId> {
    vec![1, 2]
}

fn default_metrics_every_ticks() -> u64 {
    600
}

fn default_topic() -> String {
    "rfid/tags".to_string()
}

fn default_queue_depth() -> usize {
    10
}

fn default_echo() -> bool {
    true
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_prefix() -> String {
    "rfid_tmreader".to_string()
}

fn default_console() -> bool {
    true
}

use crate::models::NodeConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name of the node configuration inside the config directory
pub const NODE_CONFIG_FILE: &str = "rfid_node.yaml";

/// Prefix for environment overrides (`RFID_READER__TIMEOUT_MS=300`)
pub const ENV_PREFIX: &str = "RFID";

/// Configuration manager for the node's YAML configuration.
///
/// Values are layered, later sources winning:
/// 1. Built-in defaults (serde field defaults)
/// 2. `rfid_node.yaml` in the config directory, if present
/// 3. Environment variables `<PREFIX>_<SECTION>__<KEY>`; list keys
///    (`reader.antennas`, `simulation.faulty_antennas`) take comma-separated values
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    node_config_path: Utf8PathBuf,
    env_prefix: String,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            node_config_path: config_dir.join(NODE_CONFIG_FILE),
            config_dir,
            env_prefix: ENV_PREFIX.to_string(),
        })
    }

    /// Read environment overrides from a different prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load, merge and validate the node configuration.
    ///
    /// A missing file is not an error; defaults (plus any environment
    /// overrides) are used instead. Invalid values are.
    ///
    /// This runs before logging exists, so it emits nothing; call
    /// [`log_loaded`](Self::log_loaded) once the subscriber is installed.
    pub fn load_node_config(&self) -> Result<NodeConfig> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(self.node_config_path.as_std_path())
                    .format(::config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("reader.antennas")
                    .with_list_parse_key("simulation.faulty_antennas"),
            )
            .build()
            .with_context(|| format!("Failed to read node config: {}", self.node_config_path))?;

        let config: NodeConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse node config: {}", self.node_config_path))?;

        config
            .validate()
            .with_context(|| format!("Invalid node config: {}", self.node_config_path))?;

        Ok(config)
    }

    /// Log where `config` came from and warn about a tick budget overrun.
    pub fn log_loaded(&self, config: &NodeConfig) {
        if self.node_config_path.exists() {
            tracing::info!("Loaded node config from {}", self.node_config_path);
        } else {
            tracing::warn!(
                "Node config file not found at {}, using defaults",
                self.node_config_path
            );
        }

        let reader = &config.reader;
        tracing::info!(
            "Reader config: uri={}, antennas={:?}, period={}ms, timeout={}ms",
            reader.uri,
            reader.antennas,
            reader.loop_sleep_ms,
            reader.timeout_ms
        );

        if let Some(worst_case_ms) = reader.tick_budget_overrun() {
            tracing::warn!(
                "Worst-case tick ({}ms for {} antennas) exceeds scan period ({}ms); \
                 ticks will be skipped",
                worst_case_ms,
                reader.antennas.len(),
                reader.loop_sleep_ms
            );
        }
    }

    /// Save the node configuration as YAML.
    pub fn save_node_config(&self, config: &NodeConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize node config to YAML")?;

        fs::write(&self.node_config_path, yaml_string)
            .with_context(|| format!("Failed to write node config: {}", self.node_config_path))?;

        tracing::info!("Saved node config to {}", self.node_config_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn node_config_path(&self) -> &Utf8Path {
        &self.node_config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use tempfile::TempDir;

    fn create_test_config_manager(prefix: &str) -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path)
            .unwrap()
            .with_env_prefix(prefix);
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let (manager, _temp_dir) = create_test_config_manager("RFIDUNIT_MISSING");

        let config = manager.load_node_config().unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn test_save_and_load_node_config() {
        let (manager, _temp_dir) = create_test_config_manager("RFIDUNIT_ROUNDTRIP");

        let mut config = NodeConfig::default();
        config.reader.uri = "sim://bench".to_string();
        config.reader.antennas = vec![4, 2];
        config.reader.region = Region::Eu3;
        manager.save_node_config(&config).unwrap();

        let loaded = manager.load_node_config().unwrap();
        assert_eq!(loaded.reader.uri, "sim://bench");
        assert_eq!(loaded.reader.antennas, vec![4, 2]);
        assert_eq!(loaded.reader.region, Region::Eu3);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let (manager, _temp_dir) = create_test_config_manager("RFIDUNIT_INVALID");
        fs::write(
            manager.node_config_path(),
            "reader:\n  antennas: [1, 1]\n",
        )
        .unwrap();

        let err = manager.load_node_config().unwrap_err();
        assert!(format!("{:#}", err).contains("more than once"));
    }
}

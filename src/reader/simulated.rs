use super::driver::{DriverError, ReadPlan, ReaderDriver, uri_scheme};
use crate::models::{AntennaId, Region, SimulationConfig};
use indexmap::IndexMap;
use std::time::Duration;

/// Number of antenna ports on the simulated reader unless overridden
pub const DEFAULT_SIMULATED_PORTS: AntennaId = 4;

/// In-memory reader for `sim://` URIs
///
/// Holds a fixed tag population per antenna and answers reads with the tags
/// of the antennas in the active read plan, in plan order. Antennas marked
/// faulty report a transport error whenever they are part of a read.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    ports: AntennaId,
    tags: IndexMap<AntennaId, Vec<String>>,
    faulty: Vec<AntennaId>,

    allocated: bool,
    connected: bool,
    region: Option<Region>,
    plan: Vec<AntennaId>,

    read_calls: usize,
    disconnect_calls: usize,
    destroy_calls: usize,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self {
            ports: DEFAULT_SIMULATED_PORTS,
            tags: IndexMap::new(),
            faulty: Vec::new(),
            allocated: false,
            connected: false,
            region: None,
            plan: Vec::new(),
            read_calls: 0,
            disconnect_calls: 0,
            destroy_calls: 0,
        }
    }

    /// Build a driver from the `simulation` section of the node config.
    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut driver = Self::new();
        for entry in &config.tags {
            driver = driver.with_tags(entry.antenna, entry.epcs.iter().cloned());
        }
        for &antenna in &config.faulty_antennas {
            driver = driver.with_faulty(antenna);
        }
        driver
    }

    pub fn with_ports(mut self, ports: AntennaId) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_tags<I, S>(mut self, antenna: AntennaId, epcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_tags(antenna, epcs);
        self
    }

    pub fn with_faulty(mut self, antenna: AntennaId) -> Self {
        if !self.faulty.contains(&antenna) {
            self.faulty.push(antenna);
        }
        self
    }

    /// Replace the tags visible to `antenna`.
    pub fn set_tags<I, S>(&mut self, antenna: AntennaId, epcs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(antenna, epcs.into_iter().map(Into::into).collect());
    }

    pub fn set_faulty(&mut self, antenna: AntennaId, faulty: bool) {
        self.faulty.retain(|&a| a != antenna);
        if faulty {
            self.faulty.push(antenna);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    pub fn active_plan(&self) -> &[AntennaId] {
        &self.plan
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderDriver for SimulatedDriver {
    fn create(&mut self) -> Result<(), DriverError> {
        self.allocated = true;
        Ok(())
    }

    fn connect(&mut self, uri: &str) -> Result<(), DriverError> {
        if !self.allocated {
            return Err(DriverError::Allocation("handle not created".to_string()));
        }

        match uri_scheme(uri) {
            Some("sim") => {
                self.connected = true;
                tracing::debug!("Simulated reader connected: {}", uri);
                Ok(())
            }
            Some(other) => Err(DriverError::UnsupportedScheme(other.to_string())),
            None => Err(DriverError::UnsupportedScheme(uri.to_string())),
        }
    }

    fn set_region(&mut self, region: Region) -> Result<(), DriverError> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        self.region = Some(region);
        Ok(())
    }

    fn set_read_plan(&mut self, plan: &ReadPlan) -> Result<(), DriverError> {
        if !self.connected {
            return Err(DriverError::NotConnected);
        }
        if plan.antennas.is_empty() {
            return Err(DriverError::Rejected("empty antenna list".to_string()));
        }
        if let Some(&bad) = plan
            .antennas
            .iter()
            .find(|&&ant| ant == 0 || ant > self.ports)
        {
            return Err(DriverError::Rejected(format!(
                "antenna {} out of range 1..={}",
                bad, self.ports
            )));
        }

        self.plan.clear();
        self.plan.extend_from_slice(&plan.antennas);
        Ok(())
    }

    fn read_epcs(
        &mut self,
        out: &mut Vec<String>,
        max_tags: usize,
        _epc_buf_size: usize,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        self.read_calls += 1;

        if !self.connected {
            return Err(DriverError::NotConnected);
        }

        if let Some(&ant) = self.plan.iter().find(|&&ant| self.faulty.contains(&ant)) {
            return Err(DriverError::Transport(format!(
                "antenna {} not responding",
                ant
            )));
        }

        'plan: for ant in &self.plan {
            let Some(epcs) = self.tags.get(ant) else {
                continue;
            };
            for epc in epcs {
                if out.len() >= max_tags {
                    break 'plan;
                }
                out.push(epc.clone());
            }
        }

        if out.is_empty() {
            return Err(DriverError::NoTags);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.disconnect_calls += 1;
        self.connected = false;
        self.plan.clear();
    }

    fn destroy(&mut self) {
        self.destroy_calls += 1;
        self.allocated = false;
    }
}

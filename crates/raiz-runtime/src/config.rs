//! System configuration
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! configuration. Durations are humantime strings (`"1s"`, `"250ms"`).
//!
//! ```toml
//! node_ids = ["node-001", "node-002", "node-003"]
//!
//! [node]
//! sweep_interval = "1s"
//! apoptosis_grace = "2s"
//!
//! [auto_spawn]
//! enabled = true
//! interval = "5s"
//! probability = 0.3
//!
//! [gateway]
//! udp = false
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use raiz_core::NodeId;
use raiz_diffusion::Channel;
use raiz_state::MemoryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Nodes created at startup, in order
    pub node_ids: Vec<NodeId>,
    pub node: NodeConfig,
    pub pipeline: PipelineConfig,
    pub auto_spawn: AutoSpawnConfig,
    pub gateway: GatewayConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            node_ids: ["node-001", "node-002", "node-003"]
                .into_iter()
                .map(NodeId::from)
                .collect(),
            node: NodeConfig::default(),
            pipeline: PipelineConfig::default(),
            auto_spawn: AutoSpawnConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Parse and validate
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: SystemConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_ids.len() < 2 {
            return Err(ConfigError::Invalid(format!(
                "at least two nodes are required, got {}",
                self.node_ids.len()
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.node_ids.iter().find(|id| !seen.insert(*id)) {
            return Err(ConfigError::Invalid(format!("duplicate node id: {dup}")));
        }

        if self.node.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "node.sweep_interval must be non-zero".into(),
            ));
        }

        let p = self.auto_spawn.probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(ConfigError::Invalid(format!(
                "auto_spawn.probability must be within [0, 1], got {p}"
            )));
        }
        if self.auto_spawn.enabled && self.auto_spawn.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "auto_spawn.interval must be non-zero when enabled".into(),
            ));
        }

        Ok(())
    }
}

/// Per-node lifecycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    #[serde(with = "duration_str")]
    pub sweep_interval: Duration,
    #[serde(with = "duration_str")]
    pub apoptosis_grace: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let memory = MemoryConfig::default();
        NodeConfig {
            sweep_interval: memory.sweep_interval,
            apoptosis_grace: memory.apoptosis_grace,
        }
    }
}

impl NodeConfig {
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            sweep_interval: self.sweep_interval,
            apoptosis_grace: self.apoptosis_grace,
        }
    }
}

/// Delays between pipeline stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Birth → replication
    #[serde(with = "duration_str")]
    pub replication_delay: Duration,
    /// Replication → propagation
    #[serde(with = "duration_str")]
    pub propagation_delay: Duration,
    /// Propagation → delivery
    #[serde(with = "duration_str")]
    pub delivery_delay: Duration,
    /// How long a stage hint stays visible
    #[serde(with = "duration_str")]
    pub stage_linger: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            replication_delay: Duration::from_secs(1),
            propagation_delay: Duration::from_secs(1),
            delivery_delay: Duration::from_secs(2),
            stage_linger: Duration::from_secs(3),
        }
    }
}

/// Background spawning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSpawnConfig {
    pub enabled: bool,
    #[serde(with = "duration_str")]
    pub interval: Duration,
    /// Chance of a spawn at each firing
    pub probability: f64,
}

impl Default for AutoSpawnConfig {
    fn default() -> Self {
        AutoSpawnConfig {
            enabled: true,
            interval: Duration::from_secs(5),
            probability: 0.3,
        }
    }
}

/// Initial channel activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub udp: bool,
    pub websocket: bool,
    pub ble: bool,
    pub local: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            udp: true,
            websocket: true,
            ble: true,
            local: true,
        }
    }
}

impl GatewayConfig {
    pub fn is_active(&self, channel: Channel) -> bool {
        match channel {
            Channel::Udp => self.udp,
            Channel::WebSocket => self.websocket,
            Channel::Ble => self.ble,
            Channel::Local => self.local,
        }
    }
}

/// Serde adapter for humantime duration strings
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

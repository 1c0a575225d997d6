use std::path::Path;

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

/// Node configuration: defaults, optionally overridden by `mycoin.toml`,
/// then by CLI flags and environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MycoinConfig {
    pub node: NodeSection,
    pub network: NetworkSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSection {
    pub port: u16,
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    /// Peer URLs registered (and synced from) at startup.
    pub peers: Vec<String>,
}

impl Default for MycoinConfig {
    fn default() -> Self {
        Self {
            node: NodeSection {
                port: 5000,
                data_dir: "data".to_string(),
            },
            network: NetworkSection { peers: Vec::new() },
        }
    }
}

impl MycoinConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;
        config.try_deserialize()
    }

    /// Load configuration with CLI overrides layered on top. `connect`
    /// entries are appended to the configured peer list.
    pub fn load_with_overrides(
        config_file: Option<String>,
        port: Option<u16>,
        data_dir: Option<String>,
        connect: &[String],
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_file {
            Self::from_file(path)?
        } else if Path::new("mycoin.toml").exists() {
            Self::from_file("mycoin.toml")?
        } else {
            Self::default()
        };

        if let Some(port) = port {
            config.node.port = port;
        }
        if let Some(data_dir) = data_dir {
            config.node.data_dir = data_dir;
        }
        config
            .network
            .peers
            .extend(connect.iter().map(|peer| peer.trim().to_string()));

        Ok(config)
    }
}

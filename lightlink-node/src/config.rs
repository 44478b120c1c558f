// src/config.rs

//! Service settings.

use crate::errors::SettingsError;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file
pub const SETTINGS_ENV: &str = "LIGHTLINK_CONFIG";

/// Complete service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Call bridge server settings
    pub rpc: RpcSettings,

    /// Root that relative node and keystore directories resolve under;
    /// `None` means `<home>/Documents`
    pub data_root: Option<PathBuf>,

    /// Node directory used when configure omits `nodeDir`
    pub node_dir: String,

    /// Keystore directory used when configure omits `keyStoreDir`
    pub keystore_dir: String,

    /// Capacity of the host-facing event channel
    pub event_capacity: usize,

    /// Dev node settings
    pub dev: DevSettings,
}

/// Call bridge server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcSettings {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable the HTTP call bridge
    pub enabled: bool,
}

/// Dev node settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DevSettings {
    /// Produce a head this often while running; `None` disables
    pub head_interval_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rpc: RpcSettings {
                listen_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8545)),
                enabled: true,
            },
            data_root: None,
            node_dir: crate::DEFAULT_NODE_DIR.to_string(),
            keystore_dir: crate::DEFAULT_KEYSTORE_DIR.to_string(),
            event_capacity: 256,
            dev: DevSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Saves settings to file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Loads settings from `path` if given, otherwise defaults
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolved data root
    pub fn resolve_data_root(&self) -> Result<PathBuf, SettingsError> {
        if let Some(root) = &self.data_root {
            return Ok(root.clone());
        }

        let dirs = directories::UserDirs::new().ok_or(SettingsError::NoHomeDirectory)?;
        Ok(dirs.home_dir().join("Documents"))
    }
}

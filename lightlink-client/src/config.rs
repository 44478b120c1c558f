// src/config.rs

//! Typed node configuration handed to the node factory.

use crate::{DEFAULT_MAX_PEERS, DEFAULT_NETWORK_ID, STATIC_NODES_FILE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Chain synchronization mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Download and execute every block
    Full,
    /// Download state at a pivot, then execute
    Fast,
    /// Verify headers only, fetch state on demand
    Light,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Fast => write!(f, "fast"),
            SyncMode::Light => write!(f, "light"),
        }
    }
}

/// Node configuration
///
/// Immutable once passed to [`crate::NodeFactory::new_node`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfiguration {
    /// Chain identifier
    pub network_id: u64,

    /// Maximum number of peer connections
    pub max_peers: usize,

    /// Chain spec JSON; `None` selects the embedded default chain
    pub genesis: Option<String>,

    /// Synchronization mode
    pub sync_mode: SyncMode,

    /// Node data directory
    pub data_dir: PathBuf,

    /// Keystore directory
    pub keystore_dir: PathBuf,

    /// Peers the node always tries to connect to; `None` leaves the static
    /// peers file as it is
    pub static_nodes: Option<Vec<String>>,
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self {
            network_id: DEFAULT_NETWORK_ID,
            max_peers: DEFAULT_MAX_PEERS,
            genesis: None,
            sync_mode: SyncMode::Light,
            data_dir: PathBuf::from(".lightlink"),
            keystore_dir: PathBuf::from("keystore"),
            static_nodes: None,
        }
    }
}

impl NodeConfiguration {
    /// Path of the static peers file read at node start
    pub fn static_nodes_path(&self) -> PathBuf {
        self.data_dir.join(STATIC_NODES_FILE)
    }
}

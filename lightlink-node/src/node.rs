// src/node.rs

//! Ownership and lifecycle of the embedded node.
//!
//! ```text
//!   Unconfigured --configure--> Configured --start--> Running
//!                                   ^                    |
//!                                   +--------stop--------+
//! ```
//!
//! `configure` is accepted in every state and replaces the node, its
//! configuration and its keystore as one unit. Nothing a rejected configure
//! was given reaches disk.

use crate::errors::{BridgeError, Result};
use crate::translator::write_static_nodes;
use lightlink_client::{
    ChainClient, ClientError, EmbeddedNode, KeyStore, NodeConfiguration, NodeFactory,
    ScryptParams, SyncMode,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// A node together with the configuration and keystore it was built from
pub struct NodeState {
    node: Arc<dyn EmbeddedNode>,
    config: NodeConfiguration,
    keystore: KeyStore,
}

impl NodeState {
    /// The node
    pub fn node(&self) -> &Arc<dyn EmbeddedNode> {
        &self.node
    }

    /// Configuration the node was created with
    pub fn config(&self) -> &NodeConfiguration {
        &self.config
    }

    /// Keystore opened alongside the node
    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }
}

/// Lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// No node configured yet
    Unconfigured,
    /// Node built, services stopped
    Configured,
    /// Services running
    Running,
}

/// Serializable view of the handle
#[derive(Clone, Debug, Serialize)]
pub struct NodeStatus {
    /// Lifecycle state
    pub state: Lifecycle,

    /// Chain identifier
    pub network_id: Option<u64>,

    /// Peer cap
    pub max_peers: Option<usize>,

    /// Sync mode
    pub sync_mode: Option<SyncMode>,

    /// Node data directory
    pub data_dir: Option<PathBuf>,

    /// Keystore directory
    pub keystore_dir: Option<PathBuf>,

    /// Number of static peers configured
    pub static_nodes: usize,
}

/// Holds the single node of a bridge
pub struct NodeHandle {
    /// Builds nodes and keystores
    factory: Arc<dyn NodeFactory>,

    /// Current node, swapped whole on configure
    state: RwLock<Option<Arc<NodeState>>>,
}

impl NodeHandle {
    /// Creates an unconfigured handle
    pub fn new(factory: Arc<dyn NodeFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(None),
        }
    }

    /// Builds a node and keystore from `config` and makes them current.
    ///
    /// On failure the previous node, if any, stays in place. The static
    /// peers file is only written once node and keystore exist. A replaced
    /// node that was still running is stopped.
    pub async fn configure(&self, config: NodeConfiguration) -> Result<bool> {
        let node = self
            .factory
            .new_node(&config)
            .map_err(BridgeError::NodeCreation)?;
        let keystore = self
            .factory
            .new_keystore(&config.keystore_dir, ScryptParams::light())
            .map_err(BridgeError::NodeCreation)?;
        write_static_nodes(&config)?;

        info!(
            "Configured node (network {}, {} sync) at {:?}",
            config.network_id, config.sync_mode, config.data_dir
        );

        let fresh = Arc::new(NodeState {
            node,
            config,
            keystore,
        });
        let previous = self.state.write().await.replace(fresh);

        if let Some(previous) = previous {
            if previous.node.is_running() {
                if let Err(e) = previous.node.stop() {
                    warn!("Failed to stop replaced node: {}", e);
                }
            }
        }

        Ok(true)
    }

    /// Starts the node.
    ///
    /// Returns `false` without error when nothing is configured.
    pub async fn start(&self) -> Result<bool> {
        let Some(state) = self.snapshot().await else {
            warn!("Start requested before configure");
            return Ok(false);
        };

        state.node.start().map_err(BridgeError::Start)?;
        info!("Node started");
        Ok(true)
    }

    /// Stops the node; it stays configured and may be started again.
    ///
    /// Returns `false` without error when nothing is configured.
    pub async fn stop(&self) -> Result<bool> {
        let Some(state) = self.snapshot().await else {
            warn!("Stop requested before configure");
            return Ok(false);
        };

        state.node.stop().map_err(BridgeError::Stop)?;
        info!("Node stopped");
        Ok(true)
    }

    /// Chain client of the current node, `None` when unconfigured
    pub async fn client(&self) -> std::result::Result<Option<Arc<dyn ChainClient>>, ClientError> {
        match self.snapshot().await {
            Some(state) => state.node.client().map(Some),
            None => Ok(None),
        }
    }

    /// Current node state
    pub async fn snapshot(&self) -> Option<Arc<NodeState>> {
        self.state.read().await.clone()
    }

    /// Current lifecycle state
    pub async fn lifecycle(&self) -> Lifecycle {
        lifecycle_of(&self.snapshot().await)
    }

    /// Status snapshot
    pub async fn status(&self) -> NodeStatus {
        let state = self.snapshot().await;
        let config = state.as_ref().map(|s| &s.config);

        NodeStatus {
            state: lifecycle_of(&state),
            network_id: config.map(|c| c.network_id),
            max_peers: config.map(|c| c.max_peers),
            sync_mode: config.map(|c| c.sync_mode),
            data_dir: config.map(|c| c.data_dir.clone()),
            keystore_dir: state.as_ref().map(|s| s.keystore.directory().to_path_buf()),
            static_nodes: config
                .and_then(|c| c.static_nodes.as_ref())
                .map_or(0, Vec::len),
        }
    }
}

fn lifecycle_of(state: &Option<Arc<NodeState>>) -> Lifecycle {
    match state {
        None => Lifecycle::Unconfigured,
        Some(state) if state.node.is_running() => Lifecycle::Running,
        Some(_) => Lifecycle::Configured,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightlink_client::DevNodeFactory;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir, dir: &str) -> NodeConfiguration {
        NodeConfiguration {
            data_dir: temp_dir.path().join(dir),
            keystore_dir: temp_dir.path().join(dir).join("keystore"),
            ..Default::default()
        }
    }

    /// Node whose start always fails
    struct BrokenNode {
        running: AtomicBool,
    }

    impl EmbeddedNode for BrokenNode {
        fn start(&self) -> lightlink_client::Result<()> {
            Err(ClientError::InvalidConfig("port 30303 in use".to_string()))
        }

        fn stop(&self) -> lightlink_client::Result<()> {
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn client(&self) -> lightlink_client::Result<Arc<dyn ChainClient>> {
            Err(ClientError::NotRunning)
        }
    }

    struct BrokenFactory;

    impl NodeFactory for BrokenFactory {
        fn new_node(
            &self,
            _config: &NodeConfiguration,
        ) -> lightlink_client::Result<Arc<dyn EmbeddedNode>> {
            Ok(Arc::new(BrokenNode {
                running: AtomicBool::new(false),
            }))
        }
    }

    #[tokio::test]
    async fn test_unconfigured_is_noop() {
        let handle = NodeHandle::new(Arc::new(DevNodeFactory::new()));

        assert_eq!(handle.lifecycle().await, Lifecycle::Unconfigured);
        assert!(!handle.start().await.unwrap());
        assert!(!handle.stop().await.unwrap());
        assert!(handle.client().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let handle = NodeHandle::new(Arc::new(DevNodeFactory::new()));

        assert!(handle.configure(test_config(&temp_dir, "a")).await.unwrap());
        assert_eq!(handle.lifecycle().await, Lifecycle::Configured);

        assert!(handle.start().await.unwrap());
        assert_eq!(handle.lifecycle().await, Lifecycle::Running);

        assert!(handle.stop().await.unwrap());
        assert_eq!(handle.lifecycle().await, Lifecycle::Configured);

        assert!(handle.start().await.unwrap());
        assert!(handle.client().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_library_errors_propagate() {
        let temp_dir = TempDir::new().unwrap();
        let handle = NodeHandle::new(Arc::new(DevNodeFactory::new()));
        handle.configure(test_config(&temp_dir, "a")).await.unwrap();

        assert!(matches!(handle.stop().await, Err(BridgeError::Stop(ClientError::NotRunning))));

        handle.start().await.unwrap();
        assert!(matches!(
            handle.start().await,
            Err(BridgeError::Start(ClientError::AlreadyRunning))
        ));
    }

    #[tokio::test]
    async fn test_start_failure() {
        let temp_dir = TempDir::new().unwrap();
        let handle = NodeHandle::new(Arc::new(BrokenFactory));
        handle.configure(test_config(&temp_dir, "a")).await.unwrap();

        let err = handle.start().await.unwrap_err();
        assert_eq!(err.code(), "E_START");
        assert_eq!(handle.lifecycle().await, Lifecycle::Configured);
    }

    #[tokio::test]
    async fn test_failed_configure_keeps_previous() {
        let temp_dir = TempDir::new().unwrap();
        let handle = NodeHandle::new(Arc::new(DevNodeFactory::new()));
        handle.configure(test_config(&temp_dir, "a")).await.unwrap();

        let bad = NodeConfiguration {
            genesis: Some("not json".to_string()),
            ..test_config(&temp_dir, "b")
        };
        assert!(matches!(
            handle.configure(bad).await,
            Err(BridgeError::NodeCreation(ClientError::InvalidGenesis(_)))
        ));

        let status = handle.status().await;
        assert_eq!(status.data_dir, Some(temp_dir.path().join("a")));
    }

    #[tokio::test]
    async fn test_failed_configure_leaves_static_peers() {
        let temp_dir = TempDir::new().unwrap();
        let factory = Arc::new(DevNodeFactory::new());
        let handle = NodeHandle::new(factory.clone());

        let good = vec!["enode://aa@10.0.0.1:30303".to_string()];
        handle
            .configure(NodeConfiguration {
                static_nodes: Some(good.clone()),
                ..test_config(&temp_dir, "a")
            })
            .await
            .unwrap();
        let retained = factory.latest().unwrap();

        let rejected = NodeConfiguration {
            genesis: Some("{\"config\":".to_string()),
            static_nodes: Some(vec!["enode://ff@6.6.6.6:30303".to_string()]),
            ..test_config(&temp_dir, "a")
        };
        assert!(matches!(
            handle.configure(rejected).await,
            Err(BridgeError::NodeCreation(_))
        ));

        handle.start().await.unwrap();
        assert_eq!(retained.static_peers(), good);
        assert_eq!(handle.status().await.static_nodes, 1);
    }

    #[tokio::test]
    async fn test_reconfigure_replaces_triple() {
        let temp_dir = TempDir::new().unwrap();
        let factory = Arc::new(DevNodeFactory::new());
        let handle = NodeHandle::new(factory.clone());

        handle.configure(test_config(&temp_dir, "a")).await.unwrap();
        let first = factory.latest().unwrap();
        handle.start().await.unwrap();

        let second_config = NodeConfiguration {
            network_id: 3,
            ..test_config(&temp_dir, "b")
        };
        handle.configure(second_config).await.unwrap();

        assert!(!first.is_running());
        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.config().network_id, 3);
        assert_eq!(state.config().data_dir, temp_dir.path().join("b"));
        assert_eq!(state.keystore().directory(), temp_dir.path().join("b").join("keystore"));
        assert_eq!(handle.lifecycle().await, Lifecycle::Configured);
    }

    #[tokio::test]
    async fn test_status() {
        let temp_dir = TempDir::new().unwrap();
        let handle = NodeHandle::new(Arc::new(DevNodeFactory::new()));
        assert_eq!(handle.status().await.state, Lifecycle::Unconfigured);

        handle.configure(test_config(&temp_dir, "a")).await.unwrap();
        let status = handle.status().await;
        assert_eq!(status.state, Lifecycle::Configured);
        assert_eq!(status.sync_mode, Some(SyncMode::Light));
        assert_eq!(status.static_nodes, 0);
    }
}

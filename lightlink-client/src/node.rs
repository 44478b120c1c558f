// src/node.rs

//! Embedded node capability and the in-process dev light node.
//!
//! The node bridge only depends on [`NodeFactory`], [`EmbeddedNode`] and
//! [`ChainClient`]. [`DevNode`] implements them with:
//! - Genesis validation and data directory setup at creation
//! - Static peers loaded from the data directory at start
//! - An optional head producer task while running
//! - Fan-out of new heads to bounded subscriber sinks

use crate::config::{NodeConfiguration, SyncMode};
use crate::errors::{ClientError, Result};
use crate::genesis::Genesis;
use crate::header::{ChainHeader, Header};
use crate::keystore::{KeyStore, ScryptParams};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

/// Bounded sink a client pushes new heads into
pub type HeadSink = mpsc::Sender<Arc<dyn ChainHeader>>;

/// Connected chain client of a node
pub trait ChainClient: Send + Sync {
    /// Registers a sink for new chain heads.
    ///
    /// The sink's capacity is the delivery buffer; what happens when it is
    /// full is up to the client.
    fn subscribe_new_head(&self, sink: HeadSink) -> Result<()>;
}

/// A node built by a [`NodeFactory`]
pub trait EmbeddedNode: Send + Sync {
    /// Starts networking and sync services
    fn start(&self) -> Result<()>;

    /// Stops all services; the node may be started again
    fn stop(&self) -> Result<()>;

    /// Whether services are running
    fn is_running(&self) -> bool;

    /// Chain client used for subscriptions
    fn client(&self) -> Result<Arc<dyn ChainClient>>;
}

/// Builds nodes and keystores
pub trait NodeFactory: Send + Sync {
    /// Creates a node from a configuration
    fn new_node(&self, config: &NodeConfiguration) -> Result<Arc<dyn EmbeddedNode>>;

    /// Opens the keystore held alongside a node
    fn new_keystore(&self, directory: &Path, scrypt: ScryptParams) -> Result<KeyStore> {
        KeyStore::new(directory, scrypt)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Chain client of a [`DevNode`]
pub struct DevClient {
    /// Registered head sinks
    sinks: Mutex<Vec<HeadSink>>,

    /// Current chain head
    head: Mutex<Header>,

    /// Whether the owning node is running
    running: AtomicBool,

    /// Notifications dropped because a sink was full
    overflowed: AtomicU64,
}

impl DevClient {
    fn new(genesis: Header) -> Self {
        Self {
            sinks: Mutex::new(Vec::new()),
            head: Mutex::new(genesis),
            running: AtomicBool::new(false),
            overflowed: AtomicU64::new(0),
        }
    }

    /// Delivers a header to every registered sink.
    ///
    /// Returns the number of sinks that accepted it.
    pub fn inject_head(&self, header: Arc<dyn ChainHeader>) -> usize {
        let mut sinks = lock(&self.sinks);
        let mut delivered = 0;

        sinks.retain(|sink| match sink.try_send(header.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("New-head sink full, dropping notification");
                self.overflowed.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("New-head sink closed, removing");
                false
            }
        });

        delivered
    }

    /// Extends the chain by one header and delivers it
    pub fn advance(&self) -> Header {
        let next = {
            let mut head = lock(&self.head);
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            *head = head.child(now);
            head.clone()
        };

        self.inject_head(Arc::new(next.clone()));
        next
    }

    /// Current chain head
    pub fn head(&self) -> Header {
        lock(&self.head).clone()
    }

    /// Number of registered sinks
    pub fn subscriber_count(&self) -> usize {
        lock(&self.sinks).len()
    }

    /// Notifications dropped on full sinks
    pub fn overflowed(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }

    fn set_running(&self, running: bool) {
        // Flipped under the sinks lock so no sink is registered on a stopped client
        let mut sinks = lock(&self.sinks);
        self.running.store(running, Ordering::SeqCst);
        if !running {
            // Dropping the senders ends every subscription
            sinks.clear();
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl ChainClient for DevClient {
    fn subscribe_new_head(&self, sink: HeadSink) -> Result<()> {
        if sink.is_closed() {
            return Err(ClientError::SubscriptionError("sink is closed".to_string()));
        }

        let mut sinks = lock(&self.sinks);
        if !self.is_running() {
            return Err(ClientError::SubscriptionError(
                "node is not running".to_string(),
            ));
        }
        sinks.push(sink);
        debug!("Registered new-head sink");
        Ok(())
    }
}

/// In-process light node
pub struct DevNode {
    /// Node configuration
    config: NodeConfiguration,

    /// Chain client
    client: Arc<DevClient>,

    /// Head production period while running
    head_interval: Option<Duration>,

    /// Head producer task
    producer: Mutex<Option<JoinHandle<()>>>,

    /// Peers loaded from the static peers file
    static_peers: Mutex<Vec<String>>,
}

impl DevNode {
    /// Creates a dev node
    pub fn new(config: NodeConfiguration, head_interval: Option<Duration>) -> Result<Self> {
        if config.sync_mode != SyncMode::Light {
            return Err(ClientError::InvalidConfig(format!(
                "unsupported sync mode {}",
                config.sync_mode
            )));
        }

        let genesis = match &config.genesis {
            Some(spec) => Genesis::from_json(spec)?,
            None => Genesis::default_for(config.network_id),
        };

        if let Some(chain_id) = genesis.config.chain_id {
            if chain_id != config.network_id {
                warn!(
                    "Genesis chain id {} differs from network id {}",
                    chain_id, config.network_id
                );
            }
        }

        fs::create_dir_all(&config.data_dir)?;

        let genesis_header = Header::genesis(&genesis);
        info!(
            "Created light node at {:?} (network {}, genesis 0x{})",
            config.data_dir,
            config.network_id,
            hex::encode(&genesis_header.hash[..8])
        );

        Ok(Self {
            config,
            client: Arc::new(DevClient::new(genesis_header)),
            head_interval,
            producer: Mutex::new(None),
            static_peers: Mutex::new(Vec::new()),
        })
    }

    /// Node configuration
    pub fn config(&self) -> &NodeConfiguration {
        &self.config
    }

    /// Concrete chain client
    pub fn dev_client(&self) -> Arc<DevClient> {
        self.client.clone()
    }

    /// Peers loaded at the last start
    pub fn static_peers(&self) -> Vec<String> {
        lock(&self.static_peers).clone()
    }

    fn load_static_peers(&self) -> Result<Vec<String>> {
        let path = self.config.static_nodes_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents).map_err(|e| {
            ClientError::InvalidConfig(format!("corrupt static peers file {:?}: {}", path, e))
        })
    }

    fn spawn_producer(&self, period: Duration) -> Result<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::RuntimeError(e.to_string()))?;
        let client = self.client.clone();

        Ok(runtime.spawn(async move {
            let mut timer = interval(period);
            // First tick completes immediately
            timer.tick().await;

            loop {
                timer.tick().await;
                let head = client.advance();
                debug!("Produced head #{}", head.number);
            }
        }))
    }

    fn halt_producer(&self) {
        if let Some(handle) = lock(&self.producer).take() {
            handle.abort();
        }
    }
}

impl EmbeddedNode for DevNode {
    fn start(&self) -> Result<()> {
        if self.client.is_running() {
            return Err(ClientError::AlreadyRunning);
        }

        let peers = self.load_static_peers()?;
        info!("Starting light node with {} static peers", peers.len());
        *lock(&self.static_peers) = peers;

        if let Some(period) = self.head_interval {
            let handle = self.spawn_producer(period)?;
            *lock(&self.producer) = Some(handle);
        }

        self.client.set_running(true);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if !self.client.is_running() {
            return Err(ClientError::NotRunning);
        }

        self.halt_producer();
        self.client.set_running(false);
        info!("Light node stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.client.is_running()
    }

    fn client(&self) -> Result<Arc<dyn ChainClient>> {
        let client: Arc<dyn ChainClient> = self.client.clone();
        Ok(client)
    }
}

impl Drop for DevNode {
    fn drop(&mut self) {
        self.halt_producer();
        self.client.set_running(false);
    }
}

/// Factory for [`DevNode`]s
#[derive(Default)]
pub struct DevNodeFactory {
    /// Head production period handed to new nodes
    head_interval: Option<Duration>,

    /// Most recently created node
    latest: Mutex<Option<Weak<DevNode>>>,
}

impl DevNodeFactory {
    /// Creates a factory whose nodes only emit injected heads
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory whose nodes produce a head every `period` while running
    pub fn with_head_interval(period: Duration) -> Self {
        Self {
            head_interval: Some(period),
            latest: Mutex::new(None),
        }
    }

    /// Most recently created node, if still alive
    pub fn latest(&self) -> Option<Arc<DevNode>> {
        lock(&self.latest).as_ref().and_then(Weak::upgrade)
    }
}

impl NodeFactory for DevNodeFactory {
    fn new_node(&self, config: &NodeConfiguration) -> Result<Arc<dyn EmbeddedNode>> {
        let node = Arc::new(DevNode::new(config.clone(), self.head_interval)?);
        *lock(&self.latest) = Some(Arc::downgrade(&node));
        let node: Arc<dyn EmbeddedNode> = node;
        Ok(node)
    }
}

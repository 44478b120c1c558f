// src/bridge.rs

//! The operations a host invokes.
//!
//! Each call resolves with a boolean or rejects with a
//! [`BridgeError`](crate::errors::BridgeError).
//! Calls are expected one at a time; header events arrive independently on
//! the [`EventChannel`].

use crate::config::Settings;
use crate::errors::{BridgeError, ConfigurationError, Result, SettingsError};
use crate::events::{BridgeEvent, EventChannel};
use crate::node::{NodeHandle, NodeStatus};
use crate::relay::{HeaderRelay, RelayStatsSnapshot};
use crate::translator::ConfigTranslator;
use lightlink_client::NodeFactory;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// Combined node and relay status
#[derive(Clone, Debug, Serialize)]
pub struct BridgeStatus {
    /// Node status
    pub node: NodeStatus,

    /// Relay counters
    pub relay: RelayStatsSnapshot,
}

/// Host-facing bridge to one embedded node
pub struct Bridge {
    translator: ConfigTranslator,
    handle: Arc<NodeHandle>,
    relay: HeaderRelay,
}

impl Bridge {
    /// Creates a bridge with an unconfigured node
    pub fn new(
        translator: ConfigTranslator,
        factory: Arc<dyn NodeFactory>,
        events: EventChannel,
    ) -> Self {
        let handle = Arc::new(NodeHandle::new(factory));
        let relay = HeaderRelay::new(handle.clone(), events);

        Self {
            translator,
            handle,
            relay,
        }
    }

    /// Creates a bridge from service settings
    pub fn from_settings(
        settings: &Settings,
        factory: Arc<dyn NodeFactory>,
    ) -> std::result::Result<Self, SettingsError> {
        let translator = ConfigTranslator::from_settings(settings)?;
        Ok(Self::new(
            translator,
            factory,
            EventChannel::new(settings.event_capacity),
        ))
    }

    /// Validates `input` and replaces the node with one built from it
    pub async fn configure(&self, input: &Value) -> Result<bool> {
        logged("configure", self.translate_and_configure(input).await)
    }

    /// Parses a raw request body and configures from it.
    ///
    /// A blank body is an empty mapping; a body that is not JSON rejects as
    /// a configuration error.
    pub async fn configure_raw(&self, body: &[u8]) -> Result<bool> {
        let input = if body.iter().all(u8::is_ascii_whitespace) {
            Ok(Value::Null)
        } else {
            serde_json::from_slice(body).map_err(|e| {
                BridgeError::from(ConfigurationError::InvalidValue {
                    option: "body",
                    reason: e.to_string(),
                })
            })
        };

        match input {
            Ok(input) => self.configure(&input).await,
            Err(e) => logged("configure", Err(e)),
        }
    }

    async fn translate_and_configure(&self, input: &Value) -> Result<bool> {
        let config = self.translator.translate(input)?;
        self.handle.configure(config).await
    }

    /// Starts the node; `false` when unconfigured
    pub async fn start(&self) -> Result<bool> {
        logged("start", self.handle.start().await)
    }

    /// Stops the node; `false` when unconfigured
    pub async fn stop(&self) -> Result<bool> {
        logged("stop", self.handle.stop().await)
    }

    /// Subscribes to new heads; `true` without subscribing when unconfigured
    pub async fn subscribe(&self) -> Result<bool> {
        logged("subscribe", self.relay.subscribe().await)
    }

    /// New listener for host events
    pub fn events(&self) -> mpsc::Receiver<BridgeEvent> {
        self.relay.events().subscribe()
    }

    /// Node handle
    pub fn handle(&self) -> &Arc<NodeHandle> {
        &self.handle
    }

    /// Header relay
    pub fn relay(&self) -> &HeaderRelay {
        &self.relay
    }

    /// Status snapshot
    pub async fn status(&self) -> BridgeStatus {
        BridgeStatus {
            node: self.handle.status().await,
            relay: self.relay.stats(),
        }
    }
}

fn logged<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        error!("{} rejected ({}): {}", operation, e.code(), e);
    }
    result
}

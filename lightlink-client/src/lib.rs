// src/lib.rs

//! # Lightlink Client
//!
//! The embedded light client capability consumed by the Lightlink node bridge.
//!
//! This module provides:
//! - **Node Factory**: Build a node from a typed [`NodeConfiguration`]
//! - **Lifecycle**: Start and stop the node's networking and sync services
//! - **Keystore**: Scrypt-parameterized key storage directory
//! - **New-Head Delivery**: Push chain head notifications into a bounded sink
//!
//! ## Architecture
//!
//! The bridge only ever talks to the traits in [`node`]. The `Dev*` types
//! are an in-process light node used by the binary and by tests:
//! 1. `DevNodeFactory` validates the genesis and prepares the data directory
//! 2. `DevNode::start` loads the static peers file and begins producing heads
//! 3. `DevClient` fans each head out to every registered sink with `try_send`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lightlink_client::{DevNodeFactory, EmbeddedNode, NodeConfiguration, NodeFactory};
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = DevNodeFactory::new();
//!     let node = factory.new_node(&NodeConfiguration::default()).unwrap();
//!     node.start().unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod errors;
pub mod config;
pub mod genesis;
pub mod header;
pub mod keystore;
pub mod node;

// Re-export commonly used types
pub use crate::errors::{ClientError, Result};
pub use crate::config::{NodeConfiguration, SyncMode};
pub use crate::genesis::Genesis;
pub use crate::header::{ChainHeader, Header};
pub use crate::keystore::{KeyStore, ScryptParams};
pub use crate::node::{
    ChainClient, DevClient, DevNode, DevNodeFactory, EmbeddedNode, HeadSink, NodeFactory,
};

/// Default chain identifier
pub const DEFAULT_NETWORK_ID: u64 = 1;

/// Default maximum number of peer connections
pub const DEFAULT_MAX_PEERS: usize = 25;

/// File name of the static peers list inside the data directory
pub const STATIC_NODES_FILE: &str = "static-nodes.json";

/// Scrypt N for light (low resource) keystores
pub const LIGHT_SCRYPT_N: u32 = 1 << 12;

/// Scrypt P for light (low resource) keystores
pub const LIGHT_SCRYPT_P: u32 = 6;

/// Scrypt N for standard keystores
pub const STANDARD_SCRYPT_N: u32 = 1 << 18;

/// Scrypt P for standard keystores
pub const STANDARD_SCRYPT_P: u32 = 1;

/// Gas limit stamped on dev heads
pub const DEV_GAS_LIMIT: u64 = 8_000_000;

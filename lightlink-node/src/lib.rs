// src/lib.rs

//! # Lightlink Node
//!
//! Bridge between a host application and one embedded light client node.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Host (HTTP call bridge)          │
//! ├─────────────────────────────────────────┤
//! │  configure │ start/stop │  subscribe    │
//! │ Translator │ NodeHandle │  HeaderRelay  │
//! ├────────────┴────────────┼───────────────┤
//! │   Embedded light node   │  "NewHead"    │
//! │   (lightlink-client)    │  EventChannel │
//! └─────────────────────────┴───────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod errors;
pub mod config;
pub mod translator;
pub mod node;
pub mod events;
pub mod relay;
pub mod bridge;
pub mod rpc;

// Re-export commonly used types
pub use crate::errors::{BridgeError, ConfigurationError, Result};
pub use crate::config::Settings;
pub use crate::translator::ConfigTranslator;
pub use crate::node::{Lifecycle, NodeHandle};
pub use crate::events::{BridgeEvent, EventChannel, HeaderRecord, NEW_HEAD_EVENT};
pub use crate::relay::HeaderRelay;
pub use crate::bridge::Bridge;
pub use crate::rpc::RpcServer;

/// Node version
pub const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Node directory under the data root when none is configured
pub const DEFAULT_NODE_DIR: &str = ".lightlink";

/// Keystore directory under the data root when none is configured
pub const DEFAULT_KEYSTORE_DIR: &str = "keystore";

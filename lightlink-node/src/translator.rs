// src/translator.rs

//! Translation of untyped configure input into a [`NodeConfiguration`].
//!
//! Recognized options:
//!
//! | Key           | Shape                | Effect                               |
//! |---------------|----------------------|--------------------------------------|
//! | `enodes`      | string               | replaces the static peers list       |
//! | `networkID`   | non-negative integer | chain id                             |
//! | `maxPeers`    | non-negative integer | peer cap                             |
//! | `genesis`     | string               | chain spec JSON                      |
//! | `nodeDir`     | non-empty string     | data directory under the data root   |
//! | `keyStoreDir` | non-empty string     | keystore directory under the data root |
//!
//! Absent and `null` options keep their defaults; unknown keys are ignored.
//! Sync mode is always light.

use crate::config::Settings;
use crate::errors::{ConfigurationError, SettingsError};
use lightlink_client::{NodeConfiguration, SyncMode};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RECOGNIZED: [&str; 6] = ["enodes", "networkID", "maxPeers", "genesis", "nodeDir", "keyStoreDir"];

/// Builds node configurations from host input
#[derive(Clone, Debug)]
pub struct ConfigTranslator {
    /// Root that relative directories resolve under
    data_root: PathBuf,

    /// Default node directory name
    node_dir: String,

    /// Default keystore directory name
    keystore_dir: String,
}

impl ConfigTranslator {
    /// Creates a translator with the built-in directory names
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            node_dir: crate::DEFAULT_NODE_DIR.to_string(),
            keystore_dir: crate::DEFAULT_KEYSTORE_DIR.to_string(),
        }
    }

    /// Creates a translator from service settings
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            data_root: settings.resolve_data_root()?,
            node_dir: settings.node_dir.clone(),
            keystore_dir: settings.keystore_dir.clone(),
        })
    }

    /// Data root
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Validates `input` and produces a light-mode configuration.
    ///
    /// Nothing is written to disk here; the static peers file is written by
    /// [`write_static_nodes`] once a node has been built from the result.
    pub fn translate(&self, input: &Value) -> Result<NodeConfiguration, ConfigurationError> {
        let empty = Map::new();
        let options = match input {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => return Err(ConfigurationError::NotAnObject(json_type(other))),
        };

        for key in options.keys().filter(|k| !RECOGNIZED.contains(&k.as_str())) {
            debug!("Ignoring unrecognized option {}", key);
        }

        let mut config = NodeConfiguration {
            sync_mode: SyncMode::Light,
            ..Default::default()
        };

        if let Some(id) = option(options, "networkID") {
            config.network_id = as_integer("networkID", id)?;
        }
        if let Some(peers) = option(options, "maxPeers") {
            let peers = as_integer("maxPeers", peers)?;
            config.max_peers = usize::try_from(peers).map_err(|_| ConfigurationError::InvalidValue {
                option: "maxPeers",
                reason: format!("{} is out of range", peers),
            })?;
        }
        if let Some(genesis) = option(options, "genesis") {
            config.genesis = Some(as_string("genesis", genesis)?.to_string());
        }

        let node_dir = match option(options, "nodeDir") {
            Some(dir) => as_dir_name("nodeDir", dir)?,
            None => self.node_dir.as_str(),
        };
        let keystore_dir = match option(options, "keyStoreDir") {
            Some(dir) => as_dir_name("keyStoreDir", dir)?,
            None => self.keystore_dir.as_str(),
        };
        config.data_dir = self.data_root.join(node_dir);
        config.keystore_dir = self.data_root.join(keystore_dir);

        if let Some(enodes) = option(options, "enodes") {
            config.static_nodes = Some(parse_enodes(as_string("enodes", enodes)?)?);
        }

        Ok(config)
    }
}

/// Writes the static peers file for `config`; a no-op when it carries no
/// static peers list
pub fn write_static_nodes(config: &NodeConfiguration) -> Result<(), ConfigurationError> {
    let Some(peers) = &config.static_nodes else {
        return Ok(());
    };
    fs::create_dir_all(&config.data_dir)?;

    let path = config.static_nodes_path();
    let contents = serde_json::to_string_pretty(peers).map_err(|e| {
        ConfigurationError::InvalidValue {
            option: "enodes",
            reason: e.to_string(),
        }
    })?;
    fs::write(&path, contents)?;

    info!("Wrote {} static peers to {:?}", peers.len(), path);
    Ok(())
}

/// Parses an `enodes` string: a JSON array literal or a comma/whitespace
/// separated list
fn parse_enodes(text: &str) -> Result<Vec<String>, ConfigurationError> {
    let trimmed = text.trim();

    let enodes: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| ConfigurationError::InvalidValue {
            option: "enodes",
            reason: e.to_string(),
        })?
    } else {
        trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };

    for enode in enodes.iter().filter(|e| !e.starts_with("enode://")) {
        warn!("Static peer {} is not an enode URL", enode);
    }

    Ok(enodes)
}

fn option<'a>(options: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    options.get(key).filter(|v| !v.is_null())
}

fn as_integer(option: &'static str, value: &Value) -> Result<u64, ConfigurationError> {
    value.as_u64().ok_or(ConfigurationError::InvalidType {
        option,
        expected: "a non-negative integer",
        found: json_type(value),
    })
}

fn as_string<'a>(option: &'static str, value: &'a Value) -> Result<&'a str, ConfigurationError> {
    value.as_str().ok_or(ConfigurationError::InvalidType {
        option,
        expected: "a string",
        found: json_type(value),
    })
}

fn as_dir_name<'a>(option: &'static str, value: &'a Value) -> Result<&'a str, ConfigurationError> {
    let name = as_string(option, value)?;
    if name.trim().is_empty() {
        return Err(ConfigurationError::InvalidValue {
            option,
            reason: "directory name is empty".to_string(),
        });
    }
    Ok(name)
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

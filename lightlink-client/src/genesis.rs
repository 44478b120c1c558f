// src/genesis.rs

//! Genesis (chain spec) parsing.

use crate::errors::{ClientError, Result};
use crate::DEV_GAS_LIMIT;
use serde::Deserialize;

/// Chain parameters section of a genesis spec
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Chain identifier declared by the spec
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Parsed genesis specification
///
/// Only the fields the light node needs to derive its genesis header are
/// modelled; anything else in the spec (allocations, forks) is ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    /// Chain parameters
    #[serde(default)]
    pub config: ChainParams,

    /// Genesis difficulty as a quantity string
    #[serde(default)]
    pub difficulty: Option<String>,

    /// Genesis gas limit as a quantity string
    #[serde(default)]
    pub gas_limit: Option<String>,

    /// Genesis timestamp as a quantity string
    #[serde(default)]
    pub timestamp: Option<String>,

    /// Extra data
    #[serde(default)]
    pub extra_data: Option<String>,

    /// Hash seed for the genesis header
    #[serde(skip)]
    pub(crate) seed: Vec<u8>,
}

impl Genesis {
    /// Parses a chain spec
    pub fn from_json(spec: &str) -> Result<Self> {
        let mut genesis: Genesis = serde_json::from_str(spec)
            .map_err(|e| ClientError::InvalidGenesis(e.to_string()))?;

        let quantities = [
            ("difficulty", &genesis.difficulty),
            ("gasLimit", &genesis.gas_limit),
            ("timestamp", &genesis.timestamp),
        ];
        for (field, value) in quantities {
            if let Some(value) = value {
                parse_quantity(value).ok_or_else(|| {
                    ClientError::InvalidGenesis(format!("bad {} {}", field, value))
                })?;
            }
        }

        genesis.seed = spec.as_bytes().to_vec();
        Ok(genesis)
    }

    /// Embedded default chain for a network id
    pub fn default_for(network_id: u64) -> Self {
        Self {
            config: ChainParams {
                chain_id: Some(network_id),
            },
            difficulty: Some("0x1".to_string()),
            gas_limit: Some(format!("{:#x}", DEV_GAS_LIMIT)),
            timestamp: Some("0x0".to_string()),
            extra_data: None,
            seed: format!("lightlink-default-genesis-{}", network_id).into_bytes(),
        }
    }

    /// Genesis difficulty, 1 when unset
    pub fn difficulty(&self) -> u64 {
        self.difficulty.as_deref().and_then(parse_quantity).unwrap_or(1)
    }

    /// Gas limit, falling back to the dev default
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
            .as_deref()
            .and_then(parse_quantity)
            .unwrap_or(DEV_GAS_LIMIT)
    }

    /// Genesis timestamp in seconds
    pub fn timestamp(&self) -> u64 {
        self.timestamp.as_deref().and_then(parse_quantity).unwrap_or(0)
    }
}

/// Parses a `0x` hex or decimal quantity
pub(crate) fn parse_quantity(value: &str) -> Option<u64> {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) if hex.is_empty() => Some(0),
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genesis() {
        let genesis = Genesis::from_json(
            r#"{"config":{"chainId":3},"gasLimit":"0x47b760","timestamp":"0x10","alloc":{}}"#,
        )
        .unwrap();

        assert_eq!(genesis.config.chain_id, Some(3));
        assert_eq!(genesis.gas_limit(), 0x47b760);
        assert_eq!(genesis.timestamp(), 16);
    }

    #[test]
    fn test_malformed_genesis() {
        assert!(matches!(
            Genesis::from_json("{not json"),
            Err(ClientError::InvalidGenesis(_))
        ));
        assert!(Genesis::from_json("[1, 2]").is_err());
        assert!(Genesis::from_json(r#"{"gasLimit":"0xzz"}"#).is_err());
        assert!(Genesis::from_json(r#"{"difficulty":"lots"}"#).is_err());
        assert!(Genesis::from_json(r#"{"timestamp":"0x1ffffffffffffffff"}"#).is_err());
    }

    #[test]
    fn test_default_genesis() {
        let genesis = Genesis::default_for(3);
        assert_eq!(genesis.config.chain_id, Some(3));
        assert_eq!(genesis.gas_limit(), DEV_GAS_LIMIT);
        assert_eq!(genesis.difficulty(), 1);
        assert_ne!(genesis.seed, Genesis::default_for(1).seed);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x10"), Some(16));
        assert_eq!(parse_quantity("42"), Some(42));
        assert_eq!(parse_quantity("0x"), Some(0));
        assert_eq!(parse_quantity("nope"), None);
    }
}

// src/header.rs

//! Block headers and their canonical JSON encoding.

use crate::errors::Result;
use crate::genesis::Genesis;
use serde::{Serialize, Serializer};

/// 32-byte hash
pub type Hash = [u8; 32];

/// A header delivered through a new-head subscription.
///
/// The bridge never inspects header fields; it only asks for the canonical
/// encoding and relays it.
pub trait ChainHeader: Send + Sync {
    /// Canonical JSON encoding of the header
    fn encode_json(&self) -> Result<String>;
}

/// Block header
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Hash of the parent header
    #[serde(serialize_with = "as_hex_hash")]
    pub parent_hash: Hash,

    /// Hash of the uncle list
    #[serde(rename = "sha3Uncles", serialize_with = "as_hex_hash")]
    pub uncle_hash: Hash,

    /// Beneficiary address
    #[serde(rename = "miner", serialize_with = "as_hex_bytes")]
    pub coinbase: [u8; 20],

    /// State trie root
    #[serde(serialize_with = "as_hex_hash")]
    pub state_root: Hash,

    /// Transaction trie root
    #[serde(serialize_with = "as_hex_hash")]
    pub transactions_root: Hash,

    /// Receipt trie root
    #[serde(serialize_with = "as_hex_hash")]
    pub receipts_root: Hash,

    /// Block difficulty
    #[serde(serialize_with = "as_quantity")]
    pub difficulty: u64,

    /// Block number
    #[serde(serialize_with = "as_quantity")]
    pub number: u64,

    /// Gas limit
    #[serde(serialize_with = "as_quantity")]
    pub gas_limit: u64,

    /// Gas used
    #[serde(serialize_with = "as_quantity")]
    pub gas_used: u64,

    /// Unix timestamp in seconds
    #[serde(serialize_with = "as_quantity")]
    pub timestamp: u64,

    /// Extra data
    #[serde(serialize_with = "as_hex_bytes")]
    pub extra_data: Vec<u8>,

    /// Header hash
    #[serde(serialize_with = "as_hex_hash")]
    pub hash: Hash,
}

impl Header {
    /// Builds the genesis header for a chain spec
    pub fn genesis(genesis: &Genesis) -> Self {
        let mut header = Self {
            parent_hash: [0u8; 32],
            uncle_hash: blake3::hash(&[]).into(),
            coinbase: [0u8; 20],
            state_root: blake3::hash(&genesis.seed).into(),
            transactions_root: [0u8; 32],
            receipts_root: [0u8; 32],
            difficulty: genesis.difficulty(),
            number: 0,
            gas_limit: genesis.gas_limit(),
            gas_used: 0,
            timestamp: genesis.timestamp(),
            extra_data: genesis
                .extra_data
                .as_deref()
                .and_then(|d| hex::decode(d.trim_start_matches("0x")).ok())
                .unwrap_or_default(),
            hash: [0u8; 32],
        };
        header.hash = header.compute_hash();
        header
    }

    /// Builds the next header on top of `self`.
    ///
    /// The timestamp is at least one second past the parent's, saturating
    /// at `u64::MAX`.
    pub fn child(&self, timestamp: u64) -> Self {
        let mut header = Self {
            parent_hash: self.hash,
            uncle_hash: self.uncle_hash,
            coinbase: self.coinbase,
            state_root: self.state_root,
            transactions_root: [0u8; 32],
            receipts_root: [0u8; 32],
            difficulty: self.difficulty,
            number: self.number.saturating_add(1),
            gas_limit: self.gas_limit,
            gas_used: 0,
            timestamp: timestamp.max(self.timestamp.saturating_add(1)),
            extra_data: Vec::new(),
            hash: [0u8; 32],
        };
        header.hash = header.compute_hash();
        header
    }

    /// Hashes every field except `hash`
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.parent_hash);
        hasher.update(&self.uncle_hash);
        hasher.update(&self.coinbase);
        hasher.update(&self.state_root);
        hasher.update(&self.transactions_root);
        hasher.update(&self.receipts_root);
        hasher.update(&self.difficulty.to_be_bytes());
        hasher.update(&self.number.to_be_bytes());
        hasher.update(&self.gas_limit.to_be_bytes());
        hasher.update(&self.gas_used.to_be_bytes());
        hasher.update(&self.timestamp.to_be_bytes());
        hasher.update(&self.extra_data);
        hasher.finalize().into()
    }
}

impl ChainHeader for Header {
    fn encode_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn as_hex_hash<S: Serializer>(hash: &Hash, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format!("0x{}", hex::encode(hash)))
}

fn as_hex_bytes<S, B>(bytes: &B, s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    B: AsRef<[u8]>,
{
    s.serialize_str(&format!("0x{}", hex::encode(bytes.as_ref())))
}

fn as_quantity<S: Serializer>(value: &u64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{:#x}", value))
}

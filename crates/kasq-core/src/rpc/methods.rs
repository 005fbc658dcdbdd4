//! Typed descriptors for the node methods kasq issues.
//!
//! Each descriptor names the remote method and pairs it with a request and
//! response record, so consumers get checked field access instead of raw
//! JSON lookups. Values are passed through uninterpreted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A remote method with a known request and response shape.
pub trait RpcMethod {
    const NAME: &'static str;
    type Params: Serialize + Send + Sync;
    type Response: DeserializeOwned;
}

/// Parameters for methods that take none.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoParams {}

// ==============================================================================
// getCoinSupply
// ==============================================================================

pub struct GetCoinSupply;

impl RpcMethod for GetCoinSupply {
    const NAME: &'static str = "getCoinSupply";
    type Params = NoParams;
    type Response = CoinSupply;
}

/// Coin supply in sompi, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSupply {
    #[serde(default, deserialize_with = "u64_from_number_or_string")]
    pub circulating_sompi: u64,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub max_sompi: u64,
}

// ==============================================================================
// getBlockDagInfo
// ==============================================================================

pub struct GetBlockDagInfo;

impl RpcMethod for GetBlockDagInfo {
    const NAME: &'static str = "getBlockDagInfo";
    type Params = NoParams;
    type Response = BlockDagInfo;
}

/// Global BlockDAG state of the serving node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDagInfo {
    pub network: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub block_count: u64,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub header_count: u64,
    #[serde(default)]
    pub tip_hashes: Vec<String>,
    pub difficulty: f64,
    /// Milliseconds since the Unix epoch.
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub past_median_time: u64,
    #[serde(default)]
    pub virtual_parent_hashes: Vec<String>,
    pub pruning_point_hash: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub virtual_daa_score: u64,
    #[serde(default)]
    pub sink: Option<String>,
}

// ==============================================================================
// getInfo
// ==============================================================================

pub struct GetInfo;

impl RpcMethod for GetInfo {
    const NAME: &'static str = "getInfo";
    type Params = NoParams;
    type Response = NodeInfo;
}

/// Identity and sync state of the serving node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub p2p_id: String,
    #[serde(deserialize_with = "u64_from_number_or_string")]
    pub mempool_size: u64,
    pub server_version: String,
    pub is_utxo_indexed: bool,
    pub is_synced: bool,
    #[serde(default)]
    pub has_notify_command: bool,
    #[serde(default)]
    pub has_message_id: bool,
}

// Some node transports encode 64-bit integers as decimal strings.
fn u64_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid integer `{s}`: {e}"))),
    }
}

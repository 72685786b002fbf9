//! Type definitions for fetched chain data.
//!
//! These are read-only snapshots of what the RPC returned for a single
//! transaction. Decoding never mutates them.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Chains the decoder knows how to reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet.
    Eth,
    /// BNB Smart Chain mainnet.
    Bsc,
}

impl Network {
    /// Symbol of the chain's native asset.
    pub fn native_symbol(self) -> &'static str {
        match self {
            Network::Eth => "ETH",
            Network::Bsc => "BNB",
        }
    }

    /// Decimal count of the native asset. Both supported chains use 18.
    pub fn native_decimals(self) -> u8 {
        18
    }

    /// Environment variable that overrides the RPC endpoint.
    pub fn rpc_url_env(self) -> &'static str {
        match self {
            Network::Eth => "AA_ETH_RPC_URL",
            Network::Bsc => "AA_BSC_RPC_URL",
        }
    }

    /// Public endpoint used when no override is configured.
    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Eth => "https://ethereum-rpc.publicnode.com",
            Network::Bsc => "https://bsc-dataseed1.binance.org/",
        }
    }

    /// Resolves the RPC endpoint: explicit value, then env, then default.
    pub fn rpc_url(self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(self.rpc_url_env()).ok())
            .unwrap_or_else(|| self.default_rpc_url().to_string())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Eth => f.write_str("ETH"),
            Network::Bsc => f.write_str("BSC"),
        }
    }
}

impl FromStr for Network {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eth" | "ethereum" | "mainnet" => Ok(Network::Eth),
            "bsc" | "bnb" => Ok(Network::Bsc),
            other => Err(eyre::eyre!("unsupported network '{other}', expected eth or bsc")),
        }
    }
}

/// A transaction as returned by `eth_getTransactionByHash`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Sender (the bundler for EntryPoint calls).
    pub from: Address,
    /// Recipient (None for contract creation).
    pub to: Option<Address>,
    /// Native value attached to the call, in wei.
    pub value: U256,
    /// Call input.
    pub input: Bytes,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price in wei (max fee per gas for dynamic-fee txs).
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Containing block (None while pending).
    pub block_number: Option<u64>,
}

/// A receipt as returned by `eth_getTransactionReceipt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainReceipt {
    /// Execution status (true = success).
    pub status: bool,
    /// Gas used by the transaction.
    pub gas_used: u64,
    /// Containing block.
    pub block_number: Option<u64>,
    /// Emitted logs in order.
    pub logs: Vec<TxLog>,
}

/// One event log from a receipt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TxLog {
    /// Address of the contract that emitted the log.
    pub address: Address,
    /// Topics; topic 0 is the event signature hash for non-anonymous events.
    pub topics: Vec<B256>,
    /// Non-indexed log data.
    pub data: Bytes,
    /// Log index within the block, if the node reported it.
    pub log_index: Option<u64>,
}

impl TxLog {
    /// Event signature topic, if present.
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Token metadata as read from the token contract.
///
/// Each field is independently optional: a token may answer `decimals()`
/// but revert on `symbol()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// `symbol()` result.
    pub symbol: Option<String>,
    /// `decimals()` result.
    pub decimals: Option<u8>,
}

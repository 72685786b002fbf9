//! The provider capability the analyzer depends on.
//!
//! Everything the decoder needs from the network goes through [`ChainReader`],
//! so the decoding pipeline can run against an RPC node or an in-memory
//! fixture without change.

use std::future::Future;

use alloy::primitives::{Address, B256};
use eyre::Result;

use crate::types::{ChainReceipt, ChainTransaction};

/// Read-only access to transactions, receipts, blocks and token metadata.
///
/// `Ok(None)` means the node answered but does not know the object;
/// `Err` is a transport or decoding failure.
pub trait ChainReader: Send + Sync {
    /// `eth_getTransactionByHash`.
    fn transaction(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<ChainTransaction>>> + Send;

    /// `eth_getTransactionReceipt`.
    fn receipt(&self, hash: B256) -> impl Future<Output = Result<Option<ChainReceipt>>> + Send;

    /// Timestamp (unix seconds) of block `number`.
    fn block_timestamp(&self, number: u64) -> impl Future<Output = Result<Option<u64>>> + Send;

    /// `symbol()` on a token contract.
    fn token_symbol(&self, token: Address) -> impl Future<Output = Result<String>> + Send;

    /// `decimals()` on a token contract.
    fn token_decimals(&self, token: Address) -> impl Future<Output = Result<u8>> + Send;
}

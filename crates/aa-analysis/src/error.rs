//! Terminal failures of a transaction decode.
//!
//! Each variant is one of the outer conditions a caller can act on. Inner
//! per-call and per-log failures never surface here; they degrade to a
//! fallback value in the report.

use aa_data::Network;
use aa_decode::DecodeError;
use alloy::primitives::B256;

#[derive(Debug, thiserror::Error)]
pub enum AaError {
    /// The node does not know the transaction.
    #[error("transaction {hash} not found on {network}")]
    NotFound { hash: B256, network: Network },

    /// The transaction has no block number and no receipt.
    #[error("transaction {hash} on {network} is pending")]
    Pending { hash: B256, network: Network },

    /// Mined, but the receipt could not be fetched after one retry.
    #[error(
        "receipt for {hash} (block {block}) unavailable on {network}; \
         the endpoint may be serving a different network"
    )]
    ReceiptUnavailable {
        hash: B256,
        network: Network,
        block: u64,
    },

    /// Receipt status is zero.
    #[error("transaction {hash} reverted in block {} on {network}", display_block(*.block))]
    Reverted {
        hash: B256,
        network: Network,
        block: Option<u64>,
    },

    /// The transaction input is not an EntryPoint `handleOps` call.
    #[error("transaction {hash} on {network} is not an EntryPoint call: {source}")]
    NotAnEntryPointCall {
        hash: B256,
        network: Network,
        block: Option<u64>,
        #[source]
        source: DecodeError,
    },

    /// The transaction fetch itself failed at the transport level.
    #[error("failed to fetch transaction {hash} from {network}")]
    Provider {
        hash: B256,
        network: Network,
        #[source]
        source: eyre::Report,
    },
}

impl AaError {
    /// Hash of the transaction that failed to decode.
    pub fn hash(&self) -> B256 {
        match self {
            AaError::NotFound { hash, .. }
            | AaError::Pending { hash, .. }
            | AaError::ReceiptUnavailable { hash, .. }
            | AaError::Reverted { hash, .. }
            | AaError::NotAnEntryPointCall { hash, .. }
            | AaError::Provider { hash, .. } => *hash,
        }
    }

    /// Block number, where known.
    pub fn block(&self) -> Option<u64> {
        match self {
            AaError::ReceiptUnavailable { block, .. } => Some(*block),
            AaError::Reverted { block, .. }
            | AaError::NotAnEntryPointCall { block, .. } => *block,
            _ => None,
        }
    }

    /// Short machine-readable label.
    pub fn kind(&self) -> &'static str {
        match self {
            AaError::NotFound { .. } => "NOT_FOUND",
            AaError::Pending { .. } => "PENDING",
            AaError::ReceiptUnavailable { .. } => "RECEIPT_UNAVAILABLE",
            AaError::Reverted { .. } => "REVERTED",
            AaError::NotAnEntryPointCall { .. } => "NOT_AN_ENTRY_POINT_CALL",
            AaError::Provider { .. } => "PROVIDER",
        }
    }
}

fn display_block(block: Option<u64>) -> String {
    block.map_or_else(|| "unknown".to_string(), |b| b.to_string())
}

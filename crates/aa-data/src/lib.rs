//! aa-data crate
//!
//! Chain snapshots and the provider capability used by the decoder.

pub mod reader;
pub mod rpc;
pub mod types;

pub use reader::ChainReader;
pub use rpc::RpcReader;
pub use types::{ChainReceipt, ChainTransaction, Network, TokenMetadata, TxLog};

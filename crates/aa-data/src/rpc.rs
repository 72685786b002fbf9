//! Alloy RPC provider integration for fetching transactions, receipts and
//! token metadata.
//!
//! Maps Alloy RPC types onto the snapshot types in [`crate::types`].

use alloy::consensus::Transaction as ConsensusTx;
use alloy::network::{Ethereum, TransactionResponse};
use alloy::primitives::{Address, B256};
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::eth::{BlockId, BlockNumberOrTag};
use alloy::sol;
use eyre::{Context, Result};
use std::sync::Arc;

use crate::reader::ChainReader;
use crate::types::{ChainReceipt, ChainTransaction, Network, TxLog};

sol! {
    #[sol(rpc)]
    interface IERC20Metadata {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }
}

type ProviderType = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider<Ethereum>,
>;

/// [`ChainReader`] backed by a JSON-RPC endpoint.
#[derive(Clone)]
pub struct RpcReader {
    provider: Arc<ProviderType>,
    network: Network,
}

impl RpcReader {
    /// Creates a reader for `network` at `rpc_url`.
    ///
    /// No request is sent until the first fetch.
    ///
    /// # Errors
    /// Returns error if the URL cannot be parsed.
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url, network = %network))]
    pub fn new(rpc_url: &str, network: Network) -> Result<Self> {
        let provider =
            ProviderBuilder::new().on_http(rpc_url.parse().wrap_err("invalid RPC URL format")?);
        tracing::debug!("RPC provider configured");
        Ok(Self {
            provider: Arc::new(provider),
            network,
        })
    }

    /// Network this reader talks to.
    pub fn network(&self) -> Network {
        self.network
    }
}

impl ChainReader for RpcReader {
    #[tracing::instrument(skip(self), fields(network = %self.network))]
    async fn transaction(&self, hash: B256) -> Result<Option<ChainTransaction>> {
        let tx = self
            .provider
            .get_transaction_by_hash(hash)
            .await
            .wrap_err_with(|| format!("failed to fetch transaction {hash}"))?;

        Ok(tx.map(|tx| ChainTransaction {
            hash: TransactionResponse::tx_hash(&tx),
            from: TransactionResponse::from(&tx),
            to: ConsensusTx::to(&tx),
            value: ConsensusTx::value(&tx),
            input: ConsensusTx::input(&tx).clone(),
            nonce: ConsensusTx::nonce(&tx),
            gas_price: ConsensusTx::gas_price(&tx)
                .unwrap_or_else(|| ConsensusTx::max_fee_per_gas(&tx)),
            gas_limit: ConsensusTx::gas_limit(&tx),
            block_number: tx.block_number,
        }))
    }

    #[tracing::instrument(skip(self), fields(network = %self.network))]
    async fn receipt(&self, hash: B256) -> Result<Option<ChainReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .wrap_err_with(|| format!("failed to fetch receipt {hash}"))?;

        Ok(receipt.map(|receipt| ChainReceipt {
            status: receipt.status(),
            gas_used: receipt.gas_used,
            block_number: receipt.block_number,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| TxLog {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.inner.data.data.clone(),
                    log_index: log.log_index,
                })
                .collect(),
        }))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<u64>> {
        let block = self
            .provider
            .get_block(BlockId::Number(BlockNumberOrTag::Number(number)))
            .await
            .wrap_err_with(|| format!("failed to fetch block {number}"))?;
        Ok(block.map(|block| block.header.timestamp))
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let contract = IERC20Metadata::new(token, self.provider.clone());
        let symbol = contract
            .symbol()
            .call()
            .await
            .wrap_err_with(|| format!("symbol() failed on {token}"))?;
        Ok(symbol._0)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let contract = IERC20Metadata::new(token, self.provider.clone());
        let decimals = contract
            .decimals()
            .call()
            .await
            .wrap_err_with(|| format!("decimals() failed on {token}"))?;
        Ok(decimals._0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_url() {
        let result = RpcReader::new("not a url", Network::Eth);
        assert!(result.is_err(), "should reject invalid URL");
    }

    #[test]
    fn new_keeps_network() {
        let reader = RpcReader::new("http://localhost:8545", Network::Bsc).unwrap();
        assert_eq!(reader.network(), Network::Bsc);
    }
}

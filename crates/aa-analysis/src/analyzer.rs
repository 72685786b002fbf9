//! Fetch-and-decode pipeline for a single bundle transaction.
//!
//! The transaction and receipt are fetched together. A mined transaction
//! without a receipt gets exactly one retry after
//! [`AnalyzerConfig::receipt_retry_delay`]; an unmined one is reported as
//! pending straight away. Everything after the receipt check is pure
//! decoding plus best-effort metadata reads.

use std::time::Duration;

use aa_data::{ChainReader, ChainReceipt, ChainTransaction, Network};
use aa_decode::{extract_user_operations, CallResolver, DecodeError, DEFAULT_MAX_DEPTH};
use alloy::primitives::{address, Address, B256};

use crate::error::AaError;
use crate::events::extract_entry_point_events;
use crate::metadata::TokenMetadataCache;
use crate::report::AaTransactionResult;
use crate::transfers::{call_data_transfers, log_transfers, native_value_transfer, TokenId};

/// Canonical EntryPoint deployments and their release labels.
pub const KNOWN_ENTRY_POINTS: &[(Address, &str)] = &[
    (address!("0576a174D229E3cFA37253523E645A78A0C91B57"), "v0.5"),
    (address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"), "v0.6"),
    (address!("0000000071727De22E5E9d8BAf0edAc6f37da032"), "v0.7"),
];

/// Release label of a canonical EntryPoint address.
pub fn known_entry_point(address: Address) -> Option<&'static str> {
    KNOWN_ENTRY_POINTS
        .iter()
        .find(|(known, _)| *known == address)
        .map(|(_, label)| *label)
}

/// Analyzer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Wait before the single receipt retry.
    pub receipt_retry_delay: Duration,
    /// Call-data nesting ceiling.
    pub max_call_depth: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            receipt_retry_delay: Duration::from_secs(1),
            max_call_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Decodes ERC-4337 bundle transactions fetched through a [`ChainReader`].
pub struct AaAnalyzer<R> {
    reader: R,
    network: Network,
    config: AnalyzerConfig,
    resolver: CallResolver,
    metadata: TokenMetadataCache,
}

impl<R: ChainReader> AaAnalyzer<R> {
    pub fn new(reader: R, network: Network) -> Self {
        Self::with_config(reader, network, AnalyzerConfig::default())
    }

    pub fn with_config(reader: R, network: Network, config: AnalyzerConfig) -> Self {
        Self {
            reader,
            network,
            resolver: CallResolver::new(config.max_call_depth),
            config,
            metadata: TokenMetadataCache::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Fetches and decodes `hash`.
    ///
    /// # Errors
    /// One [`AaError`] per terminal condition; inner decode failures never
    /// abort the report.
    #[tracing::instrument(skip(self), fields(network = %self.network))]
    pub async fn decode(&self, hash: B256) -> Result<AaTransactionResult, AaError> {
        let (tx, receipt) = tokio::join!(self.reader.transaction(hash), self.reader.receipt(hash));

        let tx = tx
            .map_err(|source| AaError::Provider {
                hash,
                network: self.network,
                source,
            })?
            .ok_or(AaError::NotFound {
                hash,
                network: self.network,
            })?;

        let receipt = match self.receipt_or_none(hash, receipt) {
            Some(receipt) => receipt,
            None => self.retry_receipt(&tx).await?,
        };

        let block_number = receipt.block_number.or(tx.block_number);
        if !receipt.status {
            return Err(AaError::Reverted {
                hash,
                network: self.network,
                block: block_number,
            });
        }

        self.build(tx, receipt, block_number).await
    }

    /// A receipt fetch error counts as "no receipt yet".
    fn receipt_or_none(
        &self,
        hash: B256,
        receipt: eyre::Result<Option<ChainReceipt>>,
    ) -> Option<ChainReceipt> {
        receipt
            .map_err(|err| tracing::debug!(%hash, error = %err, "receipt fetch failed"))
            .ok()
            .flatten()
    }

    async fn retry_receipt(&self, tx: &ChainTransaction) -> Result<ChainReceipt, AaError> {
        let Some(block) = tx.block_number else {
            return Err(AaError::Pending {
                hash: tx.hash,
                network: self.network,
            });
        };

        tracing::warn!(
            hash = %tx.hash,
            block,
            delay_ms = self.config.receipt_retry_delay.as_millis() as u64,
            "transaction is mined but receipt is missing, retrying once"
        );
        tokio::time::sleep(self.config.receipt_retry_delay).await;

        let receipt = self.reader.receipt(tx.hash).await;
        self.receipt_or_none(tx.hash, receipt)
            .ok_or(AaError::ReceiptUnavailable {
                hash: tx.hash,
                network: self.network,
                block,
            })
    }

    async fn build(
        &self,
        tx: ChainTransaction,
        receipt: ChainReceipt,
        block_number: Option<u64>,
    ) -> Result<AaTransactionResult, AaError> {
        let not_entry_point = |source: DecodeError| AaError::NotAnEntryPointCall {
            hash: tx.hash,
            network: self.network,
            block: block_number,
            source,
        };

        let entry_point = tx.to.ok_or_else(|| {
            not_entry_point(DecodeError::NotAnEntryPointCall {
                selector: None,
                reason: "contract creation has no EntryPoint recipient".to_string(),
            })
        })?;
        let handle_ops =
            extract_user_operations(&tx.input, &self.resolver).map_err(not_entry_point)?;

        let known = known_entry_point(entry_point);
        if known.is_none() {
            tracing::debug!(%entry_point, "recipient is not a canonical EntryPoint");
        }

        let events = extract_entry_point_events(&receipt.logs, entry_point);

        let mut pending: Vec<_> = native_value_transfer(tx.from, tx.to, tx.value)
            .into_iter()
            .collect();
        pending.extend(log_transfers(&receipt.logs));
        for op in &handle_ops.ops {
            pending.extend(call_data_transfers(op));
        }

        let tokens: Vec<Address> = pending.iter().filter_map(|t| t.token.contract()).collect();
        let (timestamp, ()) = tokio::join!(
            self.block_timestamp(block_number),
            self.metadata.prefetch(&self.reader, tokens)
        );

        let transfers = pending
            .into_iter()
            .map(|transfer| {
                let metadata = match transfer.token {
                    TokenId::Contract(token) => self.metadata.get(token),
                    TokenId::Native => Default::default(),
                };
                transfer.complete(self.network, &metadata)
            })
            .collect::<Vec<_>>();

        let mut contract_interactions = Vec::new();
        for log in &receipt.logs {
            if !contract_interactions.contains(&log.address) {
                contract_interactions.push(log.address);
            }
        }

        tracing::info!(
            hash = %tx.hash,
            user_operations = handle_ops.ops.len(),
            events = events.len(),
            transfers = transfers.len(),
            "decoded bundle"
        );

        Ok(AaTransactionResult {
            hash: tx.hash,
            network: self.network,
            entry_point,
            known_entry_point: known,
            entry_point_version: handle_ops.version,
            bundler: tx.from,
            beneficiary: handle_ops.beneficiary,
            block_number,
            timestamp,
            gas_used: receipt.gas_used,
            gas_price: tx.gas_price,
            value: tx.value,
            user_operations: handle_ops.ops,
            events,
            transfers,
            contract_interactions,
        })
    }

    async fn block_timestamp(&self, block_number: Option<u64>) -> Option<u64> {
        let number = block_number?;
        match self.reader.block_timestamp(number).await {
            Ok(timestamp) => timestamp,
            Err(err) => {
                tracing::debug!(block = number, error = %err, "block timestamp unavailable");
                None
            }
        }
    }
}

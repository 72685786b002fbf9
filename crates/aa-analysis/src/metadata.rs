//! Best-effort token metadata lookups.
//!
//! `symbol()` and `decimals()` are fetched once per token address and kept
//! for the lifetime of a [`TokenMetadataCache`]. Distinct addresses are
//! fetched concurrently. Only answers are cached: a failed call leaves that
//! field unset for the current decode and is attempted again by the next
//! prefetch. Failures never surface as errors.

use std::collections::BTreeMap;

use aa_data::{ChainReader, TokenMetadata};
use alloy::primitives::Address;
use dashmap::DashMap;
use futures::future::join_all;

/// Symbol reported when `symbol()` is unavailable.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Per-address metadata, shared across concurrent fetches.
#[derive(Debug, Default)]
pub struct TokenMetadataCache {
    entries: DashMap<Address, TokenMetadata>,
}

impl TokenMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `token`; fields never fetched successfully are
    /// `None`.
    pub fn get(&self, token: Address) -> TokenMetadata {
        self.entries
            .get(&token)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of tokens with at least one cached field.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetches the missing fields of every token in `tokens`.
    ///
    /// Duplicate addresses are fetched once; fields already cached are not
    /// fetched again.
    pub async fn prefetch<R, I>(&self, reader: &R, tokens: I)
    where
        R: ChainReader,
        I: IntoIterator<Item = Address>,
    {
        let missing: BTreeMap<Address, TokenMetadata> = tokens
            .into_iter()
            .map(|token| (token, self.get(token)))
            .filter(|(_, cached)| cached.symbol.is_none() || cached.decimals.is_none())
            .collect();
        if missing.is_empty() {
            return;
        }

        tracing::debug!(tokens = missing.len(), "fetching token metadata");
        let fetched = join_all(missing.into_iter().map(|(token, cached)| async move {
            (token, fetch_missing(reader, token, cached).await)
        }))
        .await;

        for (token, metadata) in fetched {
            if metadata.symbol.is_none() && metadata.decimals.is_none() {
                continue;
            }
            let mut entry = self.entries.entry(token).or_default();
            entry.symbol = entry.symbol.take().or(metadata.symbol);
            entry.decimals = entry.decimals.or(metadata.decimals);
        }
    }
}

/// Fills the `None` fields of `cached` from the token contract.
async fn fetch_missing<R: ChainReader>(
    reader: &R,
    token: Address,
    cached: TokenMetadata,
) -> TokenMetadata {
    let TokenMetadata { symbol, decimals } = cached;
    let symbol = async move {
        match symbol {
            Some(symbol) => Some(symbol),
            None => reader
                .token_symbol(token)
                .await
                .map_err(|err| tracing::debug!(%token, error = %err, "symbol() unavailable"))
                .ok(),
        }
    };
    let decimals = async move {
        match decimals {
            Some(decimals) => Some(decimals),
            None => reader
                .token_decimals(token)
                .await
                .map_err(|err| tracing::debug!(%token, error = %err, "decimals() unavailable"))
                .ok(),
        }
    };

    let (symbol, decimals) = tokio::join!(symbol, decimals);
    TokenMetadata { symbol, decimals }
}

//! Transfer records from native value, ERC-20 `Transfer` logs and decoded
//! call data.
//!
//! The three sources are collected independently and are not de-duplicated
//! against each other: a token transfer usually appears both as a log and as
//! a call-data leaf. Records are first gathered as [`PendingTransfer`]s, then
//! completed with token metadata once every token address is known, so each
//! address is looked up once.

use std::fmt;

use aa_data::{Network, TokenMetadata, TxLog};
use aa_decode::abi::token::IERC20;
use aa_decode::normalize::{
    format_units, ToValue, Value, DEFAULT_TOKEN_DECIMALS, STABLECOIN_FALLBACK_DECIMALS,
};
use aa_decode::{DecodedCall, ParsedUserOperation};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolEvent;

use crate::metadata::UNKNOWN_SYMBOL;

/// What was transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenId {
    /// The chain's native asset.
    Native,
    /// A token contract.
    Contract(Address),
}

impl TokenId {
    pub fn contract(self) -> Option<Address> {
        match self {
            TokenId::Native => None,
            TokenId::Contract(address) => Some(address),
        }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenId::Native => f.write_str("native"),
            TokenId::Contract(address) => write!(f, "{address}"),
        }
    }
}

/// Where a transfer record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSource {
    /// `value` on the outer transaction or on a routed inner call.
    NativeValue,
    /// An ERC-20 `Transfer` log.
    EventLog,
    /// An ERC-20 `transfer`/`transferFrom` leaf in user operation call data.
    CallData,
}

impl TransferSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferSource::NativeValue => "native",
            TransferSource::EventLog => "event_log",
            TransferSource::CallData => "call_data",
        }
    }

    /// Decimals assumed for a token whose `decimals()` is unavailable.
    pub fn fallback_decimals(self) -> u8 {
        match self {
            TransferSource::CallData => STABLECOIN_FALLBACK_DECIMALS,
            TransferSource::NativeValue | TransferSource::EventLog => DEFAULT_TOKEN_DECIMALS,
        }
    }
}

/// Where `decimals` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalsSource {
    /// Read from the token's `decimals()`.
    Fetched,
    /// Assumed after `decimals()` failed.
    Default,
    /// The network's native asset; nothing to fetch.
    Native,
}

impl DecimalsSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DecimalsSource::Fetched => "fetched",
            DecimalsSource::Default => "default",
            DecimalsSource::Native => "native",
        }
    }
}

/// A single ERC-20 transfer decoded from a receipt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    /// ERC-20 contract address (the log emitter).
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub log_index: Option<u64>,
}

/// Parses an ERC-20 `Transfer(address,address,uint256)` log.
///
/// Requires exactly three topics (ERC-721 `Transfer` has four) and at least
/// one data word. Addresses are the low 20 bytes of topics 1 and 2.
pub fn parse_transfer_log(log: &TxLog) -> Option<TokenTransfer> {
    if log.topic0()? != IERC20::Transfer::SIGNATURE_HASH || log.topics.len() != 3 {
        return None;
    }
    if log.data.len() < 32 {
        return None;
    }

    Some(TokenTransfer {
        token: log.address,
        from: Address::from_word(log.topics[1]),
        to: Address::from_word(log.topics[2]),
        amount: U256::from_be_slice(&log.data[..32]),
        log_index: log.log_index,
    })
}

/// A transfer whose token metadata has not been attached yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransfer {
    pub source: TransferSource,
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

impl PendingTransfer {
    /// Attaches metadata. Native transfers use the network's asset;
    /// contract transfers fall back to [`UNKNOWN_SYMBOL`] and the source's
    /// fallback decimals.
    pub fn complete(self, network: Network, metadata: &TokenMetadata) -> TransferRecord {
        let (symbol, decimals, decimals_source) = match self.token {
            TokenId::Native => (
                network.native_symbol().to_string(),
                network.native_decimals(),
                DecimalsSource::Native,
            ),
            TokenId::Contract(_) => {
                let symbol = metadata
                    .symbol
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string());
                match metadata.decimals {
                    Some(decimals) => (symbol, decimals, DecimalsSource::Fetched),
                    None => (
                        symbol,
                        self.source.fallback_decimals(),
                        DecimalsSource::Default,
                    ),
                }
            }
        };

        TransferRecord {
            source: self.source,
            token: self.token,
            from: self.from,
            to: self.to,
            amount: self.amount,
            symbol,
            decimals,
            decimals_source,
        }
    }
}

/// A transfer with token metadata attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub source: TransferSource,
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
    pub symbol: String,
    pub decimals: u8,
    pub decimals_source: DecimalsSource,
}

impl TransferRecord {
    /// Amount scaled by `decimals`.
    pub fn formatted_amount(&self) -> String {
        format_units(self.amount, self.decimals)
    }
}

impl ToValue for TransferRecord {
    fn to_value(&self) -> Value {
        Value::map([
            ("source", self.source.as_str().into()),
            ("token", self.token.to_string().into()),
            ("from", self.from.into()),
            ("to", self.to.into()),
            ("amount", self.amount.into()),
            ("formattedAmount", self.formatted_amount().into()),
            ("symbol", self.symbol.as_str().into()),
            ("decimals", self.decimals.into()),
            ("decimalsSource", self.decimals_source.as_str().into()),
        ])
    }
}

/// Native value attached to the outer transaction.
pub fn native_value_transfer(
    from: Address,
    to: Option<Address>,
    value: U256,
) -> Option<PendingTransfer> {
    let to = to?;
    (!value.is_zero()).then_some(PendingTransfer {
        source: TransferSource::NativeValue,
        token: TokenId::Native,
        from,
        to,
        amount: value,
    })
}

/// ERC-20 transfers found in receipt logs, in log order.
pub fn log_transfers(logs: &[TxLog]) -> Vec<PendingTransfer> {
    logs.iter()
        .filter_map(parse_transfer_log)
        .map(|transfer| PendingTransfer {
            source: TransferSource::EventLog,
            token: TokenId::Contract(transfer.token),
            from: transfer.from,
            to: transfer.to,
            amount: transfer.amount,
        })
        .collect()
}

/// Transfers implied by the decoded call data of one user operation.
///
/// The operation's call data executes on its sender. Each routed inner call
/// is made by the account that executed the wrapper; a `multicall` element
/// (no explicit target) calls that same account. A non-zero inner value is a
/// native transfer; an ERC-20 leaf is a transfer of the token it was sent to.
pub fn call_data_transfers(op: &ParsedUserOperation) -> Vec<PendingTransfer> {
    let mut out = Vec::new();
    walk(&op.decoded_call_data, op.op.sender, &mut out);
    out
}

/// Records transfers made by `executor` while running `decoded`.
fn walk(decoded: &DecodedCall, executor: Address, out: &mut Vec<PendingTransfer>) {
    let DecodedCall::RoutedCall(routed) = decoded else {
        return;
    };

    for inner in &routed.calls {
        let target = inner.target.unwrap_or(executor);
        if !inner.value.is_zero() {
            out.push(PendingTransfer {
                source: TransferSource::NativeValue,
                token: TokenId::Native,
                from: executor,
                to: target,
                amount: inner.value,
            });
        }

        match &inner.decoded {
            DecodedCall::Erc20Transfer { to, amount } => out.push(PendingTransfer {
                source: TransferSource::CallData,
                token: TokenId::Contract(target),
                from: executor,
                to: *to,
                amount: *amount,
            }),
            DecodedCall::Erc20TransferFrom { from, to, amount } => out.push(PendingTransfer {
                source: TransferSource::CallData,
                token: TokenId::Contract(target),
                from: *from,
                to: *to,
                amount: *amount,
            }),
            nested @ DecodedCall::RoutedCall(_) => walk(nested, target, out),
            _ => {}
        }
    }
}

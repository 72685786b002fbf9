//! The decoded view of one bundle transaction.

use aa_data::Network;
use aa_decode::normalize::{format_gwei, format_units, ToValue, Value};
use aa_decode::{EntryPointVersion, ParsedUserOperation};
use alloy::primitives::{Address, B256, U256};

use crate::events::EntryPointEvent;
use crate::transfers::TransferRecord;

/// Everything decoded from a `handleOps` transaction and its receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AaTransactionResult {
    pub hash: B256,
    pub network: Network,
    /// Transaction recipient.
    pub entry_point: Address,
    /// Release label if `entry_point` is a canonical EntryPoint deployment.
    pub known_entry_point: Option<&'static str>,
    pub entry_point_version: EntryPointVersion,
    /// Transaction sender.
    pub bundler: Address,
    pub beneficiary: Address,
    pub block_number: Option<u64>,
    /// Block timestamp in unix seconds, if the block could be fetched.
    pub timestamp: Option<u64>,
    pub gas_used: u64,
    pub gas_price: u128,
    pub value: U256,
    pub user_operations: Vec<ParsedUserOperation>,
    pub events: Vec<EntryPointEvent>,
    pub transfers: Vec<TransferRecord>,
    /// Distinct log emitters in first-seen order.
    pub contract_interactions: Vec<Address>,
}

impl AaTransactionResult {
    /// Gas used times gas price, in wei.
    pub fn fee(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.gas_price)
    }
}

impl ToValue for AaTransactionResult {
    fn to_value(&self) -> Value {
        let native_decimals = self.network.native_decimals();
        Value::map([
            ("transactionHash", self.hash.into()),
            ("network", self.network.to_string().into()),
            ("entryPoint", self.entry_point.into()),
            ("knownEntryPoint", self.known_entry_point.into()),
            ("entryPointVersion", self.entry_point_version.as_str().into()),
            ("bundler", self.bundler.into()),
            ("beneficiary", self.beneficiary.into()),
            ("blockNumber", self.block_number.into()),
            ("timestamp", self.timestamp.into()),
            ("gasUsed", U256::from(self.gas_used).into()),
            ("gasPrice", U256::from(self.gas_price).into()),
            ("gasPriceGwei", format_gwei(U256::from(self.gas_price)).into()),
            ("fee", self.fee().into()),
            ("feeFormatted", format_units(self.fee(), native_decimals).into()),
            ("value", self.value.into()),
            ("nativeSymbol", self.network.native_symbol().into()),
            ("userOperationCount", self.user_operations.len().into()),
            (
                "userOperations",
                Value::Seq(self.user_operations.iter().map(ToValue::to_value).collect()),
            ),
            (
                "events",
                Value::Seq(self.events.iter().map(ToValue::to_value).collect()),
            ),
            (
                "transfers",
                Value::Seq(self.transfers.iter().map(ToValue::to_value).collect()),
            ),
            ("contractInteractions", self.contract_interactions.clone().into()),
        ])
    }
}

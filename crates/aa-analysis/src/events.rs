//! EntryPoint event decoding from receipt logs.
//!
//! Only logs emitted by the EntryPoint itself are considered. A log that
//! fails to decode is dropped; the rest of the receipt is still processed.

use aa_data::TxLog;
use aa_decode::abi::entry_point::IEntryPoint;
use aa_decode::normalize::{ToValue, Value};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolEvent;

/// A decoded EntryPoint event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPointEvent {
    UserOperation {
        user_op_hash: B256,
        sender: Address,
        paymaster: Address,
        nonce: U256,
        success: bool,
        actual_gas_cost: U256,
        actual_gas_used: U256,
    },
    AccountDeployed {
        user_op_hash: B256,
        sender: Address,
        factory: Address,
        paymaster: Address,
    },
    RevertReason {
        user_op_hash: B256,
        sender: Address,
        nonce: U256,
        revert_reason: Bytes,
    },
    BeforeExecution,
}

impl EntryPointEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EntryPointEvent::UserOperation { .. } => "UserOperationEvent",
            EntryPointEvent::AccountDeployed { .. } => "AccountDeployed",
            EntryPointEvent::RevertReason { .. } => "UserOperationRevertReason",
            EntryPointEvent::BeforeExecution => "BeforeExecution",
        }
    }

    /// Decodes one log. `None` if the topic is not an EntryPoint event or the
    /// payload does not parse.
    pub fn from_log(log: &TxLog) -> Option<Self> {
        let topic0 = log.topic0()?;
        let topics = log.topics.iter().copied();
        let data = log.data.as_ref();

        let decoded = if topic0 == IEntryPoint::UserOperationEvent::SIGNATURE_HASH {
            IEntryPoint::UserOperationEvent::decode_raw_log(topics, data, true).map(|e| {
                EntryPointEvent::UserOperation {
                    user_op_hash: e.userOpHash,
                    sender: e.sender,
                    paymaster: e.paymaster,
                    nonce: e.nonce,
                    success: e.success,
                    actual_gas_cost: e.actualGasCost,
                    actual_gas_used: e.actualGasUsed,
                }
            })
        } else if topic0 == IEntryPoint::AccountDeployed::SIGNATURE_HASH {
            IEntryPoint::AccountDeployed::decode_raw_log(topics, data, true).map(|e| {
                EntryPointEvent::AccountDeployed {
                    user_op_hash: e.userOpHash,
                    sender: e.sender,
                    factory: e.factory,
                    paymaster: e.paymaster,
                }
            })
        } else if topic0 == IEntryPoint::UserOperationRevertReason::SIGNATURE_HASH {
            IEntryPoint::UserOperationRevertReason::decode_raw_log(topics, data, true).map(|e| {
                EntryPointEvent::RevertReason {
                    user_op_hash: e.userOpHash,
                    sender: e.sender,
                    nonce: e.nonce,
                    revert_reason: e.revertReason,
                }
            })
        } else if topic0 == IEntryPoint::BeforeExecution::SIGNATURE_HASH {
            return Some(EntryPointEvent::BeforeExecution);
        } else {
            return None;
        };

        match decoded {
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(
                    address = %log.address,
                    log_index = ?log.log_index,
                    error = %err,
                    "dropping undecodable EntryPoint log"
                );
                None
            }
        }
    }
}

/// Decodes every EntryPoint event emitted by `entry_point`, in log order.
pub fn extract_entry_point_events(logs: &[TxLog], entry_point: Address) -> Vec<EntryPointEvent> {
    logs.iter()
        .filter(|log| log.address == entry_point)
        .filter_map(EntryPointEvent::from_log)
        .collect()
}

impl ToValue for EntryPointEvent {
    fn to_value(&self) -> Value {
        let name = ("event", Value::from(self.name()));
        match self {
            EntryPointEvent::UserOperation {
                user_op_hash,
                sender,
                paymaster,
                nonce,
                success,
                actual_gas_cost,
                actual_gas_used,
            } => Value::map([
                name,
                ("userOpHash", (*user_op_hash).into()),
                ("sender", (*sender).into()),
                ("paymaster", (*paymaster).into()),
                ("nonce", (*nonce).into()),
                ("success", (*success).into()),
                ("actualGasCost", (*actual_gas_cost).into()),
                ("actualGasUsed", (*actual_gas_used).into()),
            ]),
            EntryPointEvent::AccountDeployed {
                user_op_hash,
                sender,
                factory,
                paymaster,
            } => Value::map([
                name,
                ("userOpHash", (*user_op_hash).into()),
                ("sender", (*sender).into()),
                ("factory", (*factory).into()),
                ("paymaster", (*paymaster).into()),
            ]),
            EntryPointEvent::RevertReason {
                user_op_hash,
                sender,
                nonce,
                revert_reason,
            } => Value::map([
                name,
                ("userOpHash", (*user_op_hash).into()),
                ("sender", (*sender).into()),
                ("nonce", (*nonce).into()),
                ("revertReason", revert_reason.into()),
            ]),
            EntryPointEvent::BeforeExecution => Value::map([name]),
        }
    }
}

//! UserOperation extraction from an EntryPoint `handleOps` call.
//!
//! Both EntryPoint layouts are accepted. v0.7 packs two 128-bit quantities
//! into each of `accountGasLimits` and `gasFees`; they are unpacked here so
//! callers see a single [`UserOperation`] shape regardless of version.

use std::fmt;

use alloy::primitives::{Address, Bytes, B256, U256};

use crate::abi::entry_point::IEntryPoint::{
    IEntryPointCalls, PackedUserOperation, UserOperation as UnpackedUserOperation,
};
use crate::abi::{decode, DecodedArgs};
use crate::call::DecodedCall;
use crate::error::DecodeError;
use crate::normalize::{format_gwei, ToValue, Value};
use crate::resolver::CallResolver;
use crate::selectors::{selector_prefix, SchemaFamily};

/// EntryPoint `handleOps` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPointVersion {
    /// `UserOperation` with separate gas and fee fields (v0.6 and earlier).
    V06,
    /// `PackedUserOperation` (v0.7).
    V07,
}

impl EntryPointVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryPointVersion::V06 => "v0.6",
            EntryPointVersion::V07 => "v0.7",
        }
    }
}

impl fmt::Display for EntryPointVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user operation with gas and fee fields unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl From<UnpackedUserOperation> for UserOperation {
    fn from(op: UnpackedUserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            init_code: op.initCode,
            call_data: op.callData,
            call_gas_limit: op.callGasLimit,
            verification_gas_limit: op.verificationGasLimit,
            pre_verification_gas: op.preVerificationGas,
            max_fee_per_gas: op.maxFeePerGas,
            max_priority_fee_per_gas: op.maxPriorityFeePerGas,
            paymaster_and_data: op.paymasterAndData,
            signature: op.signature,
        }
    }
}

impl From<PackedUserOperation> for UserOperation {
    fn from(op: PackedUserOperation) -> Self {
        let (verification_gas_limit, call_gas_limit) = unpack_u128_pair(op.accountGasLimits);
        let (max_priority_fee_per_gas, max_fee_per_gas) = unpack_u128_pair(op.gasFees);
        Self {
            sender: op.sender,
            nonce: op.nonce,
            init_code: op.initCode,
            call_data: op.callData,
            call_gas_limit,
            verification_gas_limit,
            pre_verification_gas: op.preVerificationGas,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            paymaster_and_data: op.paymasterAndData,
            signature: op.signature,
        }
    }
}

/// Splits a word into its high and low 128-bit halves.
fn unpack_u128_pair(word: B256) -> (U256, U256) {
    (
        U256::from_be_slice(&word[..16]),
        U256::from_be_slice(&word[16..]),
    )
}

/// Leading address of a `paymasterAndData` or `initCode` blob.
fn leading_address(data: &Bytes) -> Option<Address> {
    (data.len() >= 20).then(|| Address::from_slice(&data[..20]))
}

/// A user operation with its position in the bundle and decoded call data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUserOperation {
    pub index: usize,
    pub version: EntryPointVersion,
    pub op: UserOperation,
    pub decoded_call_data: DecodedCall,
    /// First 20 bytes of `paymasterAndData`.
    pub paymaster: Option<Address>,
    /// First 20 bytes of `initCode` (account factory).
    pub factory: Option<Address>,
}

impl ParsedUserOperation {
    fn new(
        index: usize,
        version: EntryPointVersion,
        op: UserOperation,
        resolver: &CallResolver,
    ) -> Self {
        let decoded_call_data = resolver.resolve(&op.call_data);
        Self {
            index,
            version,
            paymaster: leading_address(&op.paymaster_and_data),
            factory: leading_address(&op.init_code),
            decoded_call_data,
            op,
        }
    }
}

/// A decoded `handleOps` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleOps {
    pub version: EntryPointVersion,
    pub beneficiary: Address,
    pub ops: Vec<ParsedUserOperation>,
}

/// Decodes `data` as `handleOps` and resolves each operation's call data.
///
/// Operations keep their encoding order; `index` is the array position.
pub fn extract_user_operations(
    data: &[u8],
    resolver: &CallResolver,
) -> Result<HandleOps, DecodeError> {
    let selector = selector_prefix(data).ok_or_else(|| DecodeError::NotAnEntryPointCall {
        selector: None,
        reason: "call data is too short to carry a selector".to_string(),
    })?;

    let not_entry_point = |reason: String| DecodeError::NotAnEntryPointCall {
        selector: Some(selector),
        reason,
    };

    let call = match decode(SchemaFamily::EntryPoint, data) {
        Ok(DecodedArgs::EntryPoint(call)) => call,
        Ok(other) => {
            return Err(not_entry_point(format!(
                "decoded as {} instead",
                other.family()
            )))
        }
        Err(err) => return Err(not_entry_point(err.to_string())),
    };

    let handle_ops = match call {
        IEntryPointCalls::handleOps_0(call) => HandleOps {
            version: EntryPointVersion::V06,
            beneficiary: call.beneficiary,
            ops: call
                .ops
                .into_iter()
                .enumerate()
                .map(|(index, op)| {
                    ParsedUserOperation::new(index, EntryPointVersion::V06, op.into(), resolver)
                })
                .collect(),
        },
        IEntryPointCalls::handleOps_1(call) => HandleOps {
            version: EntryPointVersion::V07,
            beneficiary: call.beneficiary,
            ops: call
                .ops
                .into_iter()
                .enumerate()
                .map(|(index, op)| {
                    ParsedUserOperation::new(index, EntryPointVersion::V07, op.into(), resolver)
                })
                .collect(),
        },
    };

    tracing::debug!(
        version = %handle_ops.version,
        ops = handle_ops.ops.len(),
        "extracted user operations"
    );
    Ok(handle_ops)
}

impl ToValue for ParsedUserOperation {
    fn to_value(&self) -> Value {
        let op = &self.op;
        Value::map([
            ("index", self.index.into()),
            ("entryPointVersion", self.version.as_str().into()),
            ("sender", op.sender.into()),
            ("nonce", op.nonce.into()),
            ("initCode", (&op.init_code).into()),
            ("factory", self.factory.into()),
            ("callData", (&op.call_data).into()),
            ("callGasLimit", op.call_gas_limit.into()),
            ("verificationGasLimit", op.verification_gas_limit.into()),
            ("preVerificationGas", op.pre_verification_gas.into()),
            ("maxFeePerGas", op.max_fee_per_gas.into()),
            ("maxFeePerGasGwei", format_gwei(op.max_fee_per_gas).into()),
            ("maxPriorityFeePerGas", op.max_priority_fee_per_gas.into()),
            (
                "maxPriorityFeePerGasGwei",
                format_gwei(op.max_priority_fee_per_gas).into(),
            ),
            ("paymasterAndData", (&op.paymaster_and_data).into()),
            ("paymaster", self.paymaster.into()),
            ("signature", (&op.signature).into()),
            ("decodedCallData", self.decoded_call_data.to_value()),
        ])
    }
}

impl ToValue for HandleOps {
    fn to_value(&self) -> Value {
        Value::map([
            ("entryPointVersion", self.version.as_str().into()),
            ("beneficiary", self.beneficiary.into()),
            (
                "userOperations",
                Value::Seq(self.ops.iter().map(ToValue::to_value).collect()),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::entry_point::IEntryPoint;
    use crate::abi::token::IERC20;
    use crate::abi::wallet::ISmartWallet;
    use crate::call::Route;
    use alloy::primitives::{address, b256};
    use alloy::sol_types::SolCall;

    const SENDER: Address = address!("1111111111111111111111111111111111111111");
    const PAYMASTER: Address = address!("3333333333333333333333333333333333333333");
    const BENEFICIARY: Address = address!("4444444444444444444444444444444444444444");
    const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

    fn transfer_through_execute() -> Bytes {
        let transfer = IERC20::transferCall {
            to: BENEFICIARY,
            amount: U256::from(1_000_000u64),
        }
        .abi_encode();
        ISmartWallet::executeCall {
            dest: USDT,
            value: U256::ZERO,
            func: transfer.into(),
        }
        .abi_encode()
        .into()
    }

    fn v06_op(nonce: u64, paymaster_and_data: Bytes) -> IEntryPoint::UserOperation {
        IEntryPoint::UserOperation {
            sender: SENDER,
            nonce: U256::from(nonce),
            initCode: Bytes::new(),
            callData: transfer_through_execute(),
            callGasLimit: U256::from(100_000u64),
            verificationGasLimit: U256::from(200_000u64),
            preVerificationGas: U256::from(50_000u64),
            maxFeePerGas: U256::from(30_000_000_000u64),
            maxPriorityFeePerGas: U256::from(1_500_000_000u64),
            paymasterAndData: paymaster_and_data,
            signature: Bytes::from_static(&[0xaa; 65]),
        }
    }

    #[test]
    fn extracts_ops_in_encoding_order() {
        let data = IEntryPoint::handleOps_0Call {
            ops: (0..3).map(|n| v06_op(n, Bytes::new())).collect(),
            beneficiary: BENEFICIARY,
        }
        .abi_encode();

        let handle_ops = extract_user_operations(&data, &CallResolver::default()).unwrap();
        assert_eq!(handle_ops.version, EntryPointVersion::V06);
        assert_eq!(handle_ops.beneficiary, BENEFICIARY);
        assert_eq!(handle_ops.ops.len(), 3);
        for (i, parsed) in handle_ops.ops.iter().enumerate() {
            assert_eq!(parsed.index, i);
            assert_eq!(parsed.op.nonce, U256::from(i));
            assert_eq!(
                parsed.decoded_call_data.as_routed().map(|r| r.route),
                Some(Route::Execute)
            );
        }
    }

    #[test]
    fn paymaster_is_leading_twenty_bytes() {
        let mut paymaster_and_data = PAYMASTER.to_vec();
        paymaster_and_data.extend_from_slice(&[0xbb; 12]);
        let data = IEntryPoint::handleOps_0Call {
            ops: vec![v06_op(0, paymaster_and_data.into()), v06_op(1, Bytes::new())],
            beneficiary: BENEFICIARY,
        }
        .abi_encode();

        let handle_ops = extract_user_operations(&data, &CallResolver::default()).unwrap();
        assert_eq!(handle_ops.ops[0].paymaster, Some(PAYMASTER));
        assert_eq!(handle_ops.ops[1].paymaster, None);
    }

    #[test]
    fn packed_gas_fields_are_unpacked() {
        let op = IEntryPoint::PackedUserOperation {
            sender: SENDER,
            nonce: U256::from(7u8),
            initCode: Bytes::new(),
            callData: transfer_through_execute(),
            accountGasLimits: b256!(
                "00000000000000000000000000030d40000000000000000000000000000186a0"
            ),
            preVerificationGas: U256::from(50_000u64),
            gasFees: b256!(
                "00000000000000000000000059682f00000000000000000000000006fc23ac00"
            ),
            paymasterAndData: Bytes::new(),
            signature: Bytes::new(),
        };
        let data = IEntryPoint::handleOps_1Call {
            ops: vec![op],
            beneficiary: BENEFICIARY,
        }
        .abi_encode();

        let handle_ops = extract_user_operations(&data, &CallResolver::default()).unwrap();
        assert_eq!(handle_ops.version, EntryPointVersion::V07);
        let op = &handle_ops.ops[0].op;
        assert_eq!(op.verification_gas_limit, U256::from(200_000u64));
        assert_eq!(op.call_gas_limit, U256::from(100_000u64));
        assert_eq!(op.max_priority_fee_per_gas, U256::from(1_500_000_000u64));
        assert_eq!(op.max_fee_per_gas, U256::from(30_000_000_000u64));
    }

    #[test]
    fn factory_comes_from_init_code() {
        let factory = address!("9406Cc6185a346906296840746125a0E44976454");
        let mut init_code = factory.to_vec();
        init_code.extend_from_slice(&[0x5f, 0xbf, 0xb9, 0xcf]);
        let mut op = v06_op(0, Bytes::new());
        op.initCode = init_code.into();
        let data = IEntryPoint::handleOps_0Call {
            ops: vec![op],
            beneficiary: BENEFICIARY,
        }
        .abi_encode();

        let handle_ops = extract_user_operations(&data, &CallResolver::default()).unwrap();
        assert_eq!(handle_ops.ops[0].factory, Some(factory));
    }

    #[test]
    fn rejects_other_selectors() {
        let err = extract_user_operations(&transfer_through_execute(), &CallResolver::default())
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::NotAnEntryPointCall { selector: Some(_), .. }
        ));

        let err = extract_user_operations(&[0x1f, 0xad], &CallResolver::default()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::NotAnEntryPointCall { selector: None, .. }
        ));
    }

    #[test]
    fn rendered_fees_include_gwei() {
        let data = IEntryPoint::handleOps_0Call {
            ops: vec![v06_op(0, Bytes::new())],
            beneficiary: BENEFICIARY,
        }
        .abi_encode();
        let handle_ops = extract_user_operations(&data, &CallResolver::default()).unwrap();
        let json = handle_ops.to_value().into_json();
        let op = &json["userOperations"][0];
        assert_eq!(op["maxFeePerGas"], "30000000000");
        assert_eq!(op["maxFeePerGasGwei"], "30.0");
        assert_eq!(op["maxPriorityFeePerGasGwei"], "1.5");
        assert_eq!(op["index"], 0);
        assert_eq!(op["paymaster"], serde_json::Value::Null);
    }
}

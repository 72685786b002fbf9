//! Compile-time ABI schemas and family-based call decoding.
//!
//! Every schema family is a `sol!` interface, so selectors and tuple layouts
//! come from the canonical signatures rather than hand-written offsets. A
//! decode attempt is a plain `Result`: the selector is checked against the
//! family first ([`DecodeError::SchemaMismatch`]), then the argument tuple is
//! parsed ([`DecodeError::MalformedEncoding`]). [`decode_any`] walks the
//! families in [`SchemaFamily::PRIORITY`] order and stops at the first hit.

use alloy::primitives::Selector;
use alloy::sol_types::SolInterface;

use crate::error::DecodeError;
use crate::selectors::{selector_prefix, SchemaFamily};

/// ERC-4337 EntryPoint schemas (v0.6 and v0.7).
pub mod entry_point {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface IEntryPoint {
            struct UserOperation {
                address sender;
                uint256 nonce;
                bytes initCode;
                bytes callData;
                uint256 callGasLimit;
                uint256 verificationGasLimit;
                uint256 preVerificationGas;
                uint256 maxFeePerGas;
                uint256 maxPriorityFeePerGas;
                bytes paymasterAndData;
                bytes signature;
            }

            struct PackedUserOperation {
                address sender;
                uint256 nonce;
                bytes initCode;
                bytes callData;
                bytes32 accountGasLimits;
                uint256 preVerificationGas;
                bytes32 gasFees;
                bytes paymasterAndData;
                bytes signature;
            }

            /// v0.6 bundle entry.
            function handleOps(UserOperation[] calldata ops, address payable beneficiary) external;

            /// v0.7 bundle entry.
            function handleOps(PackedUserOperation[] calldata ops, address payable beneficiary) external;

            event UserOperationEvent(
                bytes32 indexed userOpHash,
                address indexed sender,
                address indexed paymaster,
                uint256 nonce,
                bool success,
                uint256 actualGasCost,
                uint256 actualGasUsed
            );

            event AccountDeployed(
                bytes32 indexed userOpHash,
                address indexed sender,
                address factory,
                address paymaster
            );

            event UserOperationRevertReason(
                bytes32 indexed userOpHash,
                address indexed sender,
                uint256 nonce,
                bytes revertReason
            );

            event BeforeExecution();
        }
    }
}

/// Smart-wallet routing schemas.
///
/// Covers SimpleAccount (`execute`, both `executeBatch` arities), Coinbase
/// Smart Wallet (tuple `executeBatch`), Biconomy (`execute_ncC`,
/// `executeBatch_y6U`), `multicall(bytes[])` and Safe.
pub mod wallet {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface ISmartWallet {
            struct Call {
                address target;
                uint256 value;
                bytes data;
            }

            function execute(address dest, uint256 value, bytes calldata func) external;
            function execute_ncC(address dest, uint256 value, bytes calldata func) external;
            function executeBatch(address[] calldata dest, bytes[] calldata func) external;
            function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external;
            function executeBatch(Call[] calldata calls) external;
            function executeBatch_y6U(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external;
            function multicall(bytes[] calldata data) external returns (bytes[] memory results);
            function execTransactionFromModule(address to, uint256 value, bytes calldata data, uint8 operation) external returns (bool success);
            function execTransaction(
                address to,
                uint256 value,
                bytes calldata data,
                uint8 operation,
                uint256 safeTxGas,
                uint256 baseGas,
                uint256 gasPrice,
                address gasToken,
                address refundReceiver,
                bytes calldata signatures
            ) external payable returns (bool success);
        }
    }
}

/// Multicall3 aggregators.
pub mod multicall {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface IMulticall3 {
            struct Call {
                address target;
                bytes callData;
            }

            struct Call3 {
                address target;
                bool allowFailure;
                bytes callData;
            }

            struct Call3Value {
                address target;
                bool allowFailure;
                uint256 value;
                bytes callData;
            }

            function aggregate(Call[] calldata calls) external payable;
            function tryAggregate(bool requireSuccess, Call[] calldata calls) external payable;
            function aggregate3(Call3[] calldata calls) external payable;
            function aggregate3Value(Call3Value[] calldata calls) external payable;
        }
    }
}

/// Token standards.
pub mod token {
    use alloy::sol;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface IERC20 {
            function transfer(address to, uint256 amount) external returns (bool);
            function transferFrom(address from, address to, uint256 amount) external returns (bool);
            function approve(address spender, uint256 amount) external returns (bool);
            function mint(address to, uint256 amount) external;
            function burn(uint256 amount) external;
            function burn(address from, uint256 amount) external;

            event Transfer(address indexed from, address indexed to, uint256 value);
        }
    }

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface IERC721 {
            function transferFrom(address from, address to, uint256 tokenId) external;
            function safeTransferFrom(address from, address to, uint256 tokenId) external;
            function safeTransferFrom(address from, address to, uint256 tokenId, bytes calldata data) external;
            function approve(address to, uint256 tokenId) external;
            function setApprovalForAll(address operator, bool approved) external;
        }
    }

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface IERC1155 {
            function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes calldata data) external;
            function safeBatchTransferFrom(address from, address to, uint256[] calldata ids, uint256[] calldata amounts, bytes calldata data) external;
            function setApprovalForAll(address operator, bool approved) external;
        }
    }
}

use entry_point::IEntryPoint::IEntryPointCalls;
use multicall::IMulticall3::IMulticall3Calls;
use token::IERC1155::IERC1155Calls;
use token::IERC20::IERC20Calls;
use token::IERC721::IERC721Calls;
use wallet::ISmartWallet::ISmartWalletCalls;

/// A call successfully decoded by one schema family.
#[derive(Debug, PartialEq, Eq)]
pub enum DecodedArgs {
    EntryPoint(IEntryPointCalls),
    SmartWallet(ISmartWalletCalls),
    Multicall(IMulticall3Calls),
    Erc20(IERC20Calls),
    Erc721(IERC721Calls),
    Erc1155(IERC1155Calls),
}

impl DecodedArgs {
    /// Family that produced this decode.
    pub fn family(&self) -> SchemaFamily {
        match self {
            DecodedArgs::EntryPoint(_) => SchemaFamily::EntryPoint,
            DecodedArgs::SmartWallet(_) => SchemaFamily::SmartWallet,
            DecodedArgs::Multicall(_) => SchemaFamily::Multicall,
            DecodedArgs::Erc20(_) => SchemaFamily::Erc20,
            DecodedArgs::Erc721(_) => SchemaFamily::Erc721,
            DecodedArgs::Erc1155(_) => SchemaFamily::Erc1155,
        }
    }
}

/// True if `family` declares a function with this selector.
pub fn family_recognizes(family: SchemaFamily, selector: Selector) -> bool {
    let selector = selector.0;
    match family {
        SchemaFamily::EntryPoint => IEntryPointCalls::valid_selector(selector),
        SchemaFamily::SmartWallet => ISmartWalletCalls::valid_selector(selector),
        SchemaFamily::Multicall => IMulticall3Calls::valid_selector(selector),
        SchemaFamily::Erc20 => IERC20Calls::valid_selector(selector),
        SchemaFamily::Erc721 => IERC721Calls::valid_selector(selector),
        SchemaFamily::Erc1155 => IERC1155Calls::valid_selector(selector),
    }
}

/// Decodes `data` as a call from one schema family.
///
/// Decoding is lenient about trailing bytes and high-order padding (wallets
/// routinely append data after the ABI tuple) but strict about offsets,
/// lengths, boolean words and parallel-array lengths.
pub fn decode(family: SchemaFamily, data: &[u8]) -> Result<DecodedArgs, DecodeError> {
    let selector = selector_prefix(data).ok_or(DecodeError::SchemaMismatch {
        family: Some(family),
        selector: None,
    })?;

    if !family_recognizes(family, selector) {
        return Err(DecodeError::SchemaMismatch {
            family: Some(family),
            selector: Some(selector),
        });
    }

    let malformed = |reason: String| DecodeError::MalformedEncoding {
        family,
        selector,
        reason,
    };

    let decoded = match family {
        SchemaFamily::EntryPoint => {
            IEntryPointCalls::abi_decode(data, false).map(DecodedArgs::EntryPoint)
        }
        SchemaFamily::SmartWallet => {
            ISmartWalletCalls::abi_decode(data, false).map(DecodedArgs::SmartWallet)
        }
        SchemaFamily::Multicall => {
            IMulticall3Calls::abi_decode(data, false).map(DecodedArgs::Multicall)
        }
        SchemaFamily::Erc20 => IERC20Calls::abi_decode(data, false).map(DecodedArgs::Erc20),
        SchemaFamily::Erc721 => IERC721Calls::abi_decode(data, false).map(DecodedArgs::Erc721),
        SchemaFamily::Erc1155 => {
            IERC1155Calls::abi_decode(data, false).map(DecodedArgs::Erc1155)
        }
    }
    .map_err(|err| malformed(err.to_string()))?;

    check_shape(&decoded, data).map_err(malformed)?;
    Ok(decoded)
}

/// Tries every family in priority order and returns the first success.
///
/// When no family decodes the call, a malformed-encoding error from a family
/// that recognized the selector is preferred over a plain mismatch.
pub fn decode_any(data: &[u8]) -> Result<DecodedArgs, DecodeError> {
    let mut malformed = None;
    for family in SchemaFamily::PRIORITY {
        match decode(family, data) {
            Ok(decoded) => return Ok(decoded),
            Err(err @ DecodeError::MalformedEncoding { .. }) => {
                malformed.get_or_insert(err);
            }
            Err(_) => {}
        }
    }
    Err(malformed.unwrap_or(DecodeError::SchemaMismatch {
        family: None,
        selector: selector_prefix(data),
    }))
}

/// Structural checks the ABI codec does not perform in lenient mode.
fn check_shape(decoded: &DecodedArgs, data: &[u8]) -> Result<(), String> {
    use ISmartWalletCalls as W;

    match decoded {
        DecodedArgs::SmartWallet(W::executeBatch_0(call)) => {
            parallel_lengths(call.dest.len(), call.func.len(), None)
        }
        DecodedArgs::SmartWallet(W::executeBatch_1(call)) => {
            parallel_lengths(call.dest.len(), call.func.len(), Some(call.value.len()))
        }
        DecodedArgs::SmartWallet(W::executeBatch_y6U(call)) => {
            parallel_lengths(call.dest.len(), call.func.len(), Some(call.value.len()))
        }
        DecodedArgs::Multicall(IMulticall3Calls::tryAggregate(_)) => canonical_bool(data, 0),
        DecodedArgs::Erc721(IERC721Calls::setApprovalForAll(_))
        | DecodedArgs::Erc1155(IERC1155Calls::setApprovalForAll(_)) => canonical_bool(data, 1),
        DecodedArgs::Erc1155(IERC1155Calls::safeBatchTransferFrom(call)) => {
            if call.ids.len() == call.amounts.len() {
                Ok(())
            } else {
                Err(format!(
                    "ids length {} does not match amounts length {}",
                    call.ids.len(),
                    call.amounts.len()
                ))
            }
        }
        _ => Ok(()),
    }
}

/// Targets and payloads must line up; a values array may be empty (all zero)
/// or match them.
fn parallel_lengths(targets: usize, payloads: usize, values: Option<usize>) -> Result<(), String> {
    if targets != payloads {
        return Err(format!(
            "targets length {targets} does not match payloads length {payloads}"
        ));
    }
    match values {
        Some(values) if values != 0 && values != targets => Err(format!(
            "values length {values} does not match targets length {targets}"
        )),
        _ => Ok(()),
    }
}

/// The head word at `index` must be exactly 0 or 1.
fn canonical_bool(data: &[u8], index: usize) -> Result<(), String> {
    let start = 4 + index * 32;
    let word = data
        .get(start..start + 32)
        .ok_or_else(|| format!("missing bool word at argument {index}"))?;
    if word[..31].iter().all(|b| *b == 0) && word[31] <= 1 {
        Ok(())
    } else {
        Err(format!("non-canonical bool at argument {index}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address, Bytes, U256};
    use alloy::sol_types::SolCall;
    use token::IERC20;
    use wallet::ISmartWallet;

    const TOKEN: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
    const ALICE: Address = address!("1111111111111111111111111111111111111111");

    fn transfer_data() -> Vec<u8> {
        IERC20::transferCall {
            to: ALICE,
            amount: U256::from(1_000_000u64),
        }
        .abi_encode()
    }

    #[test]
    fn decodes_erc20_transfer() {
        let decoded = decode(SchemaFamily::Erc20, &transfer_data()).unwrap();
        match decoded {
            DecodedArgs::Erc20(IERC20Calls::transfer(call)) => {
                assert_eq!(call.to, ALICE);
                assert_eq!(call.amount, U256::from(1_000_000u64));
            }
            other => panic!("expected ERC-20 transfer, got {other:?}"),
        }
    }

    #[test]
    fn wrong_family_is_schema_mismatch() {
        let err = decode(SchemaFamily::SmartWallet, &transfer_data()).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { .. }));
    }

    #[test]
    fn truncated_arguments_are_malformed() {
        let mut data = transfer_data();
        data.truncate(40);
        let err = decode(SchemaFamily::Erc20, &data).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEncoding { .. }));
    }

    #[test]
    fn trailing_bytes_are_tolerated() {
        let mut data = transfer_data();
        data.extend_from_slice(&[0u8; 7]);
        assert!(decode(SchemaFamily::Erc20, &data).is_ok());
    }

    #[test]
    fn decode_any_peels_wallet_before_tokens() {
        let data = ISmartWallet::executeCall {
            dest: TOKEN,
            value: U256::ZERO,
            func: Bytes::from(transfer_data()),
        }
        .abi_encode();
        let decoded = decode_any(&data).unwrap();
        assert_eq!(decoded.family(), SchemaFamily::SmartWallet);
    }

    #[test]
    fn colliding_transfer_from_goes_to_erc20() {
        let data = IERC20::transferFromCall {
            from: ALICE,
            to: TOKEN,
            amount: U256::from(5u64),
        }
        .abi_encode();
        assert_eq!(decode_any(&data).unwrap().family(), SchemaFamily::Erc20);
    }

    #[test]
    fn batch_length_mismatch_is_malformed() {
        let data = ISmartWallet::executeBatch_0Call {
            dest: vec![TOKEN, ALICE],
            func: vec![Bytes::from(transfer_data())],
        }
        .abi_encode();
        let err = decode(SchemaFamily::SmartWallet, &data).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEncoding { .. }));
        assert!(matches!(
            decode_any(&data).unwrap_err(),
            DecodeError::MalformedEncoding { .. }
        ));
    }

    #[test]
    fn empty_values_array_is_accepted() {
        let data = ISmartWallet::executeBatch_1Call {
            dest: vec![TOKEN],
            value: vec![],
            func: vec![Bytes::from(transfer_data())],
        }
        .abi_encode();
        assert!(decode(SchemaFamily::SmartWallet, &data).is_ok());
    }

    #[test]
    fn non_canonical_bool_is_malformed() {
        let mut data = token::IERC721::setApprovalForAllCall {
            operator: ALICE,
            approved: true,
        }
        .abi_encode();
        data[4 + 63] = 2;
        let err = decode(SchemaFamily::Erc721, &data).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedEncoding { .. }));
    }

    #[test]
    fn unknown_selector_mismatches_everywhere() {
        let err = decode_any(&[0xde, 0xad, 0xbe, 0xef, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SchemaMismatch { family: None, selector: Some(_) }
        ));
    }
}

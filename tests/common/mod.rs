//! Shared test helpers and utilities.
//!
//! Provides an in-memory [`ChainReader`] with call counters and factory
//! functions for bundle transactions, receipts and logs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use aa_data::{ChainReader, ChainReceipt, ChainTransaction, TxLog};
use aa_decode::abi::entry_point::IEntryPoint;
use aa_decode::abi::token::IERC20;
use aa_decode::abi::wallet::ISmartWallet;
use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolEvent};

pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");
pub const BUNDLER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const SENDER: Address = address!("1111111111111111111111111111111111111111");
pub const RECIPIENT: Address = address!("2222222222222222222222222222222222222222");
pub const USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

pub const BLOCK: u64 = 19_000_000;
pub const BLOCK_TIMESTAMP: u64 = 1_705_000_000;

/// One scripted answer to `receipt(hash)`.
#[derive(Clone, Debug)]
pub enum ReceiptResponse {
    Found(ChainReceipt),
    Missing,
    Error,
}

/// Token contract behavior.
#[derive(Clone, Debug, Default)]
pub struct MockToken {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// In-memory [`ChainReader`].
///
/// Receipt answers are scripted per hash: call `n` gets answer `n`, and the
/// last answer repeats once the script runs out.
#[derive(Default)]
pub struct MockReader {
    transactions: HashMap<B256, ChainTransaction>,
    receipts: HashMap<B256, Vec<ReceiptResponse>>,
    blocks: HashMap<u64, u64>,
    tokens: HashMap<Address, MockToken>,
    pub transaction_calls: AtomicUsize,
    pub receipt_calls: AtomicUsize,
    pub block_calls: AtomicUsize,
    pub symbol_calls: Mutex<HashMap<Address, usize>>,
    pub decimals_calls: Mutex<HashMap<Address, usize>>,
    /// While set, every `symbol()`/`decimals()` call fails.
    pub metadata_offline: AtomicBool,
}

impl MockReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, tx: ChainTransaction) -> Self {
        self.transactions.insert(tx.hash, tx);
        self
    }

    pub fn with_receipts(mut self, hash: B256, answers: Vec<ReceiptResponse>) -> Self {
        self.receipts.insert(hash, answers);
        self
    }

    pub fn with_block(mut self, number: u64, timestamp: u64) -> Self {
        self.blocks.insert(number, timestamp);
        self
    }

    pub fn with_token(mut self, token: Address, symbol: &str, decimals: u8) -> Self {
        self.tokens.insert(
            token,
            MockToken {
                symbol: Some(symbol.to_string()),
                decimals: Some(decimals),
            },
        );
        self
    }

    pub fn metadata_calls_for(&self, token: Address) -> (usize, usize) {
        let symbol = lock(&self.symbol_calls).get(&token).copied().unwrap_or(0);
        let decimals = lock(&self.decimals_calls).get(&token).copied().unwrap_or(0);
        (symbol, decimals)
    }

    pub fn total_symbol_calls(&self) -> usize {
        lock(&self.symbol_calls).values().sum()
    }

    pub fn total_decimals_calls(&self) -> usize {
        lock(&self.decimals_calls).values().sum()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChainReader for MockReader {
    async fn transaction(&self, hash: B256) -> eyre::Result<Option<ChainTransaction>> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transactions.get(&hash).cloned())
    }

    async fn receipt(&self, hash: B256) -> eyre::Result<Option<ChainReceipt>> {
        let call = self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        let Some(answers) = self.receipts.get(&hash) else {
            return Ok(None);
        };
        match answers.get(call).or_else(|| answers.last()) {
            Some(ReceiptResponse::Found(receipt)) => Ok(Some(receipt.clone())),
            Some(ReceiptResponse::Error) => Err(eyre::eyre!("connection reset by peer")),
            Some(ReceiptResponse::Missing) | None => Ok(None),
        }
    }

    async fn block_timestamp(&self, number: u64) -> eyre::Result<Option<u64>> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.blocks.get(&number).copied())
    }

    async fn token_symbol(&self, token: Address) -> eyre::Result<String> {
        *lock(&self.symbol_calls).entry(token).or_default() += 1;
        if self.metadata_offline.load(Ordering::SeqCst) {
            eyre::bail!("connection reset by peer");
        }
        self.tokens
            .get(&token)
            .and_then(|t| t.symbol.clone())
            .ok_or_else(|| eyre::eyre!("execution reverted"))
    }

    async fn token_decimals(&self, token: Address) -> eyre::Result<u8> {
        *lock(&self.decimals_calls).entry(token).or_default() += 1;
        if self.metadata_offline.load(Ordering::SeqCst) {
            eyre::bail!("connection reset by peer");
        }
        self.tokens
            .get(&token)
            .and_then(|t| t.decimals)
            .ok_or_else(|| eyre::eyre!("execution reverted"))
    }
}

/// Deterministic transaction hash.
pub fn tx_hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

/// `transfer(to, amount)` call data.
pub fn transfer_call(to: Address, amount: u64) -> Bytes {
    IERC20::transferCall {
        to,
        amount: U256::from(amount),
    }
    .abi_encode()
    .into()
}

/// `execute(dest, value, func)` call data.
pub fn execute_call(dest: Address, value: U256, func: Bytes) -> Bytes {
    ISmartWallet::executeCall { dest, value, func }
        .abi_encode()
        .into()
}

/// A v0.6 user operation from [`SENDER`] with the given call data.
pub fn user_op(nonce: u64, call_data: Bytes) -> IEntryPoint::UserOperation {
    IEntryPoint::UserOperation {
        sender: SENDER,
        nonce: U256::from(nonce),
        initCode: Bytes::new(),
        callData: call_data,
        callGasLimit: U256::from(100_000u64),
        verificationGasLimit: U256::from(150_000u64),
        preVerificationGas: U256::from(48_000u64),
        maxFeePerGas: U256::from(25_000_000_000u64),
        maxPriorityFeePerGas: U256::from(1_000_000_000u64),
        paymasterAndData: Bytes::new(),
        signature: Bytes::from_static(&[0x11; 65]),
    }
}

/// `handleOps(ops, BUNDLER)` call data.
pub fn handle_ops_input(ops: Vec<IEntryPoint::UserOperation>) -> Bytes {
    IEntryPoint::handleOps_0Call {
        ops,
        beneficiary: BUNDLER,
    }
    .abi_encode()
    .into()
}

/// A v0.7 packed user operation from [`SENDER`] with the given call data.
///
/// Gas limits are 200000 (verification) / 100000 (call); fees are 1.5 gwei
/// (priority) / 30 gwei (max).
pub fn packed_user_op(nonce: u64, call_data: Bytes) -> IEntryPoint::PackedUserOperation {
    IEntryPoint::PackedUserOperation {
        sender: SENDER,
        nonce: U256::from(nonce),
        initCode: Bytes::new(),
        callData: call_data,
        accountGasLimits: pack_u128_pair(200_000, 100_000),
        preVerificationGas: U256::from(48_000u64),
        gasFees: pack_u128_pair(1_500_000_000, 30_000_000_000),
        paymasterAndData: Bytes::new(),
        signature: Bytes::from_static(&[0x11; 65]),
    }
}

fn pack_u128_pair(high: u128, low: u128) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&high.to_be_bytes());
    word[16..].copy_from_slice(&low.to_be_bytes());
    B256::from(word)
}

/// v0.7 `handleOps(ops, BUNDLER)` call data.
pub fn handle_ops_v07_input(ops: Vec<IEntryPoint::PackedUserOperation>) -> Bytes {
    IEntryPoint::handleOps_1Call {
        ops,
        beneficiary: BUNDLER,
    }
    .abi_encode()
    .into()
}

/// A mined bundle transaction to the v0.6 EntryPoint.
pub fn bundle_tx(hash: B256, input: Bytes) -> ChainTransaction {
    ChainTransaction {
        hash,
        from: BUNDLER,
        to: Some(ENTRY_POINT_V06),
        value: U256::ZERO,
        input,
        nonce: 7,
        gas_price: 30_000_000_000,
        gas_limit: 500_000,
        block_number: Some(BLOCK),
    }
}

/// A successful receipt carrying `logs`.
pub fn success_receipt(logs: Vec<TxLog>) -> ChainReceipt {
    ChainReceipt {
        status: true,
        gas_used: 180_000,
        block_number: Some(BLOCK),
        logs,
    }
}

/// An ERC-20 `Transfer` log.
pub fn transfer_log(token: Address, from: Address, to: Address, amount: u64) -> TxLog {
    TxLog {
        address: token,
        topics: vec![
            IERC20::Transfer::SIGNATURE_HASH,
            from.into_word(),
            to.into_word(),
        ],
        data: U256::from(amount).to_be_bytes::<32>().to_vec().into(),
        log_index: None,
    }
}

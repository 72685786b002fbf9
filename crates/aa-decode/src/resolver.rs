//! Recursive call-data resolution.
//!
//! [`CallResolver::resolve`] peels routing wrappers (EntryPoint, wallet,
//! multicall) and decodes what they forward until it reaches a token call or
//! something it cannot decode. Resolution never fails; undecodable input
//! bottoms out at [`DecodedCall::UnknownFunction`] or [`DecodedCall::Raw`].
//! Nesting beyond `max_depth` is reported as `UnknownFunction`.

use alloy::primitives::{Address, Bytes, Selector, U256};

use crate::abi::entry_point::IEntryPoint::IEntryPointCalls;
use crate::abi::multicall::IMulticall3::IMulticall3Calls;
use crate::abi::token::IERC1155::IERC1155Calls;
use crate::abi::token::IERC20::IERC20Calls;
use crate::abi::token::IERC721::IERC721Calls;
use crate::abi::wallet::ISmartWallet::ISmartWalletCalls;
use crate::abi::{decode_any, DecodedArgs};
use crate::call::{DecodedCall, InnerCall, Route, RoutedCall};
use crate::selectors::selector_prefix;

/// Default ceiling on wrapper nesting.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Resolves raw call data into a [`DecodedCall`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallResolver {
    max_depth: usize,
}

impl Default for CallResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl CallResolver {
    /// Resolver that decodes at most `max_depth` nested levels.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolves `data`.
    pub fn resolve(&self, data: &[u8]) -> DecodedCall {
        self.resolve_at(data, 0)
    }

    fn resolve_at(&self, data: &[u8], depth: usize) -> DecodedCall {
        if data.is_empty() || data == [0u8] {
            return DecodedCall::NativeTransfer;
        }

        let Some(selector) = selector_prefix(data) else {
            return DecodedCall::Raw {
                data: Bytes::copy_from_slice(data),
            };
        };

        if depth >= self.max_depth {
            tracing::debug!(%selector, depth, "call nesting exceeds depth ceiling");
            return unknown(selector, data);
        }

        match decode_any(data) {
            Ok(args) => self.interpret(args, depth),
            Err(err) => {
                tracing::trace!(%selector, error = %err, "call data matched no schema");
                unknown(selector, data)
            }
        }
    }

    fn interpret(&self, args: DecodedArgs, depth: usize) -> DecodedCall {
        match args {
            DecodedArgs::EntryPoint(call) => self.entry_point(call, depth),
            DecodedArgs::SmartWallet(call) => self.wallet(call, depth),
            DecodedArgs::Multicall(call) => self.multicall(call, depth),
            DecodedArgs::Erc20(call) => erc20(call),
            DecodedArgs::Erc721(call) => erc721(call),
            DecodedArgs::Erc1155(call) => erc1155(call),
        }
    }

    fn inner(&self, target: Option<Address>, value: U256, data: Bytes, depth: usize) -> InnerCall {
        let decoded = self.resolve_at(&data, depth + 1);
        InnerCall {
            target,
            value,
            data,
            decoded,
        }
    }

    fn routed(&self, route: Route, calls: Vec<InnerCall>) -> DecodedCall {
        DecodedCall::RoutedCall(RoutedCall { route, calls })
    }

    fn entry_point(&self, call: IEntryPointCalls, depth: usize) -> DecodedCall {
        let calls = match call {
            IEntryPointCalls::handleOps_0(call) => call
                .ops
                .into_iter()
                .map(|op| self.inner(Some(op.sender), U256::ZERO, op.callData, depth))
                .collect(),
            IEntryPointCalls::handleOps_1(call) => call
                .ops
                .into_iter()
                .map(|op| self.inner(Some(op.sender), U256::ZERO, op.callData, depth))
                .collect(),
        };
        self.routed(Route::HandleOps, calls)
    }

    fn wallet(&self, call: ISmartWalletCalls, depth: usize) -> DecodedCall {
        use ISmartWalletCalls as W;

        match call {
            W::execute(call) => self.routed(
                Route::Execute,
                vec![self.inner(Some(call.dest), call.value, call.func, depth)],
            ),
            W::execute_ncC(call) => self.routed(
                Route::Execute,
                vec![self.inner(Some(call.dest), call.value, call.func, depth)],
            ),
            W::executeBatch_0(call) => self.batch(call.dest, Vec::new(), call.func, depth),
            W::executeBatch_1(call) => self.batch(call.dest, call.value, call.func, depth),
            W::executeBatch_2(call) => self.routed(
                Route::ExecuteBatch,
                call.calls
                    .into_iter()
                    .map(|c| self.inner(Some(c.target), c.value, c.data, depth))
                    .collect(),
            ),
            W::executeBatch_y6U(call) => self.batch(call.dest, call.value, call.func, depth),
            W::multicall(call) => self.routed(
                Route::Multicall,
                call.data
                    .into_iter()
                    .map(|data| self.inner(None, U256::ZERO, data, depth))
                    .collect(),
            ),
            W::execTransactionFromModule(call) => self.routed(
                Route::ModuleExecution,
                vec![self.inner(Some(call.to), call.value, call.data, depth)],
            ),
            W::execTransaction(call) => self.routed(
                Route::SafeTransaction,
                vec![self.inner(Some(call.to), call.value, call.data, depth)],
            ),
        }
    }

    /// Parallel-array batch. Lengths were checked by the decoder; an empty
    /// values array means every call carries zero value.
    fn batch(
        &self,
        targets: Vec<Address>,
        values: Vec<U256>,
        payloads: Vec<Bytes>,
        depth: usize,
    ) -> DecodedCall {
        let calls = targets
            .into_iter()
            .zip(payloads)
            .enumerate()
            .map(|(i, (target, data))| {
                let value = values.get(i).copied().unwrap_or(U256::ZERO);
                self.inner(Some(target), value, data, depth)
            })
            .collect();
        self.routed(Route::ExecuteBatch, calls)
    }

    fn multicall(&self, call: IMulticall3Calls, depth: usize) -> DecodedCall {
        let calls = match call {
            IMulticall3Calls::aggregate(call) => call
                .calls
                .into_iter()
                .map(|c| self.inner(Some(c.target), U256::ZERO, c.callData, depth))
                .collect(),
            IMulticall3Calls::tryAggregate(call) => call
                .calls
                .into_iter()
                .map(|c| self.inner(Some(c.target), U256::ZERO, c.callData, depth))
                .collect(),
            IMulticall3Calls::aggregate3(call) => call
                .calls
                .into_iter()
                .map(|c| self.inner(Some(c.target), U256::ZERO, c.callData, depth))
                .collect(),
            IMulticall3Calls::aggregate3Value(call) => call
                .calls
                .into_iter()
                .map(|c| self.inner(Some(c.target), c.value, c.callData, depth))
                .collect(),
        };
        self.routed(Route::Aggregate, calls)
    }
}

fn unknown(selector: Selector, data: &[u8]) -> DecodedCall {
    DecodedCall::UnknownFunction {
        selector,
        data: Bytes::copy_from_slice(data),
    }
}

fn erc20(call: IERC20Calls) -> DecodedCall {
    match call {
        IERC20Calls::transfer(c) => DecodedCall::Erc20Transfer {
            to: c.to,
            amount: c.amount,
        },
        IERC20Calls::transferFrom(c) => DecodedCall::Erc20TransferFrom {
            from: c.from,
            to: c.to,
            amount: c.amount,
        },
        IERC20Calls::approve(c) => DecodedCall::Erc20Approve {
            spender: c.spender,
            amount: c.amount,
        },
        IERC20Calls::mint(c) => DecodedCall::Erc20Mint {
            to: c.to,
            amount: c.amount,
        },
        IERC20Calls::burn_0(c) => DecodedCall::Erc20Burn {
            from: None,
            amount: c.amount,
        },
        IERC20Calls::burn_1(c) => DecodedCall::Erc20Burn {
            from: Some(c.from),
            amount: c.amount,
        },
    }
}

fn erc721(call: IERC721Calls) -> DecodedCall {
    match call {
        IERC721Calls::transferFrom(c) => DecodedCall::Erc721Transfer {
            function: "transferFrom",
            from: c.from,
            to: c.to,
            token_id: c.tokenId,
        },
        IERC721Calls::safeTransferFrom_0(c) => DecodedCall::Erc721Transfer {
            function: "safeTransferFrom",
            from: c.from,
            to: c.to,
            token_id: c.tokenId,
        },
        IERC721Calls::safeTransferFrom_1(c) => DecodedCall::Erc721Transfer {
            function: "safeTransferFrom",
            from: c.from,
            to: c.to,
            token_id: c.tokenId,
        },
        IERC721Calls::approve(c) => DecodedCall::Erc721Approve {
            to: c.to,
            token_id: c.tokenId,
        },
        IERC721Calls::setApprovalForAll(c) => DecodedCall::Erc721ApprovalForAll {
            operator: c.operator,
            approved: c.approved,
        },
    }
}

fn erc1155(call: IERC1155Calls) -> DecodedCall {
    match call {
        IERC1155Calls::safeTransferFrom(c) => DecodedCall::Erc1155Transfer {
            from: c.from,
            to: c.to,
            id: c.id,
            amount: c.amount,
        },
        IERC1155Calls::safeBatchTransferFrom(c) => DecodedCall::Erc1155BatchTransfer {
            from: c.from,
            to: c.to,
            ids: c.ids,
            amounts: c.amounts,
        },
        // Same selector as ERC-721; only reachable through `decode(Erc1155, ..)`.
        IERC1155Calls::setApprovalForAll(c) => DecodedCall::Erc721ApprovalForAll {
            operator: c.operator,
            approved: c.approved,
        },
    }
}

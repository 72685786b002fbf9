//! The decoded call tree.

use alloy::primitives::{Address, Bytes, Selector, U256};

use crate::normalize::{
    format_units, ToValue, Value, DEFAULT_TOKEN_DECIMALS, STABLECOIN_FALLBACK_DECIMALS,
};
use crate::selectors::function_name;

/// What a piece of call data does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCall {
    /// Empty call data: the enclosing call only moves native value.
    NativeTransfer,
    Erc20Transfer {
        to: Address,
        amount: U256,
    },
    Erc20TransferFrom {
        from: Address,
        to: Address,
        amount: U256,
    },
    Erc20Approve {
        spender: Address,
        amount: U256,
    },
    Erc20Mint {
        to: Address,
        amount: U256,
    },
    /// `burn(amount)` has no `from`; `burn(from, amount)` does.
    Erc20Burn {
        from: Option<Address>,
        amount: U256,
    },
    Erc721Transfer {
        function: &'static str,
        from: Address,
        to: Address,
        token_id: U256,
    },
    Erc721Approve {
        to: Address,
        token_id: U256,
    },
    Erc721ApprovalForAll {
        operator: Address,
        approved: bool,
    },
    Erc1155Transfer {
        from: Address,
        to: Address,
        id: U256,
        amount: U256,
    },
    Erc1155BatchTransfer {
        from: Address,
        to: Address,
        ids: Vec<U256>,
        amounts: Vec<U256>,
    },
    /// A wrapper whose payload(s) were decoded recursively.
    RoutedCall(RoutedCall),
    /// A selector no schema family could decode.
    UnknownFunction {
        selector: Selector,
        data: Bytes,
    },
    /// Bytes too short to hold a selector.
    Raw {
        data: Bytes,
    },
}

/// Which wrapper produced a [`RoutedCall`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `execute(address,uint256,bytes)` and variants.
    Execute,
    /// `executeBatch(...)` in all arities.
    ExecuteBatch,
    /// `multicall(bytes[])`.
    Multicall,
    /// Multicall3 `aggregate*`.
    Aggregate,
    /// Safe `execTransactionFromModule`.
    ModuleExecution,
    /// Safe `execTransaction`.
    SafeTransaction,
    /// EntryPoint `handleOps` nested inside call data.
    HandleOps,
}

impl Route {
    pub fn name(self) -> &'static str {
        match self {
            Route::Execute => "execute",
            Route::ExecuteBatch => "executeBatch",
            Route::Multicall => "multicall",
            Route::Aggregate => "aggregate",
            Route::ModuleExecution => "execTransactionFromModule",
            Route::SafeTransaction => "execTransaction",
            Route::HandleOps => "handleOps",
        }
    }
}

/// A routing wrapper and the calls it forwards, in encoding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCall {
    pub route: Route,
    pub calls: Vec<InnerCall>,
}

/// One forwarded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerCall {
    /// Call target; `None` for `multicall(bytes[])`, which calls itself.
    pub target: Option<Address>,
    /// Native value attached (zero when the wrapper carries none).
    pub value: U256,
    /// Raw payload.
    pub data: Bytes,
    /// Decoded payload.
    pub decoded: DecodedCall,
}

impl DecodedCall {
    /// Stable type tag used in rendered output.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedCall::NativeTransfer => "NATIVE_TRANSFER",
            DecodedCall::Erc20Transfer { .. } => "ERC20_TRANSFER",
            DecodedCall::Erc20TransferFrom { .. } => "ERC20_TRANSFER_FROM",
            DecodedCall::Erc20Approve { .. } => "ERC20_APPROVE",
            DecodedCall::Erc20Mint { .. } => "ERC20_MINT",
            DecodedCall::Erc20Burn { .. } => "ERC20_BURN",
            DecodedCall::Erc721Transfer { .. } => "ERC721_TRANSFER",
            DecodedCall::Erc721Approve { .. } => "ERC721_APPROVE",
            DecodedCall::Erc721ApprovalForAll { .. } => "ERC721_APPROVAL_FOR_ALL",
            DecodedCall::Erc1155Transfer { .. } => "ERC1155_TRANSFER",
            DecodedCall::Erc1155BatchTransfer { .. } => "ERC1155_BATCH_TRANSFER",
            DecodedCall::RoutedCall(_) => "ROUTED_CALL",
            DecodedCall::UnknownFunction { .. } => "UNKNOWN_FUNCTION",
            DecodedCall::Raw { .. } => "RAW_DATA",
        }
    }

    /// The routed wrapper, if this is one.
    pub fn as_routed(&self) -> Option<&RoutedCall> {
        match self {
            DecodedCall::RoutedCall(routed) => Some(routed),
            _ => None,
        }
    }

    /// Amount formatted the way leaf decoding does without token metadata:
    /// `transfer` at 6 decimals, other ERC-20 amounts at 18.
    ///
    /// Transfer records built with fetched decimals are the canonical
    /// rendering; this is the metadata-free fallback.
    pub fn leaf_formatted_amount(&self) -> Option<String> {
        match self {
            DecodedCall::Erc20Transfer { amount, .. } => {
                Some(format_units(*amount, STABLECOIN_FALLBACK_DECIMALS))
            }
            DecodedCall::Erc20TransferFrom { amount, .. }
            | DecodedCall::Erc20Approve { amount, .. }
            | DecodedCall::Erc20Mint { amount, .. }
            | DecodedCall::Erc20Burn { amount, .. } => {
                Some(format_units(*amount, DEFAULT_TOKEN_DECIMALS))
            }
            _ => None,
        }
    }

    /// Visits every forwarded call depth-first, parents before children.
    pub fn for_each_inner<'a>(&'a self, visit: &mut impl FnMut(&'a InnerCall)) {
        if let DecodedCall::RoutedCall(routed) = self {
            for inner in &routed.calls {
                visit(inner);
                inner.decoded.for_each_inner(visit);
            }
        }
    }

    /// Nesting depth: leaves are 1, each wrapper adds one.
    pub fn depth(&self) -> usize {
        match self {
            DecodedCall::RoutedCall(routed) => {
                1 + routed
                    .calls
                    .iter()
                    .map(|inner| inner.decoded.depth())
                    .max()
                    .unwrap_or(0)
            }
            _ => 1,
        }
    }
}

impl ToValue for DecodedCall {
    fn to_value(&self) -> Value {
        let kind = ("type", Value::from(self.kind()));
        let mut value = match self {
            DecodedCall::NativeTransfer => Value::map([
                kind,
                (
                    "description",
                    "Native token transfer (value carried by the enclosing call)".into(),
                ),
            ]),
            DecodedCall::Erc20Transfer { to, amount } => Value::map([
                kind,
                ("function", "transfer".into()),
                ("to", (*to).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc20TransferFrom { from, to, amount } => Value::map([
                kind,
                ("function", "transferFrom".into()),
                ("from", (*from).into()),
                ("to", (*to).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc20Approve { spender, amount } => Value::map([
                kind,
                ("function", "approve".into()),
                ("spender", (*spender).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc20Mint { to, amount } => Value::map([
                kind,
                ("function", "mint".into()),
                ("to", (*to).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc20Burn { from, amount } => Value::map([
                kind,
                ("function", "burn".into()),
                ("from", (*from).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc721Transfer {
                function,
                from,
                to,
                token_id,
            } => Value::map([
                kind,
                ("function", (*function).into()),
                ("from", (*from).into()),
                ("to", (*to).into()),
                ("tokenId", (*token_id).into()),
            ]),
            DecodedCall::Erc721Approve { to, token_id } => Value::map([
                kind,
                ("function", "approve".into()),
                ("to", (*to).into()),
                ("tokenId", (*token_id).into()),
            ]),
            DecodedCall::Erc721ApprovalForAll { operator, approved } => Value::map([
                kind,
                ("function", "setApprovalForAll".into()),
                ("operator", (*operator).into()),
                ("approved", (*approved).into()),
            ]),
            DecodedCall::Erc1155Transfer {
                from,
                to,
                id,
                amount,
            } => Value::map([
                kind,
                ("function", "safeTransferFrom".into()),
                ("from", (*from).into()),
                ("to", (*to).into()),
                ("id", (*id).into()),
                ("amount", (*amount).into()),
            ]),
            DecodedCall::Erc1155BatchTransfer {
                from,
                to,
                ids,
                amounts,
            } => Value::map([
                kind,
                ("function", "safeBatchTransferFrom".into()),
                ("from", (*from).into()),
                ("to", (*to).into()),
                ("ids", ids.clone().into()),
                ("amounts", amounts.clone().into()),
            ]),
            DecodedCall::RoutedCall(routed) => routed.to_value(),
            DecodedCall::UnknownFunction { selector, data } => Value::map([
                kind,
                ("functionSelector", selector.to_string().into()),
                ("knownAs", function_name(*selector).into()),
                ("data", data.into()),
            ]),
            DecodedCall::Raw { data } => Value::map([
                kind,
                ("data", data.into()),
                ("description", "Raw data that could not be decoded".into()),
            ]),
        };

        if let (Some(formatted), Value::Map(entries)) = (self.leaf_formatted_amount(), &mut value) {
            entries.push(("formattedAmount".to_string(), formatted.into()));
        }
        value
    }
}

impl ToValue for RoutedCall {
    fn to_value(&self) -> Value {
        Value::map([
            ("type", "ROUTED_CALL".into()),
            ("route", self.route.name().into()),
            (
                "calls",
                Value::Seq(self.calls.iter().map(ToValue::to_value).collect()),
            ),
        ])
    }
}

impl ToValue for InnerCall {
    fn to_value(&self) -> Value {
        Value::map([
            ("to", self.target.into()),
            ("value", self.value.into()),
            ("data", (&self.data).into()),
            ("decoded", self.decoded.to_value()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const ALICE: Address = address!("1111111111111111111111111111111111111111");
    const TOKEN: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

    fn routed(route: Route, decoded: Vec<DecodedCall>) -> DecodedCall {
        DecodedCall::RoutedCall(RoutedCall {
            route,
            calls: decoded
                .into_iter()
                .map(|decoded| InnerCall {
                    target: Some(TOKEN),
                    value: U256::ZERO,
                    data: Bytes::new(),
                    decoded,
                })
                .collect(),
        })
    }

    #[test]
    fn leaf_transfer_uses_stablecoin_decimals() {
        let call = DecodedCall::Erc20Transfer {
            to: ALICE,
            amount: U256::from(2_500_000u64),
        };
        assert_eq!(call.leaf_formatted_amount().as_deref(), Some("2.5"));

        let call = DecodedCall::Erc20Approve {
            spender: ALICE,
            amount: U256::from(10u64).pow(U256::from(18u8)),
        };
        assert_eq!(call.leaf_formatted_amount().as_deref(), Some("1.0"));
    }

    #[test]
    fn for_each_inner_walks_depth_first() {
        let tree = routed(
            Route::ExecuteBatch,
            vec![
                routed(Route::Execute, vec![DecodedCall::NativeTransfer]),
                DecodedCall::Erc20Transfer {
                    to: ALICE,
                    amount: U256::from(1u8),
                },
            ],
        );
        let mut kinds = Vec::new();
        tree.for_each_inner(&mut |inner| kinds.push(inner.decoded.kind()));
        assert_eq!(kinds, vec!["ROUTED_CALL", "NATIVE_TRANSFER", "ERC20_TRANSFER"]);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn rendered_routed_call_names_route() {
        let tree = routed(
            Route::Execute,
            vec![DecodedCall::Erc20Transfer {
                to: ALICE,
                amount: U256::from(1_000_000u64),
            }],
        );
        let value = tree.to_value();
        assert_eq!(value.get("route").and_then(Value::as_str), Some("execute"));

        let json = value.into_json();
        assert_eq!(json["calls"][0]["decoded"]["type"], "ERC20_TRANSFER");
        assert_eq!(json["calls"][0]["decoded"]["amount"], "1000000");
        assert_eq!(json["calls"][0]["decoded"]["formattedAmount"], "1.0");
    }
}

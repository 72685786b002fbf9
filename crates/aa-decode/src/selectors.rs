//! Function selector registry.
//!
//! A selector is the first four bytes of `keccak256(signature)`. Selectors
//! are not unique across unrelated interfaces (ERC-20 and ERC-721 share
//! `transferFrom` and `approve`), so the registry never maps a selector to a
//! single schema. Instead it records which [`SchemaFamily`] knows a signature,
//! and the decoder tries families in [`SchemaFamily::PRIORITY`] order.

use std::fmt;
use std::sync::OnceLock;

use alloy::primitives::{keccak256, Selector};

/// A group of related function schemas decoded together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaFamily {
    /// ERC-4337 EntryPoint (`handleOps`, v0.6 and v0.7 layouts).
    EntryPoint,
    /// Smart-wallet routing calls (`execute`, `executeBatch`, `multicall`, Safe).
    SmartWallet,
    /// Multicall3 aggregators.
    Multicall,
    /// Fungible tokens.
    Erc20,
    /// Non-fungible tokens.
    Erc721,
    /// Multi-tokens.
    Erc1155,
}

impl SchemaFamily {
    /// Decode order. Routing wrappers are peeled before leaf token calls are
    /// attempted; token families follow real-world frequency.
    pub const PRIORITY: [SchemaFamily; 6] = [
        SchemaFamily::EntryPoint,
        SchemaFamily::SmartWallet,
        SchemaFamily::Multicall,
        SchemaFamily::Erc20,
        SchemaFamily::Erc721,
        SchemaFamily::Erc1155,
    ];

    /// True for families whose calls wrap further call data.
    pub fn is_routing(self) -> bool {
        matches!(
            self,
            SchemaFamily::EntryPoint | SchemaFamily::SmartWallet | SchemaFamily::Multicall
        )
    }

    /// Human-readable family name.
    pub fn name(self) -> &'static str {
        match self {
            SchemaFamily::EntryPoint => "EntryPoint",
            SchemaFamily::SmartWallet => "smart-wallet",
            SchemaFamily::Multicall => "Multicall",
            SchemaFamily::Erc20 => "ERC-20",
            SchemaFamily::Erc721 => "ERC-721",
            SchemaFamily::Erc1155 => "ERC-1155",
        }
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical signatures the engine recognizes, with their family.
///
/// Tuple parameters are written in expanded form, as hashed on chain.
pub const KNOWN_SIGNATURES: &[(SchemaFamily, &str)] = &[
    (
        SchemaFamily::EntryPoint,
        "handleOps((address,uint256,bytes,bytes,uint256,uint256,uint256,uint256,uint256,bytes,bytes)[],address)",
    ),
    (
        SchemaFamily::EntryPoint,
        "handleOps((address,uint256,bytes,bytes,bytes32,uint256,bytes32,bytes,bytes)[],address)",
    ),
    (SchemaFamily::SmartWallet, "execute(address,uint256,bytes)"),
    (SchemaFamily::SmartWallet, "execute_ncC(address,uint256,bytes)"),
    (SchemaFamily::SmartWallet, "executeBatch(address[],bytes[])"),
    (SchemaFamily::SmartWallet, "executeBatch(address[],uint256[],bytes[])"),
    (SchemaFamily::SmartWallet, "executeBatch((address,uint256,bytes)[])"),
    (SchemaFamily::SmartWallet, "executeBatch_y6U(address[],uint256[],bytes[])"),
    (SchemaFamily::SmartWallet, "multicall(bytes[])"),
    (
        SchemaFamily::SmartWallet,
        "execTransactionFromModule(address,uint256,bytes,uint8)",
    ),
    (
        SchemaFamily::SmartWallet,
        "execTransaction(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,bytes)",
    ),
    (SchemaFamily::Multicall, "aggregate((address,bytes)[])"),
    (SchemaFamily::Multicall, "tryAggregate(bool,(address,bytes)[])"),
    (SchemaFamily::Multicall, "aggregate3((address,bool,bytes)[])"),
    (SchemaFamily::Multicall, "aggregate3Value((address,bool,uint256,bytes)[])"),
    (SchemaFamily::Erc20, "transfer(address,uint256)"),
    (SchemaFamily::Erc20, "transferFrom(address,address,uint256)"),
    (SchemaFamily::Erc20, "approve(address,uint256)"),
    (SchemaFamily::Erc20, "mint(address,uint256)"),
    (SchemaFamily::Erc20, "burn(uint256)"),
    (SchemaFamily::Erc20, "burn(address,uint256)"),
    (SchemaFamily::Erc721, "transferFrom(address,address,uint256)"),
    (SchemaFamily::Erc721, "safeTransferFrom(address,address,uint256)"),
    (SchemaFamily::Erc721, "safeTransferFrom(address,address,uint256,bytes)"),
    (SchemaFamily::Erc721, "approve(address,uint256)"),
    (SchemaFamily::Erc721, "setApprovalForAll(address,bool)"),
    (
        SchemaFamily::Erc1155,
        "safeTransferFrom(address,address,uint256,uint256,bytes)",
    ),
    (
        SchemaFamily::Erc1155,
        "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
    ),
    (SchemaFamily::Erc1155, "setApprovalForAll(address,bool)"),
];

/// Selector of a canonical function signature.
pub fn selector_of(signature: &str) -> Selector {
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}

/// First four bytes of call data, if there are that many.
pub fn selector_prefix(data: &[u8]) -> Option<Selector> {
    data.get(..4).map(Selector::from_slice)
}

/// A registered signature and its precomputed selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KnownFunction {
    /// Family that decodes it.
    pub family: SchemaFamily,
    /// Canonical signature.
    pub signature: &'static str,
    /// `selector_of(signature)`.
    pub selector: Selector,
}

impl KnownFunction {
    /// Function name without the parameter list.
    pub fn name(&self) -> &'static str {
        self.signature
            .split_once('(')
            .map_or(self.signature, |(name, _)| name)
    }
}

fn registry() -> &'static [KnownFunction] {
    static REGISTRY: OnceLock<Vec<KnownFunction>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        KNOWN_SIGNATURES
            .iter()
            .map(|&(family, signature)| KnownFunction {
                family,
                signature,
                selector: selector_of(signature),
            })
            .collect()
    })
}

/// All registered functions sharing `selector`, in family priority order.
pub fn lookup(selector: Selector) -> Vec<KnownFunction> {
    let mut matches: Vec<KnownFunction> = registry()
        .iter()
        .filter(|known| known.selector == selector)
        .copied()
        .collect();
    matches.sort_by_key(|known| {
        SchemaFamily::PRIORITY
            .iter()
            .position(|family| *family == known.family)
    });
    matches
}

/// Best-known function name for a selector, used for labelling unknown calls.
pub fn function_name(selector: Selector) -> Option<&'static str> {
    lookup(selector).first().map(KnownFunction::name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::fixed_bytes;

    #[test]
    fn well_known_selectors() {
        assert_eq!(selector_of("transfer(address,uint256)"), fixed_bytes!("a9059cbb"));
        assert_eq!(
            selector_of("transferFrom(address,address,uint256)"),
            fixed_bytes!("23b872dd")
        );
        assert_eq!(selector_of("approve(address,uint256)"), fixed_bytes!("095ea7b3"));
        assert_eq!(selector_of("execute(address,uint256,bytes)"), fixed_bytes!("b61d27f6"));
        assert_eq!(selector_of("executeBatch(address[],bytes[])"), fixed_bytes!("18dfb3c7"));
        assert_eq!(selector_of("multicall(bytes[])"), fixed_bytes!("ac9650d8"));
        assert_eq!(selector_of("aggregate((address,bytes)[])"), fixed_bytes!("252dba42"));
        assert_eq!(selector_of("setApprovalForAll(address,bool)"), fixed_bytes!("a22cb465"));
        assert_eq!(selector_of(KNOWN_SIGNATURES[0].1), fixed_bytes!("1fad948c"));
        assert_eq!(selector_of(KNOWN_SIGNATURES[1].1), fixed_bytes!("765e827f"));
    }

    #[test]
    fn selector_prefix_needs_four_bytes() {
        assert_eq!(selector_prefix(&[0xa9, 0x05, 0x9c]), None);
        assert_eq!(
            selector_prefix(&[0xa9, 0x05, 0x9c, 0xbb, 0x00]),
            Some(fixed_bytes!("a9059cbb"))
        );
    }

    #[test]
    fn colliding_selectors_sorted_by_priority() {
        let hits = lookup(selector_of("transferFrom(address,address,uint256)"));
        let families: Vec<_> = hits.iter().map(|k| k.family).collect();
        assert_eq!(families, vec![SchemaFamily::Erc20, SchemaFamily::Erc721]);

        let hits = lookup(selector_of("setApprovalForAll(address,bool)"));
        assert_eq!(hits[0].family, SchemaFamily::Erc721);
        assert_eq!(hits[1].family, SchemaFamily::Erc1155);
    }

    #[test]
    fn function_name_strips_params() {
        assert_eq!(function_name(fixed_bytes!("a9059cbb")), Some("transfer"));
        assert_eq!(function_name(fixed_bytes!("deadbeef")), None);
    }

    #[test]
    fn routing_families_come_first() {
        let first_leaf = SchemaFamily::PRIORITY
            .iter()
            .position(|f| !f.is_routing())
            .unwrap();
        assert!(SchemaFamily::PRIORITY[first_leaf..]
            .iter()
            .all(|f| !f.is_routing()));
    }
}

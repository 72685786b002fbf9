//! Decode failures.
//!
//! `SchemaMismatch` and `MalformedEncoding` describe a single decode attempt
//! and are absorbed by the call-data resolver. `NotAnEntryPointCall` is the
//! only kind that escapes the engine.

use alloy::primitives::Selector;

use crate::selectors::SchemaFamily;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The selector is not declared by the family (or there is no selector).
    #[error("{}", mismatch_message(*.family, *.selector))]
    SchemaMismatch {
        family: Option<SchemaFamily>,
        selector: Option<Selector>,
    },

    /// The selector matched but the arguments do not parse.
    #[error("{family} call {selector} is malformed: {reason}")]
    MalformedEncoding {
        family: SchemaFamily,
        selector: Selector,
        reason: String,
    },

    /// The outer call is not an EntryPoint `handleOps`.
    #[error(
        "not an EntryPoint handleOps call (selector {}): {reason}",
        display_selector(*.selector)
    )]
    NotAnEntryPointCall {
        selector: Option<Selector>,
        reason: String,
    },
}

fn display_selector(selector: Option<Selector>) -> String {
    selector.map_or_else(|| "none".to_string(), |s| s.to_string())
}

fn mismatch_message(family: Option<SchemaFamily>, selector: Option<Selector>) -> String {
    match (family, selector) {
        (_, None) => "call data is too short to carry a selector".to_string(),
        (Some(family), Some(selector)) => format!("selector {selector} is not a {family} function"),
        (None, Some(selector)) => format!("selector {selector} matches no known schema family"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::fixed_bytes;

    #[test]
    fn messages_name_the_selector() {
        let err = DecodeError::SchemaMismatch {
            family: None,
            selector: Some(fixed_bytes!("deadbeef")),
        };
        assert_eq!(
            err.to_string(),
            "selector 0xdeadbeef matches no known schema family"
        );

        let err = DecodeError::NotAnEntryPointCall {
            selector: None,
            reason: "empty input".into(),
        };
        assert!(err.to_string().contains("selector none"));
    }
}

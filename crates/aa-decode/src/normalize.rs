//! Numeric normalization for the output boundary.
//!
//! Decoded structures are rendered into [`Value`], a closed set of shapes
//! (scalar, sequence, mapping). [`normalize`] rewrites every arbitrary
//! precision integer into its base-10 string so no consumer can truncate it.
//! Token amounts are formatted with [`format_units`].

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Decimals used when a token's real decimals are unknown.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Decimals applied to leaf `transfer` amounts decoded from call data
/// (USDT/USDC convention).
pub const STABLECOIN_FALLBACK_DECIMALS: u8 = 6;

/// Decimals of gwei relative to wei.
pub const GWEI_DECIMALS: u8 = 9;

/// A rendered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Small machine integer (indices, block numbers, decimals).
    Number(u64),
    /// Arbitrary precision integer. Removed by [`normalize`].
    Uint(U256),
    Text(String),
    Seq(Vec<Value>),
    /// Ordered key/value pairs.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Builds a mapping, keeping entry order.
    pub fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    /// Looks up a key in a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Text content, if this is a text leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Converts to `serde_json::Value`. Integers become decimal strings.
    pub fn into_json(self) -> serde_json::Value {
        match normalize(self) {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::from(n),
            Value::Uint(u) => serde_json::Value::String(u.to_string()),
            Value::Text(text) => serde_json::Value::String(text),
            Value::Seq(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }
}

/// Rewrites every [`Value::Uint`] into a decimal [`Value::Text`].
///
/// Idempotent: a normalized value contains no `Uint` leaves.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Uint(u) => Value::Text(u.to_string()),
        Value::Seq(items) => Value::Seq(items.into_iter().map(normalize).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, normalize(value)))
                .collect(),
        ),
        other => other,
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_u64(*n),
            Value::Uint(u) => serializer.serialize_str(&u.to_string()),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Types that can be rendered for the output boundary.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as u64)
    }
}

impl From<U256> for Value {
    fn from(u: U256) -> Self {
        Value::Uint(u)
    }
}

impl From<Address> for Value {
    fn from(address: Address) -> Self {
        Value::Text(address.to_checksum(None))
    }
}

impl From<B256> for Value {
    fn from(hash: B256) -> Self {
        Value::Text(hash.to_string())
    }
}

impl From<&Bytes> for Value {
    fn from(bytes: &Bytes) -> Self {
        Value::Text(bytes.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(option: Option<T>) -> Self {
        option.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

/// Formats an integer amount with `decimals` fractional digits.
///
/// Trailing fractional zeros are trimmed, keeping at least one digit:
/// `1000000` at 6 decimals is `"1.0"`, `1500` at 6 is `"0.0015"`.
///
/// `alloy::primitives::utils::format_units` pads the fraction to the full
/// decimal count (`"1.000000"`); rendered amounts use the trimmed form.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);

    let (whole, fraction) = if digits.len() > decimals {
        let (whole, fraction) = digits.split_at(digits.len() - decimals);
        (whole.to_string(), fraction.to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    };

    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Formats a wei amount in gwei.
pub fn format_gwei(wei: U256) -> String {
    format_units(wei, GWEI_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn nested() -> Value {
        Value::map([
            ("amount", Value::Uint(U256::from(1_000_000u64))),
            ("to", address!("1111111111111111111111111111111111111111").into()),
            (
                "batch",
                Value::Seq(vec![
                    Value::Uint(U256::MAX),
                    Value::map([("inner", Value::Uint(U256::from(7u8)))]),
                ]),
            ),
            ("index", Value::Number(3)),
            ("ok", Value::Bool(true)),
        ])
    }

    fn contains_uint(value: &Value) -> bool {
        match value {
            Value::Uint(_) => true,
            Value::Seq(items) => items.iter().any(contains_uint),
            Value::Map(entries) => entries.iter().any(|(_, v)| contains_uint(v)),
            _ => false,
        }
    }

    #[test]
    fn normalize_converts_every_big_integer() {
        let normalized = normalize(nested());
        assert!(!contains_uint(&normalized));
        assert_eq!(normalized.get("amount").and_then(Value::as_str), Some("1000000"));
        assert_eq!(normalized.get("index"), Some(&Value::Number(3)));
        assert_eq!(normalized.get("ok"), Some(&Value::Bool(true)));
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize(nested());
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn json_never_emits_large_numbers() {
        let json = nested().into_json();
        assert_eq!(
            json["batch"][0],
            serde_json::Value::String(U256::MAX.to_string())
        );
        assert_eq!(json["batch"][1]["inner"], serde_json::Value::String("7".into()));
        assert_eq!(json["index"], serde_json::json!(3));
    }

    #[test]
    fn serialize_matches_into_json() {
        let serialized = serde_json::to_value(nested()).unwrap();
        assert_eq!(serialized, nested().into_json());
    }

    #[test]
    fn format_units_matches_expected_strings() {
        assert_eq!(format_units(U256::from(1_000_000u64), 6), "1.0");
        assert_eq!(format_units(U256::from(1_500u64), 6), "0.0015");
        assert_eq!(format_units(U256::from(123_456_789u64), 6), "123.456789");
        assert_eq!(format_units(U256::ZERO, 18), "0.0");
        assert_eq!(format_units(U256::from(42u8), 0), "42.0");
    }

    #[test]
    fn format_gwei_scales_by_nine() {
        assert_eq!(format_gwei(U256::from(1_500_000_000u64)), "1.5");
    }
}

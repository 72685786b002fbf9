//! aa-decode crate
//!
//! Pure decoding engine for ERC-4337 bundles: selector registry, ABI
//! decoding by schema family, recursive call-data resolution, UserOperation
//! extraction and numeric normalization. No I/O.

pub mod abi;
pub mod call;
pub mod error;
pub mod normalize;
pub mod resolver;
pub mod selectors;
pub mod user_op;

pub use call::{DecodedCall, InnerCall, Route, RoutedCall};
pub use error::DecodeError;
pub use normalize::{format_units, normalize, ToValue, Value};
pub use resolver::{CallResolver, DEFAULT_MAX_DEPTH};
pub use selectors::SchemaFamily;
pub use user_op::{
    extract_user_operations, EntryPointVersion, HandleOps, ParsedUserOperation, UserOperation,
};

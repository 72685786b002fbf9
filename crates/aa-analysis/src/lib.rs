//! aa-analysis crate
//!
//! Turns a fetched bundle transaction into an [`AaTransactionResult`]:
//! receipt retry policy, EntryPoint events, transfer records and token
//! metadata.

pub mod analyzer;
pub mod error;
pub mod events;
pub mod metadata;
pub mod report;
pub mod transfers;

pub use analyzer::{known_entry_point, AaAnalyzer, AnalyzerConfig, KNOWN_ENTRY_POINTS};
pub use error::AaError;
pub use events::EntryPointEvent;
pub use metadata::TokenMetadataCache;
pub use report::AaTransactionResult;
pub use transfers::{DecimalsSource, TokenId, TransferRecord, TransferSource};

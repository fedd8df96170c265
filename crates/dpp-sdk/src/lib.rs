//! High-level SDK for passport anchoring.
//!
//! [`Anchor`] is the main entry point for applications that keep passports
//! in their own record store: it saves master, version, and dynamic hashes
//! to the ledger, reads them back, and verifies records against them.

pub mod anchor;
pub mod book;
pub mod config;
pub mod error;

pub use anchor::{Anchor, AnchorSummary};
pub use book::RecordBook;
pub use config::{AnchorConfig, HashingConfig, LedgerConfig, SIGNING_KEY_ENV};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use dpp_crypto::{DynamicHashScheme, HashEngine, SigningKey, VerifyingKey};
pub use dpp_ledger::{
    ConfirmationPolicy, HashClass, HashRecord, InMemoryLedger, LedgerClient, LedgerError,
    VersionHashRecord, VersionHashes,
};
pub use dpp_types::{Attributes, Digest, Passport, RecordId, Timestamp, Version};
pub use dpp_verify::{
    Disagreement, IntegrityStatus, Verdict, VerificationReport, VerifyError, VerifyResult,
};

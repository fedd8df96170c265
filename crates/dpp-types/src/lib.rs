//! Foundation types for passport anchoring.
//!
//! This crate provides the identifier, digest, temporal, and record types
//! shared by every other `dpp-*` crate.
//!
//! # Key Types
//!
//! - [`RecordId`] — Fixed-width 12-byte passport identifier, the ledger key
//! - [`Digest`] — 32-byte hash value as stored on the ledger
//! - [`Timestamp`] — UTC instant read from the record store
//! - [`Passport`] / [`Version`] — Versioned product record with append-only history

pub mod digest;
pub mod error;
pub mod record;
pub mod record_id;
pub mod temporal;

pub use digest::Digest;
pub use error::TypeError;
pub use record::{Attachment, Attributes, Passport, Version, VersionLink};
pub use record_id::RecordId;
pub use temporal::{to_unix_seconds, Timestamp};

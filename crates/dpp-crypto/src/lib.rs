//! Cryptographic primitives for passport anchoring.
//!
//! Provides the frozen canonical encoding of record content, the three hash
//! classes (master, version, dynamic) over Keccak-256, and Ed25519 keys used
//! to authenticate ledger transactions.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod canonical;
pub mod hasher;
pub mod signer;

pub use canonical::{
    canonical_json, encode_payload, to_canonical_json, PayloadPart, CANONICAL_FORMAT,
};
pub use hasher::{DynamicHashScheme, HashEngine, HasherError, HASH_FUNCTION};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};

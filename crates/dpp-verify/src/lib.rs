//! Integrity verification for anchored passports.
//!
//! Each check recomputes a hash, fetches the anchored value, and compares
//! both with a caller-supplied claim. The outcome is a
//! [`VerificationReport`] whose [`Verdict`] is `Valid` only if all three
//! agree; ledger or hashing faults surface as [`VerifyError`] instead.

pub mod engine;
pub mod error;
pub mod report;

pub use engine::VerificationEngine;
pub use error::{VerifyError, VerifyResult};
pub use report::{Disagreement, IntegrityStatus, Verdict, VerificationReport};

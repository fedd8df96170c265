use dpp_crypto::HasherError;
use dpp_ledger::LedgerError;
use dpp_types::RecordId;
use thiserror::Error;

/// Integrity could not be determined. A failed comparison is not an error;
/// it is a [`Verdict::Mismatch`](crate::Verdict::Mismatch).
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("record {record} has no local version {version}")]
    VersionNotFound { record: RecordId, version: u64 },

    #[error("hashing failed: {0}")]
    Hashing(#[from] HasherError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub type VerifyResult<T> = Result<T, VerifyError>;

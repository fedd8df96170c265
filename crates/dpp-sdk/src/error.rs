use dpp_crypto::HasherError;
use dpp_ledger::LedgerError;
use dpp_types::{RecordId, TypeError};
use dpp_verify::VerifyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("record already exists: {0}")]
    RecordExists(RecordId),

    #[error("invalid record: {0}")]
    Record(#[from] TypeError),

    #[error("hashing failed: {0}")]
    Hashing(#[from] HasherError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;

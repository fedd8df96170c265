use std::time::Duration;

use dpp_crypto::HasherError;
use dpp_types::RecordId;
use thiserror::Error;

use crate::contract::{HashClass, TxHash};

/// Errors produced by ledger client operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger write failed: {0}")]
    WriteFailed(String),

    #[error("transaction {tx} not confirmed within {waited:?}")]
    ConfirmationTimeout { tx: TxHash, waited: Duration },

    #[error("no {class} hash on the ledger for record {record}{}", version_suffix(.version))]
    RecordNotFound {
        record: RecordId,
        class: HashClass,
        version: Option<u64>,
    },

    #[error("ledger read failed: {0}")]
    ReadFailed(String),

    #[error("invalid ledger client configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Encoding(#[from] HasherError),
}

impl LedgerError {
    /// Returns `true` for failures on the write path.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteFailed(_) | Self::ConfirmationTimeout { .. })
    }
}

fn version_suffix(version: &Option<u64>) -> String {
    version.map(|v| format!(" version {v}")).unwrap_or_default()
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors raised by a [`LedgerTransport`](crate::LedgerTransport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(String),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),
}

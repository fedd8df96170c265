use async_trait::async_trait;
use dpp_crypto::VerifyingKey;
use serde_json::Value;

use crate::contract::{CallRequest, SignedCall, TxHash, TxReceipt};
use crate::error::TransportError;

/// Connection to a ledger node exposing the anchoring contract.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Submit a signed state-changing call. Returns once the node accepted
    /// it, not once it is final.
    async fn send_transaction(&self, call: &SignedCall) -> Result<TxHash, TransportError>;

    /// `None` while the transaction is pending or unknown.
    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>, TransportError>;

    /// Execute a read-only call. `Value::Null` means no entry.
    async fn call(&self, request: &CallRequest) -> Result<Value, TransportError>;

    /// Next nonce the ledger expects from `sender`.
    async fn transaction_count(&self, sender: &VerifyingKey) -> Result<u64, TransportError>;
}

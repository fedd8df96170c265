use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dpp_crypto::VerifyingKey;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::contract::{CallRequest, SignedCall, TxHash, TxReceipt};
use crate::error::TransportError;
use crate::transport::LedgerTransport;

/// JSON-RPC method names served by the anchoring gateway. The gateway holds
/// the contract and accepts ed25519-signed calls; it is not an EVM node.
pub mod methods {
    pub const SEND_TRANSACTION: &str = "ledger_sendTransaction";
    pub const GET_TRANSACTION_RECEIPT: &str = "ledger_getTransactionReceipt";
    pub const CALL: &str = "ledger_call";
    pub const GET_TRANSACTION_COUNT: &str = "ledger_getTransactionCount";
}

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// Extract the typed result, surfacing a JSON-RPC error object as
    /// [`TransportError::Rpc`]. A missing result decodes as `null`.
    pub fn into_result<R: DeserializeOwned>(self) -> Result<R, TransportError> {
        if let Some(err) = self.error {
            let message = match err.data {
                Some(Value::String(data)) => format!("{}: {data}", err.message),
                _ => err.message,
            };
            return Err(TransportError::Rpc {
                code: err.code,
                message,
            });
        }
        serde_json::from_value(self.result.unwrap_or(Value::Null))
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// [`LedgerTransport`] speaking JSON-RPC 2.0 over HTTP.
pub struct RpcTransport {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request<P, R>(&self, method: &str, params: P) -> Result<R, TransportError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };
        debug!(endpoint = %self.endpoint, method, id, "rpc request");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        envelope.into_result()
    }
}

#[async_trait]
impl LedgerTransport for RpcTransport {
    async fn send_transaction(&self, call: &SignedCall) -> Result<TxHash, TransportError> {
        self.request(methods::SEND_TRANSACTION, [call]).await
    }

    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>, TransportError> {
        self.request(methods::GET_TRANSACTION_RECEIPT, [tx]).await
    }

    async fn call(&self, request: &CallRequest) -> Result<Value, TransportError> {
        self.request(methods::CALL, [request]).await
    }

    async fn transaction_count(&self, sender: &VerifyingKey) -> Result<u64, TransportError> {
        self.request(methods::GET_TRANSACTION_COUNT, [sender]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractCall, TxStatus};
    use dpp_types::{Digest, RecordId};

    #[test]
    fn request_envelope_shape() {
        let request = CallRequest {
            contract: "0x5fbdb2315678afecb367f032d93f642f64180aa3".into(),
            call: ContractCall::GetHash {
                key: RecordId::from_bytes([0xab; 12]),
            },
        };
        let body = RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: 9,
            method: methods::CALL,
            params: [&request],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 9);
        assert_eq!(json["method"], "ledger_call");
        assert_eq!(json["params"][0]["call"]["method"], "getHash");
        assert_eq!(json["params"][0]["call"]["key"], "0xabababababababababababab");
    }

    #[test]
    fn decodes_result() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":{"timestamp":1700000000,"hash":"0x0101010101010101010101010101010101010101010101010101010101010101"}}"#;
        let envelope: RpcResponse = serde_json::from_str(raw).unwrap();
        let value: Value = envelope.into_result().unwrap();
        assert_eq!(value["timestamp"], 1_700_000_000u64);
    }

    #[test]
    fn decodes_pending_receipt_as_none() {
        let raw = r#"{"jsonrpc":"2.0","id":2,"result":null}"#;
        let envelope: RpcResponse = serde_json::from_str(raw).unwrap();
        let receipt: Option<TxReceipt> = envelope.into_result().unwrap();
        assert!(receipt.is_none());
    }

    #[test]
    fn decodes_confirmed_receipt() {
        let tx = TxHash(Digest::from_hash([3; 32]));
        let raw = format!(
            r#"{{"jsonrpc":"2.0","id":3,"result":{{"transactionHash":"{tx}","status":"confirmed","blockNumber":12}}}}"#
        );
        let envelope: RpcResponse = serde_json::from_str(&raw).unwrap();
        let receipt: Option<TxReceipt> = envelope.into_result().unwrap();
        let receipt = receipt.unwrap();
        assert_eq!(receipt.transaction_hash, tx);
        assert_eq!(receipt.status, TxStatus::Confirmed);
        assert_eq!(receipt.block_number, 12);
    }

    #[test]
    fn error_object_becomes_rpc_error() {
        let raw = r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32000,"message":"execution reverted","data":"bad key"}}"#;
        let envelope: RpcResponse = serde_json::from_str(raw).unwrap();
        let err = envelope.into_result::<Value>().unwrap_err();
        assert_eq!(
            err,
            TransportError::Rpc {
                code: -32000,
                message: "execution reverted: bad key".into()
            }
        );
    }

    #[test]
    fn malformed_result_is_decode_error() {
        let raw = r#"{"jsonrpc":"2.0","id":5,"result":"not-a-hash"}"#;
        let envelope: RpcResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            envelope.into_result::<TxHash>(),
            Err(TransportError::Decode(_))
        ));
    }

    #[test]
    fn transport_builds() {
        let transport =
            RpcTransport::new("http://127.0.0.1:8600/rpc", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:8600/rpc");
    }

    #[tokio::test]
    async fn unreachable_node_is_http_error() {
        let transport =
            RpcTransport::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = transport
            .call(&CallRequest {
                contract: "0x00".into(),
                call: ContractCall::GetHash {
                    key: RecordId::from_bytes([1; 12]),
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }
}

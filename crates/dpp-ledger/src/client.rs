use std::sync::Arc;
use std::time::Duration;

use dpp_crypto::{SigningKey, VerifyingKey};
use dpp_types::{Digest, RecordId};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::contract::{
    CallRequest, ContractCall, HashClass, HashRecord, SignedCall, TxHash, TxReceipt, TxStatus,
    VersionHashRecord, VersionHashes,
};
use crate::error::{LedgerError, LedgerResult};
use crate::rpc::RpcTransport;
use crate::transport::LedgerTransport;

/// How long to wait for a submitted transaction to become final.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for the anchoring contract.
///
/// Every `store_*` call signs and submits a transaction, then waits until the
/// ledger reports it final or the confirmation timeout elapses. Nothing is
/// retried here: a write whose outcome is unknown surfaces as an error and
/// the caller decides whether to resubmit.
pub struct LedgerClient {
    transport: Arc<dyn LedgerTransport>,
    signer: SigningKey,
    contract: String,
    policy: ConfirmationPolicy,
    nonce: Mutex<u64>,
}

impl LedgerClient {
    /// Open a client over an existing transport. Fetches the sender's next
    /// nonce from the ledger.
    pub async fn open(
        transport: Arc<dyn LedgerTransport>,
        signer: SigningKey,
        contract: impl Into<String>,
        policy: ConfirmationPolicy,
    ) -> LedgerResult<Self> {
        let contract = contract.into();
        if policy.poll_interval.is_zero() || policy.timeout.is_zero() {
            return Err(LedgerError::Config(
                "poll interval and confirmation timeout must be non-zero".into(),
            ));
        }
        let sender = signer.verifying_key();
        let nonce = transport
            .transaction_count(&sender)
            .await
            .map_err(|e| LedgerError::ReadFailed(format!("fetching nonce: {e}")))?;
        info!(%contract, %sender, nonce, "ledger client opened");
        Ok(Self {
            transport,
            signer,
            contract,
            policy,
            nonce: Mutex::new(nonce),
        })
    }

    /// Open a client against a JSON-RPC endpoint.
    pub async fn connect(
        endpoint: &str,
        request_timeout: Duration,
        signer: SigningKey,
        contract: impl Into<String>,
        policy: ConfirmationPolicy,
    ) -> LedgerResult<Self> {
        let transport = RpcTransport::new(endpoint, request_timeout)
            .map_err(|e| LedgerError::Config(e.to_string()))?;
        Self::open(Arc::new(transport), signer, contract, policy).await
    }

    /// Release the connection.
    pub fn close(self) {
        info!(contract = %self.contract, "ledger client closed");
    }

    pub fn sender(&self) -> VerifyingKey {
        self.signer.verifying_key()
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    // ---- Writes ----

    pub async fn store_master_hash(
        &self,
        id: &RecordId,
        timestamp: u64,
        hash: Digest,
    ) -> LedgerResult<Digest> {
        self.store(ContractCall::StoreHash {
            key: *id,
            timestamp,
            hash,
        })
        .await?;
        Ok(hash)
    }

    pub async fn store_version_hash(
        &self,
        id: &RecordId,
        timestamp: u64,
        hash: Digest,
        version: u64,
    ) -> LedgerResult<Digest> {
        self.store(ContractCall::StoreVersionHash {
            key: *id,
            timestamp,
            hash,
            version,
        })
        .await?;
        Ok(hash)
    }

    pub async fn store_dynamic_hash(
        &self,
        id: &RecordId,
        timestamp: u64,
        hash: Digest,
    ) -> LedgerResult<Digest> {
        self.store(ContractCall::StoreDynamicHash {
            key: *id,
            timestamp,
            hash,
        })
        .await?;
        Ok(hash)
    }

    // ---- Reads ----

    pub async fn get_master_hash(&self, id: &RecordId) -> LedgerResult<HashRecord> {
        let record: Option<HashRecord> = self.read(ContractCall::GetHash { key: *id }).await?;
        match record {
            Some(r) if !r.is_unset() => Ok(r),
            _ => Err(not_found(id, HashClass::Master, None)),
        }
    }

    pub async fn get_dynamic_hash(&self, id: &RecordId) -> LedgerResult<HashRecord> {
        let record: Option<HashRecord> = self
            .read(ContractCall::GetDynamicHash { key: *id })
            .await?;
        match record {
            Some(r) if !r.is_unset() => Ok(r),
            _ => Err(not_found(id, HashClass::Dynamic, None)),
        }
    }

    /// Fetch the triple stored for `version`. The ledger's own version number
    /// must match the one requested.
    pub async fn get_version_hash(
        &self,
        id: &RecordId,
        version: u64,
    ) -> LedgerResult<VersionHashRecord> {
        let record: Option<VersionHashRecord> = self
            .read(ContractCall::GetVersionHash { key: *id, version })
            .await?;
        match record {
            Some(r) if r.is_unset() => Err(not_found(id, HashClass::Version, Some(version))),
            Some(r) if r.version != version => Err(LedgerError::ReadFailed(format!(
                "ledger returned version {} for requested version {version} of {id}",
                r.version
            ))),
            Some(r) => Ok(r),
            None => Err(not_found(id, HashClass::Version, Some(version))),
        }
    }

    /// All version triples in ledger order.
    pub async fn get_all_version_hashes(&self, id: &RecordId) -> LedgerResult<VersionHashes> {
        let all: Option<VersionHashes> = self
            .read(ContractCall::GetVersionHashes { key: *id })
            .await?;
        match all {
            Some(all) if !all.is_aligned() => Err(LedgerError::ReadFailed(format!(
                "misaligned version lists for {id}: {} timestamps, {} hashes, {} versions",
                all.timestamps.len(),
                all.hashes.len(),
                all.versions.len()
            ))),
            Some(all) if !all.is_empty() => Ok(all),
            _ => Err(not_found(id, HashClass::Version, None)),
        }
    }

    // ---- Internals ----

    async fn store(&self, call: ContractCall) -> LedgerResult<TxReceipt> {
        let key = *call.key();
        let class = call.class();
        let tx = {
            // Held across submission so nonces reach the ledger in order.
            let mut nonce = self.nonce.lock().await;
            let signed = SignedCall::sign(&self.signer, &self.contract, call, *nonce)?;
            match self.transport.send_transaction(&signed).await {
                Ok(tx) => {
                    *nonce += 1;
                    tx
                }
                Err(e) => {
                    // The node may have accepted the call even though the
                    // reply was lost; resync before the next submission.
                    self.resync_nonce(&mut *nonce).await;
                    return Err(LedgerError::WriteFailed(e.to_string()));
                }
            }
        };
        debug!(record = %key, %class, %tx, "transaction submitted");

        let receipt = self.await_confirmation(tx).await?;
        info!(
            record = %key,
            %class,
            %tx,
            block = receipt.block_number,
            "hash anchored"
        );
        Ok(receipt)
    }

    async fn resync_nonce(&self, nonce: &mut u64) {
        let sender = self.signer.verifying_key();
        match self.transport.transaction_count(&sender).await {
            Ok(next) => {
                if next != *nonce {
                    warn!(%sender, local = *nonce, ledger = next, "nonce resynchronized");
                }
                *nonce = next;
            }
            Err(e) => warn!(%sender, error = %e, "nonce resync failed"),
        }
    }

    async fn await_confirmation(&self, tx: TxHash) -> LedgerResult<TxReceipt> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        loop {
            match self.transport.transaction_receipt(&tx).await {
                Ok(Some(receipt)) => match receipt.status {
                    TxStatus::Confirmed => return Ok(receipt),
                    TxStatus::Reverted => {
                        let reason = receipt.reason.unwrap_or_else(|| "no reason given".into());
                        warn!(%tx, %reason, "transaction reverted");
                        return Err(LedgerError::WriteFailed(format!(
                            "transaction {tx} reverted: {reason}"
                        )));
                    }
                },
                Ok(None) => debug!(%tx, "transaction pending"),
                // Already submitted; a failed poll says nothing about finality.
                Err(e) => warn!(%tx, error = %e, "receipt poll failed"),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    tx,
                    waited: now - started,
                });
            }
            tokio::time::sleep(self.policy.poll_interval.min(deadline - now)).await;
        }
    }

    async fn read<R: DeserializeOwned>(&self, call: ContractCall) -> LedgerResult<Option<R>> {
        let method = call.method();
        let request = CallRequest {
            contract: self.contract.clone(),
            call,
        };
        let value = self
            .transport
            .call(&request)
            .await
            .map_err(|e| LedgerError::ReadFailed(format!("{method}: {e}")))?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| LedgerError::ReadFailed(format!("{method}: decoding result: {e}")))
    }
}

fn not_found(id: &RecordId, class: HashClass, version: Option<u64>) -> LedgerError {
    LedgerError::RecordNotFound {
        record: *id,
        class,
        version,
    }
}

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use dpp_crypto::VerifyingKey;
use dpp_types::{Digest, RecordId};
use serde_json::Value;
use tracing::debug;

use crate::contract::{
    CallRequest, ContractCall, HashRecord, SignedCall, TxHash, TxReceipt, TxStatus,
    VersionHashRecord, VersionHashes,
};
use crate::error::TransportError;
use crate::transport::LedgerTransport;

/// JSON-RPC error codes used by the in-memory ledger.
pub mod codes {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const UNKNOWN_CONTRACT: i64 = -32000;
    pub const INVALID_SIGNATURE: i64 = -32001;
    pub const UNAUTHORIZED: i64 = -32002;
    pub const NONCE_TOO_LOW: i64 = -32003;
    pub const INTERNAL: i64 = -32603;
}

/// In-memory ledger node for tests, local demos, and embedding.
///
/// Executes the anchoring contract with the same semantics as the remote
/// node: master and dynamic entries are overwritten, version triples are
/// appended (re-storing a version number replaces its triple in place), and
/// unknown keys read back as the contract's zero value. Transactions become
/// final after a configurable number of receipt polls.
pub struct InMemoryLedger {
    contract: String,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    confirm_after: u32,
    stalled: bool,
    revert_next: Option<String>,
    authorized: Option<HashSet<VerifyingKey>>,
    next_nonce: HashMap<VerifyingKey, u64>,
    pending: HashMap<TxHash, PendingTx>,
    receipts: HashMap<TxHash, TxReceipt>,
    entries: HashMap<RecordId, ContractEntry>,
    executed: Vec<(u64, ContractCall)>,
    block: u64,
}

struct PendingTx {
    call: ContractCall,
    polls: u32,
    revert: Option<String>,
}

#[derive(Default)]
struct ContractEntry {
    master: Option<HashRecord>,
    dynamic: Option<HashRecord>,
    versions: Vec<VersionHashRecord>,
}

fn rpc_error(code: i64, message: impl Into<String>) -> TransportError {
    TransportError::Rpc {
        code,
        message: message.into(),
    }
}

fn poisoned() -> TransportError {
    rpc_error(codes::INTERNAL, "ledger state lock poisoned")
}

impl InMemoryLedger {
    /// A ledger hosting the contract at `contract`; transactions confirm on
    /// the first receipt poll.
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            inner: RwLock::new(LedgerState {
                confirm_after: 1,
                ..LedgerState::default()
            }),
        }
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// Number of receipt polls a transaction stays pending for before it is
    /// executed. `0` executes on submission.
    pub fn set_confirm_after(&self, polls: u32) {
        if let Ok(mut state) = self.inner.write() {
            state.confirm_after = polls;
        }
    }

    /// While stalled, no pending transaction ever becomes final.
    pub fn set_stalled(&self, stalled: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.stalled = stalled;
        }
    }

    /// Make the next submitted transaction revert with `reason`.
    pub fn revert_next(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.inner.write() {
            state.revert_next = Some(reason.into());
        }
    }

    /// Restrict submissions to the given sender.
    pub fn authorize(&self, sender: VerifyingKey) {
        if let Ok(mut state) = self.inner.write() {
            state.authorized.get_or_insert_with(HashSet::new).insert(sender);
        }
    }

    /// Overwrite a master entry without a transaction, as an out-of-band
    /// modification of ledger state would.
    pub fn inject_master_hash(&self, key: RecordId, timestamp: u64, hash: Digest) {
        if let Ok(mut state) = self.inner.write() {
            state.entries.entry(key).or_default().master = Some(HashRecord { timestamp, hash });
        }
    }

    /// Current block height.
    pub fn block_number(&self) -> u64 {
        self.inner.read().map(|s| s.block).unwrap_or(0)
    }

    /// Confirmed state-changing calls with their block numbers, in execution
    /// order.
    pub fn executed(&self) -> Vec<(u64, ContractCall)> {
        self.inner.read().map(|s| s.executed.clone()).unwrap_or_default()
    }

    /// Number of transactions submitted but not yet final.
    pub fn pending_count(&self) -> usize {
        self.inner.read().map(|s| s.pending.len()).unwrap_or(0)
    }

    fn check_contract(&self, contract: &str) -> Result<(), TransportError> {
        if contract.eq_ignore_ascii_case(&self.contract) {
            Ok(())
        } else {
            Err(rpc_error(
                codes::UNKNOWN_CONTRACT,
                format!("no contract deployed at {contract}"),
            ))
        }
    }

    fn finalize(state: &mut LedgerState, tx: TxHash, pending: PendingTx) -> TxReceipt {
        state.block += 1;
        let receipt = match pending.revert {
            Some(reason) => TxReceipt {
                transaction_hash: tx,
                status: TxStatus::Reverted,
                block_number: state.block,
                reason: Some(reason),
            },
            None => {
                Self::execute(state, &pending.call);
                state.executed.push((state.block, pending.call.clone()));
                TxReceipt {
                    transaction_hash: tx,
                    status: TxStatus::Confirmed,
                    block_number: state.block,
                    reason: None,
                }
            }
        };
        debug!(%tx, block = state.block, status = ?receipt.status, "transaction final");
        state.receipts.insert(tx, receipt.clone());
        receipt
    }

    fn execute(state: &mut LedgerState, call: &ContractCall) {
        match call {
            ContractCall::StoreHash { key, timestamp, hash } => {
                state.entries.entry(*key).or_default().master = Some(HashRecord {
                    timestamp: *timestamp,
                    hash: *hash,
                });
            }
            ContractCall::StoreDynamicHash { key, timestamp, hash } => {
                state.entries.entry(*key).or_default().dynamic = Some(HashRecord {
                    timestamp: *timestamp,
                    hash: *hash,
                });
            }
            ContractCall::StoreVersionHash {
                key,
                timestamp,
                hash,
                version,
            } => {
                let record = VersionHashRecord {
                    timestamp: *timestamp,
                    hash: *hash,
                    version: *version,
                };
                let versions = &mut state.entries.entry(*key).or_default().versions;
                match versions.iter_mut().find(|v| v.version == *version) {
                    Some(existing) => *existing = record,
                    None => versions.push(record),
                }
            }
            // Reads never reach execution; send_transaction rejects them.
            _ => {}
        }
    }

    fn read(state: &LedgerState, call: &ContractCall) -> Result<Value, TransportError> {
        let entry = state.entries.get(call.key());
        let unset = HashRecord {
            timestamp: 0,
            hash: Digest::zero(),
        };
        let value = match call {
            ContractCall::GetHash { .. } => {
                to_value(entry.and_then(|e| e.master).unwrap_or(unset))?
            }
            ContractCall::GetDynamicHash { .. } => {
                to_value(entry.and_then(|e| e.dynamic).unwrap_or(unset))?
            }
            ContractCall::GetVersionHash { version, .. } => {
                match entry.and_then(|e| e.versions.iter().find(|v| v.version == *version)) {
                    Some(record) => to_value(record)?,
                    None => Value::Null,
                }
            }
            ContractCall::GetVersionHashes { .. } => {
                let all: VersionHashes = entry
                    .map(|e| e.versions.iter().copied().collect())
                    .unwrap_or_default();
                to_value(&all)?
            }
            _ => {
                return Err(rpc_error(
                    codes::INVALID_PARAMS,
                    format!("{} is a state-changing call", call.method()),
                ))
            }
        };
        Ok(value)
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| rpc_error(codes::INTERNAL, e.to_string()))
}

#[async_trait]
impl LedgerTransport for InMemoryLedger {
    async fn send_transaction(&self, call: &SignedCall) -> Result<TxHash, TransportError> {
        self.check_contract(&call.contract)?;
        if !call.call.is_mutation() {
            return Err(rpc_error(
                codes::INVALID_PARAMS,
                format!("{} is read-only", call.call.method()),
            ));
        }
        call.verify()
            .map_err(|e| rpc_error(codes::INVALID_SIGNATURE, e.to_string()))?;
        let tx = call
            .tx_hash()
            .map_err(|e| rpc_error(codes::INTERNAL, e.to_string()))?;

        let mut state = self.inner.write().map_err(|_| poisoned())?;
        if let Some(allowed) = &state.authorized {
            if !allowed.contains(&call.from) {
                return Err(rpc_error(
                    codes::UNAUTHORIZED,
                    format!("sender {} not authorized", call.from),
                ));
            }
        }
        let expected = state.next_nonce.get(&call.from).copied().unwrap_or(0);
        if call.nonce < expected {
            return Err(rpc_error(
                codes::NONCE_TOO_LOW,
                format!("nonce {} below {expected}", call.nonce),
            ));
        }
        state.next_nonce.insert(call.from.clone(), call.nonce + 1);

        let pending = PendingTx {
            call: call.call.clone(),
            polls: 0,
            revert: state.revert_next.take(),
        };
        debug!(%tx, method = call.call.method(), key = %call.call.key(), "transaction accepted");
        if state.confirm_after == 0 && !state.stalled {
            Self::finalize(&mut state, tx, pending);
        } else {
            state.pending.insert(tx, pending);
        }
        Ok(tx)
    }

    async fn transaction_receipt(&self, tx: &TxHash) -> Result<Option<TxReceipt>, TransportError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        if let Some(receipt) = state.receipts.get(tx) {
            return Ok(Some(receipt.clone()));
        }
        if state.stalled {
            return Ok(None);
        }
        let confirm_after = state.confirm_after;
        let ready = match state.pending.get_mut(tx) {
            Some(pending) => {
                pending.polls += 1;
                pending.polls >= confirm_after
            }
            None => return Ok(None),
        };
        if !ready {
            return Ok(None);
        }
        match state.pending.remove(tx) {
            Some(pending) => Ok(Some(Self::finalize(&mut state, *tx, pending))),
            None => Ok(None),
        }
    }

    async fn call(&self, request: &CallRequest) -> Result<Value, TransportError> {
        self.check_contract(&request.contract)?;
        let state = self.inner.read().map_err(|_| poisoned())?;
        Self::read(&state, &request.call)
    }

    async fn transaction_count(&self, sender: &VerifyingKey) -> Result<u64, TransportError> {
        let state = self.inner.read().map_err(|_| poisoned())?;
        Ok(state.next_nonce.get(sender).copied().unwrap_or(0))
    }
}

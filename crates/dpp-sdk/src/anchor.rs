use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use dpp_crypto::HashEngine;
use dpp_ledger::{HashRecord, LedgerClient, VersionHashRecord, VersionHashes};
use dpp_types::{Digest, Passport, RecordId, TypeError};
use dpp_verify::{VerificationEngine, VerificationReport, VerifyResult};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

use crate::config::AnchorConfig;
use crate::error::{SdkError, SdkResult};

/// Hashes anchored by one lifecycle step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorSummary {
    pub record: RecordId,
    pub master_hash: Digest,
    pub version: u64,
    pub version_hash: Digest,
    pub dynamic_hash: Digest,
}

/// Entry point for anchoring and verifying passports.
///
/// Writes for the same record are serialized so a dynamic hash is never
/// computed against a partially written version set. Different records
/// proceed concurrently and reads are never serialized.
pub struct Anchor {
    ledger: Arc<LedgerClient>,
    hasher: HashEngine,
    verifier: VerificationEngine,
    locks: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl Anchor {
    pub fn new(ledger: Arc<LedgerClient>, hasher: HashEngine) -> Self {
        Self {
            verifier: VerificationEngine::new(ledger.clone(), hasher),
            ledger,
            hasher,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Connect to the ledger named in `config`.
    pub async fn connect(config: &AnchorConfig) -> SdkResult<Self> {
        config.validate()?;
        let contract = config.contract()?;
        let signer = config.signing_key()?;
        let client = LedgerClient::connect(
            &config.ledger.endpoint,
            config.request_timeout(),
            signer,
            contract,
            config.confirmation_policy(),
        )
        .await?;
        Ok(Self::new(Arc::new(client), config.hash_engine()))
    }

    pub fn ledger(&self) -> &Arc<LedgerClient> {
        &self.ledger
    }

    pub fn hasher(&self) -> &HashEngine {
        &self.hasher
    }

    pub fn verifier(&self) -> &VerificationEngine {
        &self.verifier
    }

    // ---- Writes ----

    /// Anchor the master hash of `record`'s current state.
    pub async fn save_master_hash(&self, record: &Passport) -> SdkResult<Digest> {
        let _guard = self.lock(&record.id).await;
        self.store_master(record).await
    }

    /// Anchor the hash of `record`'s latest version.
    pub async fn save_version_hash(&self, record: &Passport) -> SdkResult<Digest> {
        let _guard = self.lock(&record.id).await;
        let number = latest(record)?;
        self.store_version(record, number).await
    }

    /// Anchor the dynamic hash, built from the master and version hashes the
    /// ledger currently holds for `record`.
    pub async fn save_dynamic_hash(&self, record: &Passport) -> SdkResult<Digest> {
        let _guard = self.lock(&record.id).await;
        self.store_dynamic(record).await
    }

    /// Anchor a freshly created record: master, version 1, then dynamic.
    /// Each hash is written back onto `record` once its write is confirmed.
    pub async fn anchor_created(&self, record: &mut Passport) -> SdkResult<AnchorSummary> {
        record.check_history()?;
        self.anchor_version(record, 1).await
    }

    /// Anchor a record after a version was appended: master, the latest
    /// version, then dynamic.
    pub async fn anchor_new_version(&self, record: &mut Passport) -> SdkResult<AnchorSummary> {
        record.check_history()?;
        let number = latest(record)?;
        self.anchor_version(record, number).await
    }

    async fn anchor_version(&self, record: &mut Passport, number: u64) -> SdkResult<AnchorSummary> {
        let _guard = self.lock(&record.id).await;

        let master_hash = self.store_master(record).await?;
        record.master_hash = Some(master_hash);

        let version_hash = self.store_version(record, number).await?;
        if let Some(v) = record.version_mut(number) {
            v.version_hash = Some(version_hash);
        }

        let dynamic_hash = self.store_dynamic(record).await?;
        record.dynamic_hash = Some(dynamic_hash);

        Ok(AnchorSummary {
            record: record.id,
            master_hash,
            version: number,
            version_hash,
            dynamic_hash,
        })
    }

    async fn store_master(&self, record: &Passport) -> SdkResult<Digest> {
        let unix_ts = record.updated_at.unix_seconds()?;
        let hash = self.hasher.master_hash_of(record)?;
        let stored = self.ledger.store_master_hash(&record.id, unix_ts, hash).await?;
        info!(record = %record.id, hash = %stored.short_hex(), "master hash saved");
        Ok(stored)
    }

    async fn store_version(&self, record: &Passport, number: u64) -> SdkResult<Digest> {
        let version = record
            .version(number)
            .ok_or(TypeError::VersionNotFound(number))?;
        let unix_ts = version.created_at.unix_seconds()?;
        let hash = self.hasher.version_hash_of(record, number)?;
        let stored = self
            .ledger
            .store_version_hash(&record.id, unix_ts, hash, number)
            .await?;
        info!(
            record = %record.id,
            version = number,
            hash = %stored.short_hex(),
            "version hash saved"
        );
        Ok(stored)
    }

    async fn store_dynamic(&self, record: &Passport) -> SdkResult<Digest> {
        let unix_ts = record.updated_at.unix_seconds()?;
        let master = self.ledger.get_master_hash(&record.id).await?;
        let versions = self.ledger.get_all_version_hashes(&record.id).await?;
        let hash = self.hasher.dynamic_hash(&master.hash, &versions.hashes, unix_ts);
        let stored = self.ledger.store_dynamic_hash(&record.id, unix_ts, hash).await?;
        info!(
            record = %record.id,
            versions = versions.len(),
            hash = %stored.short_hex(),
            "dynamic hash saved"
        );
        Ok(stored)
    }

    // ---- Reads ----

    pub async fn get_master_hash(&self, id: &RecordId) -> SdkResult<HashRecord> {
        Ok(self.ledger.get_master_hash(id).await?)
    }

    pub async fn get_version_hash(
        &self,
        id: &RecordId,
        version: u64,
    ) -> SdkResult<VersionHashRecord> {
        Ok(self.ledger.get_version_hash(id, version).await?)
    }

    pub async fn get_version_hashes(&self, id: &RecordId) -> SdkResult<VersionHashes> {
        Ok(self.ledger.get_all_version_hashes(id).await?)
    }

    pub async fn get_dynamic_hash(&self, id: &RecordId) -> SdkResult<HashRecord> {
        Ok(self.ledger.get_dynamic_hash(id).await?)
    }

    // ---- Verification ----
    //
    // These return `VerifyResult` so callers keep the distinction between a
    // mismatch (Ok, negative verdict) and an undetermined check (Err).

    pub async fn verify_master_hash(
        &self,
        record: &Passport,
        claimed: Digest,
    ) -> VerifyResult<VerificationReport> {
        self.verifier.verify_master_hash(record, claimed).await
    }

    pub async fn verify_version_hash(
        &self,
        record: &Passport,
        claimed: Digest,
        version: u64,
    ) -> VerifyResult<VerificationReport> {
        self.verifier.verify_version_hash(record, claimed, version).await
    }

    pub async fn verify_dynamic_hash(
        &self,
        id: &RecordId,
        claimed: Digest,
    ) -> VerifyResult<VerificationReport> {
        self.verifier.verify_dynamic_hash(id, claimed).await
    }

    /// Close the ledger connection if this is its last user.
    pub fn close(self) {
        if let Ok(client) = Arc::try_unwrap(self.ledger) {
            client.close();
        }
    }

    async fn lock(&self, id: &RecordId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks.entry(*id).or_default().clone()
        };
        slot.lock_owned().await
    }
}

fn latest(record: &Passport) -> SdkResult<u64> {
    record
        .latest_version()
        .map(|v| v.version)
        .ok_or(SdkError::Record(TypeError::EmptyHistory))
}

use std::sync::Arc;

use dpp_crypto::HashEngine;
use dpp_ledger::{HashClass, LedgerClient};
use dpp_types::{Digest, Passport, RecordId};
use tracing::{debug, warn};

use crate::error::{VerifyError, VerifyResult};
use crate::report::VerificationReport;

/// Recomputes hashes, fetches the anchored values, and compares both against
/// a caller's claim.
///
/// Holds no state between calls beyond the shared ledger client.
#[derive(Clone)]
pub struct VerificationEngine {
    ledger: Arc<LedgerClient>,
    hasher: HashEngine,
}

impl VerificationEngine {
    pub fn new(ledger: Arc<LedgerClient>, hasher: HashEngine) -> Self {
        Self { ledger, hasher }
    }

    pub fn hasher(&self) -> &HashEngine {
        &self.hasher
    }

    /// Compare the master hash of `passport` (name, current attributes,
    /// `updatedAt`) with the ledger and `claimed`.
    pub async fn verify_master_hash(
        &self,
        passport: &Passport,
        claimed: Digest,
    ) -> VerifyResult<VerificationReport> {
        let computed = self.hasher.master_hash_of(passport)?;
        let on_chain = self.ledger.get_master_hash(&passport.id).await?.hash;
        Ok(finish(VerificationReport::new(
            HashClass::Master,
            passport.id,
            None,
            computed,
            on_chain,
            claimed,
        )))
    }

    /// Compare the hash of version `version` of `passport` with the ledger and
    /// `claimed`. A version missing from the local history is an error, not a
    /// mismatch.
    pub async fn verify_version_hash(
        &self,
        passport: &Passport,
        claimed: Digest,
        version: u64,
    ) -> VerifyResult<VerificationReport> {
        if passport.version(version).is_none() {
            return Err(VerifyError::VersionNotFound {
                record: passport.id,
                version,
            });
        }
        let computed = self.hasher.version_hash_of(passport, version)?;
        let on_chain = self.ledger.get_version_hash(&passport.id, version).await?.hash;
        Ok(finish(VerificationReport::new(
            HashClass::Version,
            passport.id,
            Some(version),
            computed,
            on_chain,
            claimed,
        )))
    }

    /// Rebuild the dynamic hash from the ledger's own master and version
    /// hashes and compare it with the anchored dynamic hash and `claimed`.
    ///
    /// No local data is involved, so a mismatch between `computed` and
    /// `on_chain` means the ledger entries are inconsistent with each other.
    pub async fn verify_dynamic_hash(
        &self,
        id: &RecordId,
        claimed: Digest,
    ) -> VerifyResult<VerificationReport> {
        let master = self.ledger.get_master_hash(id).await?;
        let versions = self.ledger.get_all_version_hashes(id).await?;
        let on_chain = self.ledger.get_dynamic_hash(id).await?;
        debug!(record = %id, versions = versions.len(), "recomputing dynamic hash from ledger");

        let computed = self
            .hasher
            .dynamic_hash(&master.hash, &versions.hashes, on_chain.timestamp);
        Ok(finish(VerificationReport::new(
            HashClass::Dynamic,
            *id,
            None,
            computed,
            on_chain.hash,
            claimed,
        )))
    }
}

fn finish(report: VerificationReport) -> VerificationReport {
    if report.is_valid() {
        debug!(record = %report.record, class = %report.class, "integrity verified");
    } else {
        let pairs: Vec<String> = report.disagreements().iter().map(ToString::to_string).collect();
        warn!(
            record = %report.record,
            class = %report.class,
            version = ?report.version,
            disagreements = %pairs.join(", "),
            "integrity mismatch"
        );
    }
    report
}

use std::fmt;

use dpp_crypto::{
    to_canonical_json, HashEngine, HasherError, Signature, SignatureError, SigningKey,
    VerifyingKey,
};
use dpp_types::{Digest, RecordId};
use serde::{Deserialize, Serialize};

/// The three hash classes the ledger stores per record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashClass {
    Master,
    Version,
    Dynamic,
}

impl fmt::Display for HashClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Master => "master",
            Self::Version => "version",
            Self::Dynamic => "dynamic",
        })
    }
}

/// A call against the anchoring contract.
///
/// Keys are 12-byte record ids, timestamps are Unix seconds, hashes are
/// 32 bytes, versions are unsigned integers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContractCall {
    StoreHash {
        key: RecordId,
        timestamp: u64,
        hash: Digest,
    },
    StoreVersionHash {
        key: RecordId,
        timestamp: u64,
        hash: Digest,
        version: u64,
    },
    StoreDynamicHash {
        key: RecordId,
        timestamp: u64,
        hash: Digest,
    },
    GetHash {
        key: RecordId,
    },
    GetVersionHash {
        key: RecordId,
        version: u64,
    },
    GetVersionHashes {
        key: RecordId,
    },
    GetDynamicHash {
        key: RecordId,
    },
}

impl ContractCall {
    pub fn method(&self) -> &'static str {
        match self {
            Self::StoreHash { .. } => "storeHash",
            Self::StoreVersionHash { .. } => "storeVersionHash",
            Self::StoreDynamicHash { .. } => "storeDynamicHash",
            Self::GetHash { .. } => "getHash",
            Self::GetVersionHash { .. } => "getVersionHash",
            Self::GetVersionHashes { .. } => "getVersionHashes",
            Self::GetDynamicHash { .. } => "getDynamicHash",
        }
    }

    pub fn key(&self) -> &RecordId {
        match self {
            Self::StoreHash { key, .. }
            | Self::StoreVersionHash { key, .. }
            | Self::StoreDynamicHash { key, .. }
            | Self::GetHash { key }
            | Self::GetVersionHash { key, .. }
            | Self::GetVersionHashes { key }
            | Self::GetDynamicHash { key } => key,
        }
    }

    pub fn class(&self) -> HashClass {
        match self {
            Self::StoreHash { .. } | Self::GetHash { .. } => HashClass::Master,
            Self::StoreVersionHash { .. }
            | Self::GetVersionHash { .. }
            | Self::GetVersionHashes { .. } => HashClass::Version,
            Self::StoreDynamicHash { .. } | Self::GetDynamicHash { .. } => HashClass::Dynamic,
        }
    }

    /// Returns `true` for calls that change contract state and therefore
    /// must be submitted as transactions.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::StoreHash { .. } | Self::StoreVersionHash { .. } | Self::StoreDynamicHash { .. }
        )
    }
}

/// Stored `(timestamp, hash)` pair for the master and dynamic classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub timestamp: u64,
    pub hash: Digest,
}

impl HashRecord {
    /// The contract's default value for a key it has never stored.
    pub fn is_unset(&self) -> bool {
        self.timestamp == 0 && self.hash.is_zero()
    }
}

/// Stored `(timestamp, hash, version)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHashRecord {
    pub timestamp: u64,
    pub hash: Digest,
    pub version: u64,
}

impl VersionHashRecord {
    pub fn is_unset(&self) -> bool {
        self.timestamp == 0 && self.hash.is_zero()
    }
}

/// All version triples of a record as three parallel sequences, in the order
/// the ledger stored them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHashes {
    pub timestamps: Vec<u64>,
    pub hashes: Vec<Digest>,
    pub versions: Vec<u64>,
}

impl VersionHashes {
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Returns `true` if the three sequences have equal length.
    pub fn is_aligned(&self) -> bool {
        self.timestamps.len() == self.hashes.len() && self.versions.len() == self.hashes.len()
    }

    pub fn push(&mut self, record: VersionHashRecord) {
        self.timestamps.push(record.timestamp);
        self.hashes.push(record.hash);
        self.versions.push(record.version);
    }

    pub fn iter(&self) -> impl Iterator<Item = VersionHashRecord> + '_ {
        self.timestamps
            .iter()
            .zip(&self.hashes)
            .zip(&self.versions)
            .map(|((timestamp, hash), version)| VersionHashRecord {
                timestamp: *timestamp,
                hash: *hash,
                version: *version,
            })
    }
}

impl FromIterator<VersionHashRecord> for VersionHashes {
    fn from_iter<I: IntoIterator<Item = VersionHashRecord>>(iter: I) -> Self {
        let mut out = Self::default();
        for record in iter {
            out.push(record);
        }
        out
    }
}

/// Identifier the ledger assigns to a submitted transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub Digest);

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.0.short_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Confirmed,
    Reverted,
}

/// Final outcome of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub status: TxStatus,
    pub block_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of a read-only contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub contract: String,
    pub call: ContractCall,
}

/// A state-changing call signed by the sender.
///
/// The signature covers the canonical JSON of `{contract, call, nonce}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub contract: String,
    pub call: ContractCall,
    pub from: VerifyingKey,
    pub nonce: u64,
    pub signature: Signature,
}

#[derive(Serialize)]
struct SigningPayload<'a> {
    contract: &'a str,
    call: &'a ContractCall,
    nonce: u64,
}

impl SignedCall {
    pub fn sign(
        key: &SigningKey,
        contract: &str,
        call: ContractCall,
        nonce: u64,
    ) -> Result<Self, HasherError> {
        let payload = signing_payload(contract, &call, nonce)?;
        Ok(Self {
            contract: contract.to_string(),
            from: key.verifying_key(),
            signature: key.sign(&payload),
            call,
            nonce,
        })
    }

    /// Check the signature against `from`.
    pub fn verify(&self) -> Result<(), SignatureError> {
        let payload = signing_payload(&self.contract, &self.call, self.nonce)
            .map_err(|_| SignatureError::InvalidSignature)?;
        self.from.verify(&payload, &self.signature)
    }

    /// Deterministic transaction hash: Keccak-256 over the signed payload and
    /// the signature.
    pub fn tx_hash(&self) -> Result<TxHash, HasherError> {
        let mut data = signing_payload(&self.contract, &self.call, self.nonce)?;
        data.extend_from_slice(self.signature.to_hex().as_bytes());
        Ok(TxHash(HashEngine::digest(&data)))
    }
}

fn signing_payload(
    contract: &str,
    call: &ContractCall,
    nonce: u64,
) -> Result<Vec<u8>, HasherError> {
    let text = to_canonical_json(&SigningPayload {
        contract,
        call,
        nonce,
    })?;
    Ok(text.into_bytes())
}

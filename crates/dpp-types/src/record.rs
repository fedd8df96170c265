use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::Digest;
use crate::error::TypeError;
use crate::record_id::RecordId;
use crate::temporal::Timestamp;

/// Attribute snapshot: section name → attribute mapping.
///
/// Backed by an insertion-ordered map so that key order survives a round
/// trip through the record store unchanged. Hashing depends on that order.
pub type Attributes = Map<String, Value>;

/// File metadata attached to a version (datasets and the product photo).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Reference to a specific version of another passport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionLink {
    pub record: RecordId,
    pub version: u64,
}

/// Immutable snapshot of a passport's content at one point of its history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version: u64,
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<VersionLink>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_hash: Option<Digest>,
}

/// A digital product passport with its append-only version history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passport {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub current_attributes: Attributes,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_hash: Option<Digest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_hash: Option<Digest>,
}

impl Passport {
    /// Create a passport with its first version.
    pub fn create(
        id: RecordId,
        name: impl Into<String>,
        serial_number: Option<String>,
        attributes: Attributes,
        datasets: Vec<Attachment>,
        now: Timestamp,
    ) -> Self {
        let first = Version {
            version: 1,
            attributes: attributes.clone(),
            datasets,
            photo: None,
            links: Vec::new(),
            created_at: now,
            version_hash: None,
        };
        Self {
            id,
            name: name.into(),
            serial_number,
            current_attributes: attributes,
            versions: vec![first],
            created_at: Some(now),
            updated_at: now,
            master_hash: None,
            dynamic_hash: None,
        }
    }

    /// Append a new version carrying `attributes`, which also become the
    /// current attributes. Returns the new version number.
    ///
    /// The master and dynamic hashes no longer describe the record and are
    /// cleared until they are anchored again.
    pub fn append_version(
        &mut self,
        attributes: Attributes,
        datasets: Vec<Attachment>,
        now: Timestamp,
    ) -> u64 {
        let number = self.versions.len() as u64 + 1;
        self.versions.push(Version {
            version: number,
            attributes: attributes.clone(),
            datasets,
            photo: None,
            links: Vec::new(),
            created_at: now,
            version_hash: None,
        });
        self.current_attributes = attributes;
        self.updated_at = now;
        self.master_hash = None;
        self.dynamic_hash = None;
        number
    }

    /// Look up a version by its number.
    pub fn version(&self, number: u64) -> Option<&Version> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.versions.get(index).filter(|v| v.version == number)
    }

    pub fn version_mut(&mut self, number: u64) -> Option<&mut Version> {
        let index = usize::try_from(number.checked_sub(1)?).ok()?;
        self.versions
            .get_mut(index)
            .filter(|v| v.version == number)
    }

    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Check that the history is non-empty and numbered 1..=n without gaps.
    pub fn check_history(&self) -> Result<(), TypeError> {
        if self.versions.is_empty() {
            return Err(TypeError::EmptyHistory);
        }
        for (index, v) in self.versions.iter().enumerate() {
            let expected = index as u64 + 1;
            if v.version != expected {
                return Err(TypeError::BrokenHistory {
                    expected,
                    found: v.version,
                });
            }
        }
        Ok(())
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Width of a record identifier in bytes.
pub const RECORD_ID_LEN: usize = 12;

/// Marker prefixed to the canonical hex rendering.
pub const RECORD_ID_MARKER: &str = "0x";

/// Fixed-width identifier of a passport.
///
/// A `RecordId` is exactly 12 bytes, the key width the ledger contract uses.
/// The record store hands identifiers out as 24 hex characters; the
/// canonical rendering is the lowercase hex prefixed with `0x`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; RECORD_ID_LEN]);

impl RecordId {
    /// Encode any displayable identifier into its canonical fixed-width form.
    ///
    /// Surrounding double quotes and a leading `0x`/`0X` marker are stripped;
    /// the remainder must be exactly 24 hex characters (any case).
    pub fn encode(input: impl fmt::Display) -> Result<Self, TypeError> {
        Self::parse(&input.to_string())
    }

    /// Parse an identifier string. See [`RecordId::encode`].
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let invalid = || TypeError::InvalidIdentifier(input.to_string());

        let mut s = input;
        if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
            s = &s[1..s.len() - 1];
        }
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
        }
        if s.len() != RECORD_ID_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let mut bytes = [0u8; RECORD_ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| invalid())?;
        Ok(Self(bytes))
    }

    /// Generate a fresh identifier: 4 bytes of big-endian Unix seconds
    /// followed by 8 random bytes.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        let mut bytes = [0u8; RECORD_ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes[4..]);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; RECORD_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw 12 bytes.
    pub fn as_bytes(&self) -> &[u8; RECORD_ID_LEN] {
        &self.0
    }

    /// Bare lowercase hex (24 characters), the record store's rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Canonical marker-prefixed rendering used as the ledger key.
    pub fn canonical(&self) -> String {
        format!("{RECORD_ID_MARKER}{}", self.to_hex())
    }
}

impl FromStr for RecordId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_hex())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<[u8; RECORD_ID_LEN]> for RecordId {
    fn from(bytes: [u8; RECORD_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

/// Record-store exports carry ids either bare or as `{"$oid": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordIdRepr {
    Plain(String),
    Extended {
        #[serde(rename = "$oid")]
        oid: String,
    },
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match RecordIdRepr::deserialize(deserializer)? {
            RecordIdRepr::Plain(s) => s,
            RecordIdRepr::Extended { oid } => oid,
        };
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn accepted_forms_share_canonical_encoding() {
        let plain = RecordId::encode(ID).unwrap();
        let marked = RecordId::encode("0x507f1f77bcf86cd799439011").unwrap();
        let quoted = RecordId::encode("\"507F1F77BCF86CD799439011\"").unwrap();
        assert_eq!(plain, marked);
        assert_eq!(plain, quoted);
        assert_eq!(quoted.canonical(), "0x507f1f77bcf86cd799439011");
    }

    #[test]
    fn quoted_and_marked_together() {
        let id = RecordId::encode("\"0X507F1F77BCF86CD799439011\"").unwrap();
        assert_eq!(id.to_hex(), ID);
    }

    #[test]
    fn rejects_non_hex() {
        assert_eq!(
            RecordId::encode("not-hex"),
            Err(TypeError::InvalidIdentifier("not-hex".into()))
        );
        assert!(RecordId::encode("507f1f77bcf86cd79943901g").is_err());
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(RecordId::encode("507f1f77bcf86cd79943901").is_err());
        assert!(RecordId::encode("507f1f77bcf86cd7994390111").is_err());
        assert!(RecordId::encode("").is_err());
        assert!(RecordId::encode("\"\"").is_err());
        assert!(RecordId::encode("0x").is_err());
    }

    #[test]
    fn rejects_doubled_marker() {
        assert!(RecordId::encode("0x0x507f1f77bcf86cd799439011").is_err());
    }

    #[test]
    fn encode_accepts_display_types() {
        let id = RecordId::encode(ID).unwrap();
        let again = RecordId::encode(id).unwrap();
        assert_eq!(id, again);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn serializes_canonically() {
        let id = RecordId::encode(ID).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0x507f1f77bcf86cd799439011\"");
        let parsed: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn deserializes_extended_oid() {
        let parsed: RecordId =
            serde_json::from_str(r#"{"$oid": "507f1f77bcf86cd799439011"}"#).unwrap();
        assert_eq!(parsed.to_hex(), ID);
    }

    #[test]
    fn deserialize_rejects_bad_id() {
        assert!(serde_json::from_str::<RecordId>(r#""abc""#).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn canonical_form_reparses(bytes in proptest::array::uniform12(any::<u8>())) {
                let id = RecordId::from_bytes(bytes);
                prop_assert_eq!(RecordId::parse(&id.canonical()).unwrap(), id);
                prop_assert_eq!(RecordId::parse(&id.to_hex().to_uppercase()).unwrap(), id);
            }
        }
    }
}

use dpp_types::{Attributes, Digest, Passport, TypeError};
use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};

use crate::canonical::{encode_payload, PayloadPart};

/// Name of the fixed digest function.
pub const HASH_FUNCTION: &str = "keccak-256";

/// Whether the dynamic hash covers a trailing timestamp term.
///
/// Fixed per deployment: writer and verifier must agree, otherwise every
/// dynamic verification fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicHashScheme {
    /// `H(master || versions...)`
    #[default]
    WithoutTimestamp,
    /// `H(master || versions... || unixTs)`
    WithTimestamp,
}

/// Computes the three hash classes anchored for a passport.
///
/// - master: `H(name || JSON(currentAttributes) || unixTs)`
/// - version: `H(name || JSON(attributes@n) || unixTs@n || n)`
/// - dynamic: `H(master || version_1 || ... || version_n [|| unixTs])`
///
/// Text parts are UTF-8, integers are decimal text, digests in the dynamic
/// hash are their raw 32 bytes. `H` is Keccak-256.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashEngine {
    scheme: DynamicHashScheme,
}

impl HashEngine {
    pub const fn new(scheme: DynamicHashScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> DynamicHashScheme {
        self.scheme
    }

    /// Raw Keccak-256 of `data`.
    pub fn digest(data: &[u8]) -> Digest {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        Digest::from_hash(out)
    }

    pub fn master_hash(&self, name: &str, attributes: &Attributes, unix_ts: u64) -> Digest {
        Self::digest(&encode_payload(&[
            PayloadPart::Text(name),
            PayloadPart::Attributes(attributes),
            PayloadPart::Integer(unix_ts),
        ]))
    }

    pub fn version_hash(
        &self,
        name: &str,
        attributes: &Attributes,
        unix_ts: u64,
        version: u64,
    ) -> Digest {
        Self::digest(&encode_payload(&[
            PayloadPart::Text(name),
            PayloadPart::Attributes(attributes),
            PayloadPart::Integer(unix_ts),
            PayloadPart::Integer(version),
        ]))
    }

    /// Aggregate hash over the master hash and the version hashes, in the
    /// order given. `unix_ts` only contributes under
    /// [`DynamicHashScheme::WithTimestamp`].
    pub fn dynamic_hash(&self, master: &Digest, version_hashes: &[Digest], unix_ts: u64) -> Digest {
        let mut parts = Vec::with_capacity(version_hashes.len() + 2);
        parts.push(PayloadPart::Digest(master));
        parts.extend(version_hashes.iter().map(PayloadPart::Digest));
        if self.scheme == DynamicHashScheme::WithTimestamp {
            parts.push(PayloadPart::Integer(unix_ts));
        }
        Self::digest(&encode_payload(&parts))
    }

    /// Master hash of a passport's current state, stamped with `updatedAt`.
    pub fn master_hash_of(&self, passport: &Passport) -> Result<Digest, HasherError> {
        let unix_ts = passport.updated_at.unix_seconds()?;
        Ok(self.master_hash(&passport.name, &passport.current_attributes, unix_ts))
    }

    /// Version hash of version `number`, stamped with that version's
    /// `createdAt`.
    pub fn version_hash_of(&self, passport: &Passport, number: u64) -> Result<Digest, HasherError> {
        let version = passport
            .version(number)
            .ok_or(TypeError::VersionNotFound(number))?;
        let unix_ts = version.created_at.unix_seconds()?;
        Ok(self.version_hash(&passport.name, &version.attributes, unix_ts, number))
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Record(#[from] TypeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpp_types::{RecordId, Timestamp};
    use serde_json::{json, Value};

    fn attrs(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn widget() -> Attributes {
        attrs(json!({"Origin": {"country": "ES"}}))
    }

    const TS: u64 = 1_700_000_000;

    #[test]
    fn keccak_known_vector() {
        assert_eq!(
            HashEngine::digest(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn master_hash_is_keccak_of_payload() {
        let engine = HashEngine::default();
        let expected = HashEngine::digest(br#"Widget{"Origin":{"country":"ES"}}1700000000"#);
        assert_eq!(engine.master_hash("Widget", &widget(), TS), expected);
    }

    #[test]
    fn version_hash_appends_version_number() {
        let engine = HashEngine::default();
        let expected = HashEngine::digest(br#"Widget{"Origin":{"country":"ES"}}17000000003"#);
        assert_eq!(engine.version_hash("Widget", &widget(), TS, 3), expected);
    }

    #[test]
    fn hashes_are_deterministic() {
        let engine = HashEngine::default();
        assert_eq!(
            engine.master_hash("Widget", &widget(), TS),
            engine.master_hash("Widget", &widget(), TS)
        );
        assert_eq!(
            engine.version_hash("Widget", &widget(), TS, 1),
            engine.version_hash("Widget", &widget(), TS, 1)
        );
        let m = Digest::from_hash([1; 32]);
        let vs = [Digest::from_hash([2; 32]), Digest::from_hash([3; 32])];
        assert_eq!(engine.dynamic_hash(&m, &vs, TS), engine.dynamic_hash(&m, &vs, TS));
    }

    #[test]
    fn master_and_version_hash_differ() {
        let engine = HashEngine::default();
        assert_ne!(
            engine.master_hash("Widget", &widget(), TS),
            engine.version_hash("Widget", &widget(), TS, 1)
        );
    }

    #[test]
    fn attribute_order_matters() {
        let engine = HashEngine::default();
        let a: Attributes = serde_json::from_str(r#"{"a": 1, "b": 2}"#).unwrap();
        let b: Attributes = serde_json::from_str(r#"{"b": 2, "a": 1}"#).unwrap();
        assert_ne!(engine.master_hash("x", &a, TS), engine.master_hash("x", &b, TS));
    }

    #[test]
    fn empty_and_absent_sections_differ() {
        let engine = HashEngine::default();
        let with_empty = attrs(json!({"Origin": {}}));
        assert_ne!(
            engine.master_hash("Widget", &with_empty, TS),
            engine.master_hash("Widget", &Attributes::new(), TS)
        );
    }

    #[test]
    fn appending_a_version_changes_dynamic_hash() {
        let engine = HashEngine::default();
        let m = Digest::from_hash([1; 32]);
        let mut versions = vec![Digest::from_hash([2; 32])];
        let before = engine.dynamic_hash(&m, &versions, TS);
        versions.push(Digest::from_hash([3; 32]));
        let after = engine.dynamic_hash(&m, &versions, TS);
        assert_ne!(before, after);
    }

    #[test]
    fn version_order_matters_for_dynamic_hash() {
        let engine = HashEngine::default();
        let m = Digest::from_hash([1; 32]);
        let a = Digest::from_hash([2; 32]);
        let b = Digest::from_hash([3; 32]);
        assert_ne!(
            engine.dynamic_hash(&m, &[a, b], TS),
            engine.dynamic_hash(&m, &[b, a], TS)
        );
    }

    #[test]
    fn timestamp_scheme_switch() {
        let plain = HashEngine::new(DynamicHashScheme::WithoutTimestamp);
        let stamped = HashEngine::new(DynamicHashScheme::WithTimestamp);
        let m = Digest::from_hash([1; 32]);
        let vs = [Digest::from_hash([2; 32])];

        assert_eq!(plain.dynamic_hash(&m, &vs, 1), plain.dynamic_hash(&m, &vs, 2));
        assert_ne!(stamped.dynamic_hash(&m, &vs, 1), stamped.dynamic_hash(&m, &vs, 2));
        assert_ne!(plain.dynamic_hash(&m, &vs, 1), stamped.dynamic_hash(&m, &vs, 1));

        let mut expected = m.as_bytes().to_vec();
        expected.extend_from_slice(vs[0].as_bytes());
        expected.extend_from_slice(b"1700000000");
        assert_eq!(stamped.dynamic_hash(&m, &vs, TS), HashEngine::digest(&expected));
    }

    #[test]
    fn scheme_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&DynamicHashScheme::WithTimestamp).unwrap(),
            "\"with-timestamp\""
        );
    }

    #[test]
    fn record_level_hashes_use_record_timestamps() {
        let engine = HashEngine::default();
        let created = Timestamp::from_unix_seconds(TS).unwrap();
        let mut passport = Passport::create(
            RecordId::from_bytes([1; 12]),
            "Widget",
            None,
            widget(),
            vec![],
            created,
        );
        let later = Timestamp::from_unix_seconds(TS + 60).unwrap();
        passport.append_version(attrs(json!({"Origin": {"country": "PT"}})), vec![], later);

        assert_eq!(
            engine.master_hash_of(&passport).unwrap(),
            engine.master_hash("Widget", &passport.current_attributes, TS + 60)
        );
        assert_eq!(
            engine.version_hash_of(&passport, 1).unwrap(),
            engine.version_hash("Widget", &widget(), TS, 1)
        );
        assert_eq!(
            engine.version_hash_of(&passport, 3),
            Err(HasherError::Record(TypeError::VersionNotFound(3)))
        );
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn master_hash_sensitive_to_name(name in "[a-zA-Z0-9 ]{1,24}", extra in "[a-z]") {
                let engine = HashEngine::default();
                let changed = format!("{name}{extra}");
                prop_assert_ne!(
                    engine.master_hash(&name, &widget(), TS),
                    engine.master_hash(&changed, &widget(), TS)
                );
            }

            #[test]
            fn master_hash_sensitive_to_timestamp(ts in 0u64..u64::MAX) {
                let engine = HashEngine::default();
                prop_assert_ne!(
                    engine.master_hash("Widget", &widget(), ts),
                    engine.master_hash("Widget", &widget(), ts + 1)
                );
            }

            #[test]
            fn version_hash_sensitive_to_attribute_value(value in "[A-Z]{2}", other in "[A-Z]{2}") {
                prop_assume!(value != other);
                let engine = HashEngine::default();
                let a = attrs(json!({"Origin": {"country": value}}));
                let b = attrs(json!({"Origin": {"country": other}}));
                prop_assert_ne!(
                    engine.version_hash("Widget", &a, TS, 1),
                    engine.version_hash("Widget", &b, TS, 1)
                );
            }
        }
    }
}

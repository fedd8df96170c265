use std::fmt;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// UTC instant as read from the record store.
///
/// Deserializes from an RFC 3339 string, from integer epoch milliseconds, or
/// from the store's extended form `{"$date": ...}` wrapping either.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from whole Unix seconds.
    pub fn from_unix_seconds(secs: u64) -> Result<Self, TypeError> {
        let secs = i64::try_from(secs).map_err(|_| TypeError::InvalidTimestamp(secs.to_string()))?;
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(Self)
            .ok_or_else(|| TypeError::InvalidTimestamp(secs.to_string()))
    }

    /// Build from epoch milliseconds.
    pub fn from_unix_millis(millis: i64) -> Result<Self, TypeError> {
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Self)
            .ok_or_else(|| TypeError::InvalidTimestamp(millis.to_string()))
    }

    /// Parse an RFC 3339 / ISO-8601 string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s}: {e}")))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Whole seconds since the epoch, sub-second precision dropped.
    pub fn unix_seconds(&self) -> Result<u64, TypeError> {
        to_unix_seconds(&self.0)
    }
}

/// Convert an instant to whole Unix seconds as the ledger stores them.
///
/// Sub-second precision is dropped. Instants before the epoch have no
/// unsigned representation and are rejected.
pub fn to_unix_seconds(at: &DateTime<Utc>) -> Result<u64, TypeError> {
    let secs = at.timestamp();
    u64::try_from(secs).map_err(|_| TypeError::PreEpochTimestamp(secs))
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InstantRepr {
    Text(String),
    Millis(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Plain(InstantRepr),
    Extended {
        #[serde(rename = "$date")]
        date: InstantRepr,
    },
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let instant = match TimestampRepr::deserialize(deserializer)? {
            TimestampRepr::Plain(i) | TimestampRepr::Extended { date: i } => i,
        };
        match instant {
            InstantRepr::Text(s) => Self::parse(&s),
            InstantRepr::Millis(ms) => Self::from_unix_millis(ms),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_sub_second_precision() {
        let ts = Timestamp::parse("2023-11-14T22:13:20.999Z").unwrap();
        assert_eq!(ts.unix_seconds().unwrap(), 1_700_000_000);
    }

    #[test]
    fn honours_offsets() {
        let ts = Timestamp::parse("2023-11-14T23:13:20+01:00").unwrap();
        assert_eq!(ts.unix_seconds().unwrap(), 1_700_000_000);
    }

    #[test]
    fn rejects_pre_epoch() {
        let ts = Timestamp::parse("1969-12-31T23:59:59Z").unwrap();
        assert_eq!(ts.unix_seconds(), Err(TypeError::PreEpochTimestamp(-1)));
    }

    #[test]
    fn from_unix_seconds_roundtrip() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        assert_eq!(ts.unix_seconds().unwrap(), 1_700_000_000);
        assert_eq!(ts.to_string(), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn deserializes_all_store_forms() {
        let plain: Timestamp = serde_json::from_str(r#""2023-11-14T22:13:20.500Z""#).unwrap();
        let extended: Timestamp =
            serde_json::from_str(r#"{"$date": "2023-11-14T22:13:20.500Z"}"#).unwrap();
        let millis: Timestamp = serde_json::from_str(r#"{"$date": 1700000000500}"#).unwrap();
        let bare_millis: Timestamp = serde_json::from_str("1700000000500").unwrap();
        assert_eq!(plain, extended);
        assert_eq!(plain, millis);
        assert_eq!(plain, bare_millis);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Timestamp>(r#""yesterday""#).is_err());
        assert!(Timestamp::parse("2023-13-01T00:00:00Z").is_err());
    }

    #[test]
    fn serializes_as_rfc3339_millis() {
        let ts = Timestamp::parse("2023-11-14T22:13:20.5Z").unwrap();
        assert_eq!(
            serde_json::to_string(&ts).unwrap(),
            r#""2023-11-14T22:13:20.500Z""#
        );
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Transaction timestamp of a ledger revision, kept at microsecond precision.
///
/// Serializes as RFC 3339 with six fractional digits and a `Z` suffix, which
/// is also how gateways hand revision timestamps back in plain form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerDatetime(pub DateTime<Utc>);

impl LedgerDatetime {
    pub fn now() -> Self {
        LedgerDatetime(datetime_micros())
    }

    pub fn inner(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| LedgerDatetime(dt.with_timezone(&Utc)))
    }
}

impl Serialize for LedgerDatetime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for LedgerDatetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LedgerDatetime::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Default for LedgerDatetime {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for LedgerDatetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
        )
    }
}

impl From<DateTime<Utc>> for LedgerDatetime {
    fn from(dt: DateTime<Utc>) -> Self {
        LedgerDatetime(dt)
    }
}

impl From<LedgerDatetime> for DateTime<Utc> {
    fn from(dt: LedgerDatetime) -> Self {
        dt.0
    }
}

/// Current time truncated to microseconds.
fn datetime_micros() -> DateTime<Utc> {
    let now = match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(time) => time,
        Err(_) => std::time::Duration::from_secs(0),
    };

    let timestamp_micros = (now.as_secs() as i64 * 1_000_000) + (now.subsec_micros() as i64);
    if let Some(time) = DateTime::from_timestamp_micros(timestamp_micros) {
        time
    } else {
        DateTime::<Utc>::from_timestamp_nanos(0)
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Parses the timestamp shapes the backend is known to emit.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC), or a bare
/// `YYYY-MM-DD` (midnight UTC). Anything else yields `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Builds a timestamp from a `[year, month, day, hour?, minute?, second?, nanos?]` array.
pub fn timestamp_from_parts(parts: &[i64]) -> Option<DateTime<Utc>> {
    let field = |index: usize| parts.get(index).copied().unwrap_or(0);
    if parts.len() < 3 {
        return None;
    }

    let year = i32::try_from(field(0)).ok()?;
    let month = u32::try_from(field(1)).ok()?;
    let day = u32::try_from(field(2)).ok()?;
    let hour = u32::try_from(field(3)).ok()?;
    let minute = u32::try_from(field(4)).ok()?;
    let second = u32::try_from(field(5)).ok()?;
    let nanos = u32::try_from(field(6)).ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_nano_opt(hour, minute, second, nanos))
        .map(|naive| naive.and_utc())
}

pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Parts(Vec<i64>),
    Other(serde::de::IgnoredAny),
}

/// Serde adapter for optional timestamps that never fails on malformed input.
pub mod lenient_timestamp {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
        Ok(match raw {
            Some(RawTimestamp::Text(text)) => parse_timestamp(&text),
            Some(RawTimestamp::Parts(parts)) => timestamp_from_parts(&parts),
            Some(RawTimestamp::Other(_)) | None => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::Deserialize;

    use super::{parse_timestamp, timestamp_from_parts};

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, with = "super::lenient_timestamp")]
        at: Option<chrono::DateTime<Utc>>,
    }

    #[test]
    fn bare_dates_are_midnight_utc() {
        assert_eq!(
            parse_timestamp("2025-09-15"),
            Some(Utc.with_ymd_and_hms(2025, 9, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn naive_and_zoned_timestamps_parse() {
        assert_eq!(
            parse_timestamp("2025-09-15T10:30:00"),
            Some(Utc.with_ymd_and_hms(2025, 9, 15, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2025-09-15T12:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2025, 9, 15, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(timestamp_from_parts(&[2025, 13, 1]), None);
    }

    #[test]
    fn serde_adapter_tolerates_any_shape() {
        let parsed: Holder = serde_json::from_str(r#"{"at": [2025, 9, 15, 8, 0]}"#).unwrap();
        assert_eq!(parsed.at, Some(Utc.with_ymd_and_hms(2025, 9, 15, 8, 0, 0).unwrap()));

        let parsed: Holder = serde_json::from_str(r#"{"at": 17}"#).unwrap();
        assert_eq!(parsed.at, None);

        let parsed: Holder = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.at, None);
    }
}

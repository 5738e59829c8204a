use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;

const FORMAT_WITH_FRACTION: &str = "%Y-%m-%d %H:%M:%S%.f";
const FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// Converts a broker timestamp (UTC, sub-second fraction optional) into the
/// configured display timezone. The broker emits ISO-8601-ish strings such as
/// `2024-01-01T12:00:00.500Z`; the `T` and trailing `Z` are tolerated.
pub fn normalize_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let cleaned = raw.trim().replace('T', " ");
    let cleaned = cleaned.trim_end_matches('Z');

    let naive = NaiveDateTime::parse_from_str(cleaned, FORMAT_WITH_FRACTION)
        .or_else(|_| NaiveDateTime::parse_from_str(cleaned, FORMAT_SECONDS))
        .with_context(|| format!("unparseable timestamp {raw:?}"))?;

    Ok(naive.and_utc().with_timezone(&tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const SAO_PAULO: Tz = chrono_tz::America::Sao_Paulo;

    #[test]
    fn converts_utc_to_display_timezone_preserving_fraction() {
        let converted =
            normalize_timestamp("2024-01-01 12:00:00.500000", SAO_PAULO).expect("parse");
        assert_eq!(converted.hour(), 9);
        assert_eq!(converted.minute(), 0);
        assert_eq!(converted.second(), 0);
        assert_eq!(converted.nanosecond(), 500_000_000);
    }

    #[test]
    fn converts_without_fraction() {
        let converted = normalize_timestamp("2024-01-01 12:00:00", SAO_PAULO).expect("parse");
        assert_eq!(converted.hour(), 9);
        assert_eq!(converted.nanosecond(), 0);
    }

    #[test]
    fn tolerates_iso_separator_and_zulu_suffix() {
        let converted =
            normalize_timestamp("2024-01-01T12:00:00.500Z", SAO_PAULO).expect("parse");
        assert_eq!(converted.hour(), 9);
        assert_eq!(converted.nanosecond(), 500_000_000);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(normalize_timestamp("not-a-timestamp", SAO_PAULO).is_err());
        assert!(normalize_timestamp("2024-13-99 99:00:00", SAO_PAULO).is_err());
    }

    #[test]
    fn preserves_order() {
        let earlier = normalize_timestamp("2024-01-01 12:00:00", SAO_PAULO).expect("parse");
        let later = normalize_timestamp("2024-01-01 12:00:10", SAO_PAULO).expect("parse");
        assert!(earlier < later);
    }
}

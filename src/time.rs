//! Vendor timestamp parsing and accuracy combination

use crate::error::{FindError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp format used in all SmartThings Find responses
const FIND_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Parse a vendor timestamp (`YYYYMMDDhhmmss`, UTC).
///
/// Strict: wrong length, non-digit characters or an invalid calendar date
/// fail with `MalformedTimestamp`; values are never clamped.
pub fn parse_find_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FindError::malformed_timestamp(raw));
    }
    let naive = NaiveDateTime::parse_from_str(raw, FIND_TIMESTAMP_FORMAT)
        .map_err(|_| FindError::malformed_timestamp(raw))?;
    Ok(naive.and_utc())
}

/// Combine horizontal and vertical uncertainty into a single GPS accuracy
/// figure (Pythagoras, one decimal place).
///
/// Absence of either input is an expected outcome for operations without
/// uncertainty data and yields `None`.
pub fn combine_accuracy(horizontal: Option<f64>, vertical: Option<f64>) -> Option<f64> {
    let h = horizontal?;
    let v = vertical?;
    Some(((h * h + v * v).sqrt() * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_vendor_timestamp_as_utc() {
        let parsed = parse_find_timestamp("20240115103045").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 45).unwrap());
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(parse_find_timestamp("2024011510304").is_err()); // too short
        assert!(parse_find_timestamp("202401151030455").is_err()); // too long
        assert!(parse_find_timestamp("2024011510304x").is_err()); // non-digit
        assert!(parse_find_timestamp("20241315103045").is_err()); // month 13
        assert!(parse_find_timestamp("20240230103045").is_err()); // Feb 30
        assert!(parse_find_timestamp("").is_err());
    }

    #[test]
    fn combines_uncertainties() {
        assert_eq!(combine_accuracy(Some(3.0), Some(4.0)), Some(5.0));
        assert_eq!(combine_accuracy(None, Some(4.0)), None);
        assert_eq!(combine_accuracy(Some(3.0), None), None);
        assert_eq!(combine_accuracy(None, None), None);
    }

    #[test]
    fn accuracy_rounds_to_one_decimal() {
        assert_eq!(combine_accuracy(Some(1.0), Some(1.0)), Some(1.4));
        assert_eq!(combine_accuracy(Some(10.0), Some(10.0)), Some(14.1));
    }
}

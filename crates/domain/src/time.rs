//! Time and timestamp helpers.

use chrono::{DateTime, Utc};

/// UTC timestamp used for reading times and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Parse an ISO-8601 / RFC 3339 timestamp, normalising it to UTC.
///
/// # Errors
///
/// Returns the chrono parse error when `text` is not RFC 3339.
pub fn parse(text: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_current_utc_time() {
        let before = Utc::now();
        let ts = now();
        let after = Utc::now();
        assert!(ts >= before);
        assert!(ts <= after);
    }

    #[test]
    fn should_normalise_offsets_to_utc() {
        let ts = parse("2024-03-01T12:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn should_reject_non_rfc3339_text() {
        assert!(parse("yesterday").is_err());
    }
}

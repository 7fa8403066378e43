//! Human-readable identifier formatting (CNT-01).
//!
//! Request and batch numbers are `<PREFIX><YYYYMMDD><zero-padded sequence>`,
//! e.g. `CNR202508060007`. The numeric suffix comes from the per-day
//! sequence allocator; formatting is kept separate so the allocator stays a
//! bare atomic counter.

use chrono::NaiveDate;

use crate::error::CoreError;

/// Prefix for case-note request numbers.
pub const REQUEST_NUMBER_PREFIX: &str = "CNR";

/// Prefix for batch numbers.
pub const BATCH_NUMBER_PREFIX: &str = "BCH";

/// Width of the zero-padded sequence suffix.
pub const SEQUENCE_PAD_WIDTH: usize = 4;

/// Format a calendar date as the allocator's `YYYYMMDD` date key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Validate a date key: exactly eight ASCII digits.
pub fn validate_date_key(key: &str) -> Result<(), CoreError> {
    if key.len() == 8 && key.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid date key '{key}'. Expected YYYYMMDD"
        )))
    }
}

fn format_number(prefix: &str, key: &str, sequence: i32) -> String {
    format!("{prefix}{key}{sequence:0width$}", width = SEQUENCE_PAD_WIDTH)
}

/// Build a request number from a date key and allocated sequence.
pub fn request_number(key: &str, sequence: i32) -> String {
    format_number(REQUEST_NUMBER_PREFIX, key, sequence)
}

/// Build a batch number from a date key and allocated sequence.
pub fn batch_number(key: &str, sequence: i32) -> String {
    format_number(BATCH_NUMBER_PREFIX, key, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_number_format() {
        assert_eq!(request_number("20250101", 7), "CNR202501010007");
    }

    #[test]
    fn batch_number_format() {
        assert_eq!(batch_number("20251231", 123), "BCH202512310123");
    }

    #[test]
    fn sequence_beyond_pad_width_is_not_truncated() {
        assert_eq!(request_number("20250101", 12345), "CNR2025010112345");
    }

    #[test]
    fn date_key_from_naive_date() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 6).unwrap();
        assert_eq!(date_key(d), "20250806");
    }

    #[test]
    fn date_key_validation() {
        assert!(validate_date_key("20250806").is_ok());
        assert!(validate_date_key("2025086").is_err());
        assert!(validate_date_key("2025-08-06").is_err());
        assert!(validate_date_key("2025080a").is_err());
    }
}

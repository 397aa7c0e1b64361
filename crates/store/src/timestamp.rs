use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::StoreError;

/// Layout of `last_updated`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset the clock is rendered in. `0` is UTC, `8` is Beijing time.
pub fn fixed_offset(hours: i32) -> Result<FixedOffset, StoreError> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or(StoreError::InvalidOffset(hours))
}

pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn formats_utc_by_default() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let offset = fixed_offset(0).unwrap();
        assert_eq!(format_timestamp(now, offset), "2025-01-01 12:00:00");
    }

    #[test]
    fn beijing_offset_rolls_the_date() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 20, 30, 5).unwrap();
        let offset = fixed_offset(8).unwrap();
        assert_eq!(format_timestamp(now, offset), "2025-01-02 04:30:05");
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        assert!(matches!(fixed_offset(24), Err(StoreError::InvalidOffset(24))));
        assert!(fixed_offset(-23).is_ok());
    }

    #[test]
    fn parse_accepts_only_the_fixed_layout() {
        assert!(parse_timestamp("2025-01-01 12:00:00").is_some());
        assert!(parse_timestamp("2025-01-01T12:00:00Z").is_none());
    }
}

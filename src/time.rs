//! Commit-date parsing and report timestamps.

use chrono::{DateTime, Local, NaiveDate};

/// Placeholder shown when a ref has no readable commit date.
pub const UNKNOWN_DATE: &str = "unknown";

/// Parse a git ISO committer date (`2024-03-01 10:00:00 +0100`, as printed by
/// `%ci` / `%(committerdate:iso)`) into the calendar day in the committer's
/// own timezone.
pub fn parse_commit_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(datetime) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z") {
        return Some(datetime.date_naive());
    }

    // Fall back to the leading YYYY-MM-DD for any other ISO-like shape
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// `YYYY-MM-DD`, or `unknown` when there is no date.
pub fn format_commit_day(day: Option<NaiveDate>) -> String {
    match day {
        Some(day) => day.format("%Y-%m-%d").to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Timestamp printed in the report header.
pub fn format_analysis_time(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn analysis_time_now() -> String {
    format_analysis_time(Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_commit_day_iso() {
        let day = parse_commit_day("2024-03-01 23:30:00 +0100").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_commit_day_keeps_committer_timezone() {
        // 23:30 at -0500 is already the next day in UTC; the committer's day wins
        let day = parse_commit_day("2024-03-01 23:30:00 -0500").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_commit_day_with_whitespace() {
        assert!(parse_commit_day("  2024-03-01 10:00:00 +0000\n").is_some());
    }

    #[test]
    fn test_parse_commit_day_date_only() {
        let day = parse_commit_day("2023-12-31").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_parse_commit_day_invalid() {
        assert!(parse_commit_day("").is_none());
        assert!(parse_commit_day("yesterday").is_none());
        assert!(parse_commit_day("2025-02-30 00:00:00 +0000").is_none());
    }

    #[test]
    fn test_format_commit_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(format_commit_day(day), "2024-01-05");
        assert_eq!(format_commit_day(None), "unknown");
    }

    #[test]
    fn test_format_analysis_time() {
        let now = Local.with_ymd_and_hms(2024, 6, 7, 8, 9, 10).unwrap();
        assert_eq!(format_analysis_time(now), "2024-06-07 08:09:10");
    }
}

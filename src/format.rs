//! Human-readable duration formatting for the status snapshot and dashboard.

/// Format a millisecond duration as a compact `1d2h3m4s` string.
///
/// Only non-zero leading units are emitted, but once a unit appears every
/// smaller unit is emitted too (`"1h0m5s"`, never `"1h5s"`). The seconds
/// component is always present. Negative input formats as `"0s"`.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0s".to_string();
    }

    let total_secs = ms / 1000;
    let seconds = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = (total_secs / 3600) % 24;
    let days = total_secs / 86400;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 || !parts.is_empty() {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 || !parts.is_empty() {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));

    parts.concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(-1), "0s");
        assert_eq!(format_duration(i64::MIN), "0s");
    }

    #[test]
    fn test_seconds_only() {
        assert_eq!(format_duration(999), "0s");
        assert_eq!(format_duration(1_000), "1s");
        assert_eq!(format_duration(59_000), "59s");
    }

    #[test]
    fn test_smaller_units_kept_once_a_unit_appears() {
        // 1 hour, 0 minutes, 5 seconds
        assert_eq!(format_duration(3_605_000), "1h0m5s");
        // 2 minutes exactly
        assert_eq!(format_duration(120_000), "2m0s");
        // 1 day, 0 hours, 0 minutes, 0 seconds
        assert_eq!(format_duration(86_400_000), "1d0h0m0s");
    }

    #[test]
    fn test_full_composition() {
        // 1 day, 1 hour, 1 minute, 1 second
        assert_eq!(format_duration(90_061_000), "1d1h1m1s");
        assert_eq!(format_duration(90_061_999), "1d1h1m1s");
    }
}

//! Shared utilities for plant-telemetry

use chrono::{DateTime, Utc};

/// Current wall-clock time as seconds since the Unix epoch, e.g. `1700000000.123456`
pub fn unix_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Render a point in time as `<seconds>.<microseconds>` since the epoch
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

/// Render a float as a plain decimal string, never in exponent notation.
///
/// Whole numbers keep a trailing `.0` so `45.0` is sent as `"45.0"`, not `"45"`.
pub fn decimal_string(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Format bytes to human readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        assert_eq!(format_timestamp(at), "1700000000.123456");

        let whole = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(format_timestamp(whole), "1700000000.000000");
    }

    #[test]
    fn test_decimal_string() {
        assert_eq!(decimal_string(1013.25), "1013.25");
        assert_eq!(decimal_string(45.0), "45.0");
        assert_eq!(decimal_string(0.0), "0.0");
        assert_eq!(decimal_string(-3.5), "-3.5");
        assert_eq!(decimal_string(0.0000001), "0.0000001");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 + 512 * 1024), "3.5 MB");
    }
}

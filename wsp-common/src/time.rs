//! Timestamp and media-time helpers

use chrono::{DateTime, Utc};

/// Get current UTC timestamp for event records
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a position fraction to seconds of a media of `duration` seconds
pub fn fraction_to_secs(fraction: f64, duration: f64) -> f64 {
    fraction * duration
}

/// Convert seconds to a position fraction, 0 when the duration is unknown
pub fn secs_to_fraction(secs: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (secs / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Format seconds as `m:ss`, or `h:mm:ss` past one hour
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_fraction_conversions() {
        assert_eq!(fraction_to_secs(0.5, 120.0), 60.0);
        assert_eq!(secs_to_fraction(60.0, 120.0), 0.5);
        assert_eq!(secs_to_fraction(500.0, 120.0), 1.0);
        assert_eq!(secs_to_fraction(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(65.9), "1:05");
        assert_eq!(format_clock(3725.0), "1:02:05");
        assert_eq!(format_clock(f64::NAN), "0:00");
        assert_eq!(format_clock(-3.0), "0:00");
    }
}

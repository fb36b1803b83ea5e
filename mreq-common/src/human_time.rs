//! Human-readable track duration formatting
//!
//! Provides consistent duration display for search listings and playback cards.

/// Tracks at or above this length switch to `H:MM:SS`
const LONG_FORMAT_MIN: u64 = 3600;

/// Format a track length in seconds.
///
/// - Under one hour: `M:SS`
/// - One hour or more: `H:MM:SS`
///
/// # Examples
///
/// ```
/// use mreq_common::human_time::format_track_duration;
///
/// assert_eq!(format_track_duration(0), "0:00");
/// assert_eq!(format_track_duration(269), "4:29");
/// assert_eq!(format_track_duration(3725), "1:02:05");
/// ```
pub fn format_track_duration(seconds: u64) -> String {
    if seconds >= LONG_FORMAT_MIN {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        let secs = seconds % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }
}

/// Convert a catalogue duration in milliseconds to whole seconds (truncating)
pub fn millis_to_seconds(millis: u64) -> u64 {
    millis / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_track() {
        assert_eq!(format_track_duration(5), "0:05");
        assert_eq!(format_track_duration(60), "1:00");
    }

    #[test]
    fn test_medium_track() {
        assert_eq!(format_track_duration(3599), "59:59");
    }

    #[test]
    fn test_long_track() {
        assert_eq!(format_track_duration(3600), "1:00:00");
        assert_eq!(format_track_duration(36_061), "10:01:01");
    }

    #[test]
    fn test_millis_to_seconds_truncates() {
        assert_eq!(millis_to_seconds(269_999), 269);
        assert_eq!(millis_to_seconds(999), 0);
    }
}

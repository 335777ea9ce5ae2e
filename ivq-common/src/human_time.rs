//! Human-readable time formatting for player controls
//!
//! Provides consistent clock display across the time label, the scrub
//! preview tooltip and log output.

/// Seconds at or above which the hour field is shown
const HOUR_FORMAT_MIN: i64 = 3600;

/// Format seconds as a player clock.
///
/// - Under one hour: `M:SS`
/// - One hour or more: `H:MM:SS`
///
/// Fractions are truncated (a clock shows whole elapsed seconds). Negative
/// and non-finite inputs render as `0:00`.
///
/// # Examples
///
/// ```
/// use ivq_common::human_time::format_clock;
///
/// assert_eq!(format_clock(0.0), "0:00");
/// assert_eq!(format_clock(30.9), "0:30");
/// assert_eq!(format_clock(125.0), "2:05");
/// assert_eq!(format_clock(3661.0), "1:01:01");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as i64
    } else {
        0
    };

    if total >= HOUR_FORMAT_MIN {
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        let mins = total / 60;
        let secs = total % 60;
        format!("{}:{:02}", mins, secs)
    }
}

/// Format the `current / duration` label shown next to the seek bar.
///
/// When the duration runs an hour or longer the current time is padded to
/// the same `H:MM:SS` shape so the label does not jump in width.
///
/// # Examples
///
/// ```
/// use ivq_common::human_time::format_clock_pair;
///
/// assert_eq!(format_clock_pair(30.9, 120.0), "0:30 / 2:00");
/// assert_eq!(format_clock_pair(65.0, 3700.0), "0:01:05 / 1:01:40");
/// ```
pub fn format_clock_pair(current: f64, duration: f64) -> String {
    let duration_label = format_clock(duration);
    let current_label = if duration.is_finite() && duration >= HOUR_FORMAT_MIN as f64 {
        let total = if current.is_finite() && current > 0.0 {
            current.floor() as i64
        } else {
            0
        };
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    } else {
        format_clock(current)
    };
    format!("{} / {}", current_label, duration_label)
}

//! Relative "time ago" labels for the recently viewed list.

use chrono::{DateTime, Utc};

/// Formats `then` relative to `now` using the dashboard's Vietnamese labels.
///
/// Timestamps in the future (clock skew between tabs) read as "just now".
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let minutes = elapsed.num_minutes();

    if minutes < 1 {
        return "Vừa xong".to_string();
    }
    if minutes < 60 {
        return format!("{minutes} phút trước");
    }

    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours} giờ trước");
    }

    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days} ngày trước");
    }

    then.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_just_now_and_future() {
        assert_eq!(format_relative(now() - Duration::seconds(59), now()), "Vừa xong");
        assert_eq!(format_relative(now() + Duration::minutes(3), now()), "Vừa xong");
    }

    #[test]
    fn test_minutes_hours_days() {
        assert_eq!(format_relative(now() - Duration::minutes(5), now()), "5 phút trước");
        assert_eq!(format_relative(now() - Duration::minutes(61), now()), "1 giờ trước");
        assert_eq!(format_relative(now() - Duration::hours(23), now()), "23 giờ trước");
        assert_eq!(format_relative(now() - Duration::days(6), now()), "6 ngày trước");
    }

    #[test]
    fn test_older_than_a_week_shows_date() {
        assert_eq!(format_relative(now() - Duration::days(10), now()), "04/03/2026");
    }
}

pub mod dashboard;
pub mod set_detail;
pub mod sets;
pub mod study;

use chrono::DateTime;

pub(crate) fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%b %d").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// How far `at` lies ahead of `now`. Beyond a day the date is shown instead.
pub(crate) fn format_until(at: i64, now: i64) -> String {
    let minutes = (at - now).max(0).div_euclid(60_000);
    match minutes {
        0 => "in under a minute".to_string(),
        1..=59 => format!("in {}m", minutes),
        60..=1439 => format!("in {}h {}m", minutes / 60, minutes % 60),
        _ => format_date(at),
    }
}

pub(crate) fn accuracy_bar(percent: f64) -> String {
    let filled = ((percent / 20.0).round() as usize).min(5);
    format!("{}{}", "█".repeat(filled), "░".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_bar_rounds_to_fifths() {
        assert_eq!(accuracy_bar(0.0), "░░░░░");
        assert_eq!(accuracy_bar(50.0), "███░░");
        assert_eq!(accuracy_bar(100.0), "█████");
    }

    #[test]
    fn format_until_short_delays() {
        let minute = 60_000;
        assert_eq!(format_until(30_000, 0), "in under a minute");
        assert_eq!(format_until(minute, 0), "in 1m");
        assert_eq!(format_until(60 * minute, 0), "in 1h 0m");
        assert_eq!(format_until(90 * minute, 0), "in 1h 30m");
        assert_eq!(format_until(0, 5 * minute), "in under a minute");
    }

    #[test]
    fn format_until_falls_back_to_date() {
        let day = 24 * 60 * 60_000;
        assert_eq!(format_until(3 * day, 0), "Jan 04");
    }

    #[test]
    fn format_date_short_month() {
        assert_eq!(format_date(0), "Jan 01");
    }
}

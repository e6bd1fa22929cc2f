//! Clock helpers - Local-time arithmetic on a fixed UTC offset.
//!
//! The bot interprets clock times in the household's timezone (a fixed
//! offset, JST by default) but stores every timestamp in UTC. These helpers
//! do the conversions in one place so the rules stay consistent.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

/// Converts a naive local timestamp to UTC using the given fixed offset.
pub fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let utc_naive = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_naive)
}

/// Midnight at the start of the local day containing `now_local`, in UTC.
pub fn day_start(now_local: DateTime<FixedOffset>) -> DateTime<Utc> {
    to_utc(now_local.date_naive().and_time(NaiveTime::MIN), *now_local.offset())
}

/// Midnight on the Monday of the local week containing `now_local`, in UTC.
pub fn week_start(now_local: DateTime<FixedOffset>) -> DateTime<Utc> {
    let days_into_week = i64::from(now_local.weekday().num_days_from_monday());
    let monday = now_local.date_naive() - Duration::days(days_into_week);
    to_utc(monday.and_time(NaiveTime::MIN), *now_local.offset())
}

/// Midnight on the first of the local month containing `now_local`, in UTC.
pub fn month_start(now_local: DateTime<FixedOffset>) -> DateTime<Utc> {
    let first = now_local
        .date_naive()
        .with_day(1)
        .unwrap_or_else(|| now_local.date_naive());
    to_utc(first.and_time(NaiveTime::MIN), *now_local.offset())
}

/// How long to sleep until the next local occurrence of `at`.
///
/// If `at` has already passed today (or is exactly now), the next occurrence
/// is tomorrow, so scheduled jobs never fire twice on one day.
pub fn duration_until_next(
    now_local: DateTime<FixedOffset>,
    at: NaiveTime,
) -> std::time::Duration {
    let today_target = now_local.date_naive().and_time(at);
    let target = if today_target > now_local.naive_local() {
        today_target
    } else {
        today_target + Duration::days(1)
    };
    (target - now_local.naive_local())
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}

/// Parses a user-supplied date, either `YYYY-MM-DD` or `MM/DD`.
///
/// The short form has no year, so it borrows the year of `today`.
pub fn parse_user_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    NaiveDate::parse_from_str(&format!("{}/{text}", today.year()), "%Y/%m/%d").ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::NaiveDate;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        jst()
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(y, mo, d)
                    .unwrap()
                    .and_hms_opt(h, mi, 0)
                    .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_to_utc_subtracts_offset() {
        let naive = NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let utc = to_utc(naive, jst());
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_day_start() {
        let now = local(2024, 5, 10, 15, 30);
        // Local midnight 2024-05-10 00:00 JST is 2024-05-09 15:00 UTC
        assert_eq!(
            day_start(now),
            Utc.with_ymd_and_hms(2024, 5, 9, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_week_start_mid_week() {
        // 2024-05-10 is a Friday; the week began Monday 2024-05-06
        let now = local(2024, 5, 10, 20, 0);
        assert_eq!(
            week_start(now),
            Utc.with_ymd_and_hms(2024, 5, 5, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_week_start_on_monday_is_today() {
        let now = local(2024, 5, 6, 0, 30);
        assert_eq!(
            week_start(now),
            Utc.with_ymd_and_hms(2024, 5, 5, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_month_start() {
        let now = local(2024, 5, 10, 12, 0);
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2024, 4, 30, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_duration_until_next_later_today() {
        let now = local(2024, 5, 10, 8, 0);
        let at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(
            duration_until_next(now, at),
            std::time::Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_duration_until_next_already_passed_rolls_over() {
        let now = local(2024, 5, 10, 10, 0);
        let at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(
            duration_until_next(now, at),
            std::time::Duration::from_secs(23 * 3600)
        );
    }

    #[test]
    fn test_duration_until_next_exact_time_waits_a_day() {
        let now = local(2024, 5, 10, 9, 0);
        let at = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(
            duration_until_next(now, at),
            std::time::Duration::from_secs(24 * 3600)
        );
    }

    #[test]
    fn test_parse_user_date() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(
            parse_user_date("2024-03-01", today),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(
            parse_user_date("5/8", today),
            NaiveDate::from_ymd_opt(2024, 5, 8)
        );
        assert_eq!(
            parse_user_date(" 12/24 ", today),
            NaiveDate::from_ymd_opt(2024, 12, 24)
        );
        assert_eq!(parse_user_date("2/30", today), None);
        assert_eq!(parse_user_date("きょう", today), None);
    }
}

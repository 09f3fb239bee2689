use chrono::{Datelike, Duration, NaiveDate, Utc};

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn days_before(day: NaiveDate, days: i64) -> NaiveDate {
    day - Duration::days(days)
}

/// First and last calendar day of the month containing `day`.
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(day);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(d(2024, 2, 10)), (d(2024, 2, 1), d(2024, 2, 29)));
        assert_eq!(month_bounds(d(2023, 12, 31)), (d(2023, 12, 1), d(2023, 12, 31)));
        assert_eq!(month_bounds(d(2024, 4, 1)), (d(2024, 4, 1), d(2024, 4, 30)));
    }

    #[test]
    fn test_days_before() {
        assert_eq!(days_before(d(2024, 3, 1), 1), d(2024, 2, 29));
    }
}

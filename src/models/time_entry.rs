use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::{coerce, Schema};
use crate::error::{AppError, AppResult};

pub const DEFAULT_TIME_CATEGORY: &str = "other";

/// A single entry covers at most one day.
pub const MAX_DURATION_MINUTES: i64 = 1440;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TimeEntry {
    pub id: i64,
    pub user_id: i64,
    pub activity_name: String,
    pub category: String,
    pub duration_minutes: i64,
    pub entry_date: NaiveDate,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeEntryRequest {
    pub activity_name: String,
    pub category: Option<String>,
    #[serde(deserialize_with = "coerce::int")]
    pub duration_minutes: i64,
    #[serde(deserialize_with = "coerce::date")]
    pub entry_date: NaiveDate,
    pub notes: Option<String>,
}

impl Schema for CreateTimeEntryRequest {
    const REQUIRED: &'static [&'static str] = &["activity_name", "duration_minutes", "entry_date"];
}

#[derive(Debug, Deserialize)]
pub struct UpdateTimeEntryRequest {
    pub activity_name: Option<String>,
    pub category: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_int")]
    pub duration_minutes: Option<i64>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub entry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Schema for UpdateTimeEntryRequest {
    const REQUIRED: &'static [&'static str] = &[];
}

pub fn check_duration(minutes: i64) -> AppResult<i64> {
    if minutes < 0 {
        return Err(AppError::BadRequest("Duration must not be negative".into()));
    }
    if minutes > MAX_DURATION_MINUTES {
        return Err(AppError::BadRequest(format!(
            "Duration must not exceed {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(minutes)
}

#[derive(Debug, Default, Deserialize)]
pub struct TimeEntryQuery {
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TimeEntryList {
    pub entries: Vec<TimeEntry>,
    pub total_minutes: i64,
    pub by_category: BTreeMap<String, i64>,
}

impl TimeEntryList {
    pub fn new(entries: Vec<TimeEntry>) -> Self {
        let mut by_category = BTreeMap::new();
        let mut total_minutes: i64 = 0;
        for entry in &entries {
            total_minutes = total_minutes.saturating_add(entry.duration_minutes);
            let minutes = by_category.entry(entry.category.clone()).or_insert(0i64);
            *minutes = minutes.saturating_add(entry.duration_minutes);
        }
        Self {
            entries,
            total_minutes,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(category: &str, minutes: i64) -> TimeEntry {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        TimeEntry {
            id: 1,
            user_id: 1,
            activity_name: "Deep work".into(),
            category: category.into(),
            duration_minutes: minutes,
            entry_date: day,
            notes: String::new(),
            created_at: day.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_totals_by_category() {
        let list = TimeEntryList::new(vec![entry("work", 90), entry("other", 15), entry("work", 30)]);
        assert_eq!(list.total_minutes, 135);
        assert_eq!(list.by_category.get("work"), Some(&120));
        assert_eq!(list.by_category.get("other"), Some(&15));
    }

    #[test]
    fn test_empty_list() {
        let list = TimeEntryList::new(Vec::new());
        assert_eq!(list.total_minutes, 0);
        assert!(list.by_category.is_empty());
    }

    #[test]
    fn test_duration_bounds() {
        assert!(check_duration(-1).is_err());
        assert_eq!(check_duration(0).unwrap(), 0);
        assert_eq!(check_duration(MAX_DURATION_MINUTES).unwrap(), MAX_DURATION_MINUTES);
        let err = check_duration(MAX_DURATION_MINUTES + 1).unwrap_err();
        assert_eq!(err.to_string(), "Duration must not exceed 1440 minutes");
        assert!(check_duration(i64::MAX).is_err());
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let list = TimeEntryList::new(vec![entry("work", i64::MAX), entry("work", i64::MAX)]);
        assert_eq!(list.total_minutes, i64::MAX);
        assert_eq!(list.by_category.get("work"), Some(&i64::MAX));
    }
}

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HabitLog {
    pub id: i64,
    pub habit_id: i64,
    pub user_id: i64,
    pub log_date: NaiveDate,
    pub status: LogStatus,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Completed,
    Skipped,
    Failed,
}

impl FromStr for LogStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

/// Log row joined with the title and look of its habit.
#[derive(Debug, Serialize, FromRow)]
pub struct HabitLogWithHabit {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub log: HabitLog,
    pub habit_title: String,
    pub icon: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_closed() {
        assert_eq!("skipped".parse::<LogStatus>(), Ok(LogStatus::Skipped));
        assert!("done".parse::<LogStatus>().is_err());
        assert!("Completed".parse::<LogStatus>().is_err());
    }
}

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::{coerce, Schema};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Mood {
    pub id: i64,
    pub user_id: i64,
    pub mood_date: NaiveDate,
    pub mood_level: i64,
    pub mood_emoji: String,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct SaveMoodRequest {
    #[serde(deserialize_with = "coerce::int")]
    pub mood_level: i64,
    pub mood_emoji: String,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub mood_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Schema for SaveMoodRequest {
    const REQUIRED: &'static [&'static str] = &["mood_level", "mood_emoji"];
}

impl SaveMoodRequest {
    pub fn level(&self) -> AppResult<i64> {
        if (1..=5).contains(&self.mood_level) {
            Ok(self.mood_level)
        } else {
            Err(AppError::BadRequest("Mood level must be between 1 and 5".into()))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodQuery {
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub end_date: Option<NaiveDate>,
}

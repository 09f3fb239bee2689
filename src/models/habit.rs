use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

use crate::api::{coerce, Schema};
use crate::models::habit_log::LogStatus;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub frequency: HabitFrequency,
    pub is_active: bool,
    pub target_days: Option<Json<Value>>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl Default for HabitFrequency {
    fn default() -> Self {
        Self::Daily
    }
}

/// A habit as listed for one day: its category and that day's log status.
#[derive(Debug, Serialize, FromRow)]
pub struct HabitWithStatus {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub habit: Habit,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub today_status: Option<LogStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub category_id: Option<i64>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub frequency: Option<HabitFrequency>,
    pub target_days: Option<Value>,
}

impl Schema for CreateHabitRequest {
    const REQUIRED: &'static [&'static str] = &["title"];
}

/// Omitted fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateHabitRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub category_id: Option<i64>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub frequency: Option<HabitFrequency>,
    #[serde(default, deserialize_with = "coerce::opt_flag")]
    pub is_active: Option<bool>,
    pub target_days: Option<Value>,
}

impl Schema for UpdateHabitRequest {
    const REQUIRED: &'static [&'static str] = &[];
}

#[derive(Debug, Deserialize)]
pub struct LogHabitRequest {
    #[serde(deserialize_with = "coerce::int")]
    pub habit_id: i64,
    pub status: String,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub log_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Schema for LogHabitRequest {
    const REQUIRED: &'static [&'static str] = &["habit_id", "status"];
}

/// `GET /api/habits` parameters, shared by the list and `action=logs` views.
#[derive(Debug, Default, Deserialize)]
pub struct HabitQuery {
    pub action: Option<String>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub habit_id: Option<i64>,
}

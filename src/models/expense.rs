use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::{coerce, Schema};
use crate::error::{AppError, AppResult};

/// Upper bound per expense, keeping every stored amount and list total finite.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub notes: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ExpenseWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub expense: Expense,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
}

/// Body of both create and update; update takes its id separately.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    pub title: String,
    #[serde(deserialize_with = "coerce::float")]
    pub amount: f64,
    #[serde(deserialize_with = "coerce::date")]
    pub expense_date: NaiveDate,
    #[serde(default, deserialize_with = "coerce::opt_id")]
    pub category_id: Option<i64>,
    pub notes: Option<String>,
}

impl Schema for ExpenseRequest {
    const REQUIRED: &'static [&'static str] = &["title", "amount", "expense_date"];
}

impl ExpenseRequest {
    /// Amount rounded to cents; negative amounts and amounts above
    /// [`MAX_AMOUNT`] are rejected.
    pub fn amount(&self) -> AppResult<f64> {
        if self.amount < 0.0 {
            return Err(AppError::BadRequest("Amount must not be negative".into()));
        }
        let rounded = round_cents(self.amount);
        if !rounded.is_finite() || rounded > MAX_AMOUNT {
            return Err(AppError::BadRequest("Amount is too large".into()));
        }
        Ok(rounded)
    }
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseQuery {
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::opt_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct ExpenseList {
    pub expenses: Vec<ExpenseWithCategory>,
    pub total: f64,
    pub period: Period,
}

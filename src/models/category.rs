use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::Schema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Habit,
    Expense,
}

impl Default for CategoryType {
    fn default() -> Self {
        Self::Habit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub color: String,
    pub icon: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub created_at: NaiveDateTime,
}

/// Seeded for every new account: (name, color, icon, type).
pub const DEFAULT_CATEGORIES: [(&str, &str, &str, CategoryType); 9] = [
    ("Health", "#4CAF50", "health", CategoryType::Habit),
    ("Study", "#2196F3", "book", CategoryType::Habit),
    ("Work", "#FF9800", "work", CategoryType::Habit),
    ("Home", "#9C27B0", "home", CategoryType::Habit),
    ("Other", "#607D8B", "other", CategoryType::Habit),
    ("Food", "#FF5722", "food", CategoryType::Expense),
    ("Transport", "#00BCD4", "transport", CategoryType::Expense),
    ("Shopping", "#E91E63", "shopping", CategoryType::Expense),
    ("Entertainment", "#9C27B0", "entertainment", CategoryType::Expense),
];

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryType>,
}

impl Schema for CreateCategoryRequest {
    const REQUIRED: &'static [&'static str] = &["name"];
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Schema for UpdateCategoryRequest {
    const REQUIRED: &'static [&'static str] = &["name"];
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    #[default]
    All,
    Habit,
    Expense,
}

impl CategoryFilter {
    pub fn kind(self) -> Option<CategoryType> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Habit => Some(CategoryType::Habit),
            CategoryFilter::Expense => Some(CategoryType::Expense),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type", default)]
    pub kind: CategoryFilter,
}

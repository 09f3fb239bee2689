//! # Life Tracker: Request/Response DTOs
//!
//! Auth, password reset, statistics and export contract types. Resource
//! request bodies live next to their rows in `models`.
//!
//! Conventions:
//! - `*Request`  → deserialized from a client JSON body through [`Schema`]
//! - everything else → serialized into the `data` field of the envelope
//! - validation rules are `validator` derive attributes

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::Schema;
use crate::models::habit::HabitFrequency;
use crate::models::task::{TaskPriority, TaskStatus};

// ============================================================================
// Common
// ============================================================================

/// Identifier of a freshly inserted row.
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth?action=register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub full_name: String,
}

impl Schema for RegisterRequest {
    const REQUIRED: &'static [&'static str] = &["username", "email", "password", "full_name"];
    const RAW: &'static [&'static str] = &["password"];
}

/// POST /api/auth?action=login. `username` may also be an email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl Schema for LoginRequest {
    const REQUIRED: &'static [&'static str] = &["username", "password"];
    const RAW: &'static [&'static str] = &["password"];
}

/// Registration response; the new account has no avatar yet.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

// ============================================================================
// Password reset
// ============================================================================

/// POST /api/auth?action=forgot_password
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl Schema for ForgotPasswordRequest {
    const REQUIRED: &'static [&'static str] = &["email"];
}

/// POST /api/auth?action=verify_reset_code
#[derive(Debug, Deserialize)]
pub struct VerifyResetCodeRequest {
    pub email: String,
    pub code: String,
}

impl Schema for VerifyResetCodeRequest {
    const REQUIRED: &'static [&'static str] = &["email", "code"];
}

/// POST /api/auth?action=reset_password
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,
}

impl Schema for ResetPasswordRequest {
    const REQUIRED: &'static [&'static str] = &["email", "code", "new_password"];
    const RAW: &'static [&'static str] = &["new_password"];
}

#[derive(Debug, Serialize)]
pub struct ResetCodeIssued {
    pub expires_in_minutes: i64,
    /// Only present when the deployment exposes codes (no mail transport).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetCodeVerified {
    pub email: String,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StatisticsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub summary: LogSummary,
    pub habit_progress: Vec<HabitProgress>,
    pub status_distribution: StatusDistribution,
    pub task_stats: TaskStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub success_rate: i64,
    pub completed: i64,
    pub skipped: i64,
    pub failed: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HabitProgress {
    pub id: i64,
    pub title: String,
    pub icon: String,
    pub color: String,
    pub total_logs: i64,
    pub completed: i64,
    pub completion_rate: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusShare {
    pub count: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub completed: StatusShare,
    pub skipped: StatusShare,
    pub failed: StatusShare,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub cancelled: i64,
}

// ============================================================================
// Export
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Columns of the habits section of the CSV export.
#[derive(Debug, sqlx::FromRow)]
pub struct HabitCsvRow {
    pub title: String,
    pub description: String,
    pub frequency: HabitFrequency,
    pub created_at: NaiveDateTime,
}

/// Columns of the tasks section of the CSV export.
#[derive(Debug, sqlx::FromRow)]
pub struct TaskCsvRow {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::api::Params;
use crate::auth::middleware::AuthUser;
use crate::dates::today;
use crate::dto::{ExportQuery, HabitCsvRow, TaskCsvRow};
use crate::error::{AppError, AppResult};
use crate::models::{
    category::Category, expense::Expense, habit::Habit, habit_log::HabitLog, mood::Mood,
    task::Task, time_entry::TimeEntry, user::ExportedUser,
};
use crate::AppState;

const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct Backup {
    user: ExportedUser,
    categories: Vec<Category>,
    habits: Vec<Habit>,
    habit_logs: Vec<HabitLog>,
    tasks: Vec<Task>,
    expenses: Vec<Expense>,
    moods: Vec<Mood>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_entries: Option<Vec<TimeEntry>>,
    export_date: String,
}

/// `GET /api/export?format=json|csv`. Anything but `csv` yields the JSON backup.
pub async fn export(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ExportQuery>,
) -> AppResult<Response> {
    let exported_at = Utc::now().format(STAMP_FORMAT).to_string();
    let file_date = today().format("%Y-%m-%d");

    if query.format.as_deref().map(str::trim) == Some("csv") {
        let body = csv_export(&state, user, &exported_at).await?;
        tracing::info!(user_id = user.id, format = "csv", "Data exported");
        return Ok(attachment(
            "text/csv; charset=utf-8",
            format!("tracker_export_{file_date}.csv"),
            body,
        ));
    }

    let backup = json_backup(&state, user, exported_at).await?;
    let body = serde_json::to_string_pretty(&backup).map_err(anyhow::Error::from)?;
    tracing::info!(user_id = user.id, format = "json", "Data exported");
    Ok(attachment(
        "application/json",
        format!("tracker_backup_{file_date}.json"),
        body,
    ))
}

fn attachment(content_type: &str, filename: String, body: String) -> Response {
    (
        [
            (CONTENT_TYPE, content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn json_backup(state: &AppState, user: AuthUser, export_date: String) -> AppResult<Backup> {
    let db = &state.db;

    let account = sqlx::query_as::<_, ExportedUser>(
        "SELECT id, username, email, full_name, created_at FROM users WHERE id = ?",
    )
    .bind(user.id)
    .fetch_optional(db)
    .await?
    .ok_or_else(AppError::unauthorized)?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE user_id = ? ORDER BY id",
    )
    .bind(user.id)
    .fetch_all(db)
    .await?;

    let habits = sqlx::query_as::<_, Habit>("SELECT * FROM habits WHERE user_id = ? ORDER BY id")
        .bind(user.id)
        .fetch_all(db)
        .await?;

    let habit_logs = sqlx::query_as::<_, HabitLog>(
        "SELECT * FROM habit_logs WHERE user_id = ? ORDER BY log_date, id",
    )
    .bind(user.id)
    .fetch_all(db)
    .await?;

    let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE user_id = ? ORDER BY id")
        .bind(user.id)
        .fetch_all(db)
        .await?;

    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses WHERE user_id = ? ORDER BY expense_date, id",
    )
    .bind(user.id)
    .fetch_all(db)
    .await?;

    let moods = sqlx::query_as::<_, Mood>(
        "SELECT * FROM moods WHERE user_id = ? ORDER BY mood_date",
    )
    .bind(user.id)
    .fetch_all(db)
    .await?;

    let time_entries = if state.features.time_tracking {
        Some(
            sqlx::query_as::<_, TimeEntry>(
                "SELECT * FROM time_entries WHERE user_id = ? ORDER BY entry_date, id",
            )
            .bind(user.id)
            .fetch_all(db)
            .await?,
        )
    } else {
        None
    };

    Ok(Backup {
        user: account,
        categories,
        habits,
        habit_logs,
        tasks,
        expenses,
        moods,
        time_entries,
        export_date,
    })
}

async fn csv_export(state: &AppState, user: AuthUser, exported_at: &str) -> AppResult<String> {
    let habits = sqlx::query_as::<_, HabitCsvRow>(
        "SELECT title, description, frequency, created_at FROM habits WHERE user_id = ? ORDER BY id",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let tasks = sqlx::query_as::<_, TaskCsvRow>(
        r#"
        SELECT title, description, status, priority, due_date, created_at
        FROM tasks WHERE user_id = ? ORDER BY id
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    Ok(render_csv(&habits, &tasks, exported_at))
}

/// Quotes a CSV field, doubling embedded quotes.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Serialized form of a unit enum, as it appears on the wire.
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(name)) => name,
        _ => String::new(),
    }
}

fn render_csv(habits: &[HabitCsvRow], tasks: &[TaskCsvRow], exported_at: &str) -> String {
    let mut lines = vec![
        format!("Export Date: {exported_at}"),
        String::new(),
        "=== HABITS ===".to_string(),
        "Title,Description,Frequency,Created".to_string(),
    ];

    for habit in habits {
        lines.push(
            [
                quote(&habit.title),
                quote(&habit.description),
                quote(&wire_name(&habit.frequency)),
                quote(&habit.created_at.format(STAMP_FORMAT).to_string()),
            ]
            .join(","),
        );
    }

    lines.push(String::new());
    lines.push("=== TASKS ===".to_string());
    lines.push("Title,Description,Status,Priority,Due Date,Created".to_string());

    for task in tasks {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        lines.push(
            [
                quote(&task.title),
                quote(&task.description),
                quote(&wire_name(&task.status)),
                quote(&wire_name(&task.priority)),
                quote(&due),
                quote(&task.created_at.format(STAMP_FORMAT).to_string()),
            ]
            .join(","),
        );
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{Map, Value};
use sqlx::{types::Json, QueryBuilder, Sqlite};

use crate::api::{
    parse, resolve_action, target_id, ActionQuery, ApiResponse, HabitAction, JsonBody,
    MaybeJsonBody, Params,
};
use crate::auth::middleware::AuthUser;
use crate::dates::{days_before, today};
use crate::dto::Created;
use crate::error::{AppError, AppResult};
use crate::models::habit::{
    CreateHabitRequest, HabitQuery, HabitWithStatus, LogHabitRequest, UpdateHabitRequest,
};
use crate::models::habit_log::{HabitLog, HabitLogWithHabit, LogStatus};
use crate::AppState;

const LIST_LIMIT: i64 = 100;
const DEFAULT_LOG_WINDOW_DAYS: i64 = 30;

/// `GET /api/habits`: active habits with the status logged for `date`, or the
/// log history when `action=logs`.
pub async fn list_habits(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<HabitQuery>,
) -> AppResult<Response> {
    if query.action.as_deref().map(str::trim) == Some("logs") {
        return list_logs(&state, user, &query)
            .await
            .map(IntoResponse::into_response);
    }

    let date = query.date.unwrap_or_else(today);
    let habits = sqlx::query_as::<_, HabitWithStatus>(
        r#"
        SELECT h.*,
               c.name AS category_name,
               c.color AS category_color,
               hl.status AS today_status
        FROM habits h
        LEFT JOIN categories c ON h.category_id = c.id AND c.user_id = h.user_id
        LEFT JOIN habit_logs hl ON h.id = hl.habit_id AND hl.log_date = ? AND hl.user_id = ?
        WHERE h.user_id = ? AND h.is_active = 1
        ORDER BY h.created_at DESC, h.id DESC
        LIMIT ?
        "#,
    )
    .bind(date)
    .bind(user.id)
    .bind(user.id)
    .bind(LIST_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok("Habits retrieved successfully", habits).into_response())
}

async fn list_logs(
    state: &AppState,
    user: AuthUser,
    query: &HabitQuery,
) -> AppResult<ApiResponse<Vec<HabitLogWithHabit>>> {
    let end = query.end_date.unwrap_or_else(today);
    let start = query
        .start_date
        .unwrap_or_else(|| days_before(today(), DEFAULT_LOG_WINDOW_DAYS));

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT hl.*, h.title AS habit_title, h.icon, h.color \
         FROM habit_logs hl JOIN habits h ON hl.habit_id = h.id \
         WHERE hl.user_id = ",
    );
    qb.push_bind(user.id);
    qb.push(" AND hl.log_date BETWEEN ")
        .push_bind(start)
        .push(" AND ")
        .push_bind(end);
    if let Some(habit_id) = query.habit_id {
        qb.push(" AND hl.habit_id = ").push_bind(habit_id);
    }
    qb.push(" ORDER BY hl.log_date DESC, hl.id DESC");

    let logs = qb
        .build_query_as::<HabitLogWithHabit>()
        .fetch_all(&state.db)
        .await?;

    Ok(ApiResponse::ok("Habit logs retrieved successfully", logs))
}

pub async fn post_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    body: MaybeJsonBody,
) -> AppResult<Response> {
    let action: HabitAction = resolve_action(query.action.as_deref(), body.0.as_ref())?;

    match action {
        HabitAction::Create => create(&state, user, body.require()?)
            .await
            .map(IntoResponse::into_response),
        HabitAction::Update => {
            let id = target_id(query.id(), body.0.as_ref(), "Habit")?;
            update(&state, user, id, body.require()?)
                .await
                .map(IntoResponse::into_response)
        }
        HabitAction::Delete => {
            let id = target_id(query.id(), body.0.as_ref(), "Habit")?;
            remove(&state, user, id).await.map(IntoResponse::into_response)
        }
        HabitAction::Log => log(&state, user, body.require()?)
            .await
            .map(IntoResponse::into_response),
    }
}

pub async fn put_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), Some(&body), "Habit")?;
    update(&state, user, id, body).await
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    MaybeJsonBody(body): MaybeJsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), body.as_ref(), "Habit")?;
    remove(&state, user, id).await
}

async fn create(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<Created>> {
    let req: CreateHabitRequest = parse(body)?;

    let id = sqlx::query(
        r#"
        INSERT INTO habits (user_id, category_id, title, description, icon, color, frequency, target_days)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(req.category_id)
    .bind(&req.title)
    .bind(req.description.as_deref().unwrap_or(""))
    .bind(req.icon.as_deref().unwrap_or("check"))
    .bind(req.color.as_deref().unwrap_or("#FF4081"))
    .bind(req.frequency.unwrap_or_default())
    .bind(req.target_days.map(Json))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    tracing::debug!(user_id = user.id, habit_id = id, "Habit created");
    Ok(ApiResponse::ok("Habit created successfully", Created { id }))
}

async fn update(
    state: &AppState,
    user: AuthUser,
    id: i64,
    body: Map<String, Value>,
) -> AppResult<ApiResponse> {
    let req: UpdateHabitRequest = parse(body)?;

    let updated = sqlx::query(
        r#"
        UPDATE habits SET
            title = COALESCE(?, title),
            description = COALESCE(?, description),
            category_id = COALESCE(?, category_id),
            icon = COALESCE(?, icon),
            color = COALESCE(?, color),
            frequency = COALESCE(?, frequency),
            is_active = COALESCE(?, is_active),
            target_days = COALESCE(?, target_days)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.category_id)
    .bind(&req.icon)
    .bind(&req.color)
    .bind(req.frequency)
    .bind(req.is_active)
    .bind(req.target_days.map(Json))
    .bind(id)
    .bind(user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Habit not found".into()));
    }
    Ok(ApiResponse::message("Habit updated successfully"))
}

async fn remove(state: &AppState, user: AuthUser, id: i64) -> AppResult<ApiResponse> {
    let deleted = sqlx::query("DELETE FROM habits WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Habit not found".into()));
    }
    Ok(ApiResponse::message("Habit deleted successfully"))
}

/// Records the status of a habit for one day; a second log for the same day
/// replaces the first.
async fn log(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<HabitLog>> {
    let req: LogHabitRequest = parse(body)?;

    let owned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM habits WHERE id = ? AND user_id = ?",
    )
    .bind(req.habit_id)
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;
    if owned == 0 {
        return Err(AppError::NotFound("Habit not found".into()));
    }

    let status: LogStatus = req
        .status
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid status".into()))?;
    let log_date = req.log_date.unwrap_or_else(today);

    let log = sqlx::query_as::<_, HabitLog>(
        r#"
        INSERT INTO habit_logs (habit_id, user_id, log_date, status, notes)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(habit_id, log_date) DO UPDATE SET
            status = excluded.status,
            notes = excluded.notes
        RETURNING *
        "#,
    )
    .bind(req.habit_id)
    .bind(user.id)
    .bind(log_date)
    .bind(status)
    .bind(req.notes.as_deref().unwrap_or(""))
    .fetch_one(&state.db)
    .await?;

    Ok(ApiResponse::ok("Habit logged successfully", log))
}

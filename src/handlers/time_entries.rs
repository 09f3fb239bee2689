use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{Map, Value};

use crate::api::{
    parse, resolve_action, target_id, ActionQuery, ApiResponse, JsonBody, MaybeJsonBody, Params,
    WriteAction,
};
use crate::auth::middleware::AuthUser;
use crate::dates::{month_bounds, today};
use crate::dto::Created;
use crate::error::{AppError, AppResult};
use crate::models::time_entry::{
    check_duration, CreateTimeEntryRequest, TimeEntry, TimeEntryList, TimeEntryQuery,
    UpdateTimeEntryRequest, DEFAULT_TIME_CATEGORY,
};
use crate::AppState;

pub async fn list_time_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<TimeEntryQuery>,
) -> AppResult<ApiResponse<TimeEntryList>> {
    state.features.require_time_tracking()?;

    let (month_start, month_end) = month_bounds(today());
    let entries = sqlx::query_as::<_, TimeEntry>(
        r#"
        SELECT * FROM time_entries
        WHERE user_id = ? AND entry_date BETWEEN ? AND ?
        ORDER BY entry_date DESC, created_at DESC, id DESC
        "#,
    )
    .bind(user.id)
    .bind(query.start_date.unwrap_or(month_start))
    .bind(query.end_date.unwrap_or(month_end))
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok("Time entries retrieved", TimeEntryList::new(entries)))
}

pub async fn post_time_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    body: MaybeJsonBody,
) -> AppResult<Response> {
    state.features.require_time_tracking()?;
    let action: WriteAction = resolve_action(query.action.as_deref(), body.0.as_ref())?;

    match action {
        WriteAction::Create => create(&state, user, body.require()?)
            .await
            .map(IntoResponse::into_response),
        WriteAction::Update => {
            let id = target_id(query.id(), body.0.as_ref(), "Time entry")?;
            update(&state, user, id, body.require()?)
                .await
                .map(IntoResponse::into_response)
        }
        WriteAction::Delete => {
            let id = target_id(query.id(), body.0.as_ref(), "Time entry")?;
            remove(&state, user, id).await.map(IntoResponse::into_response)
        }
    }
}

pub async fn put_time_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse> {
    state.features.require_time_tracking()?;
    let id = target_id(query.id(), Some(&body), "Time entry")?;
    update(&state, user, id, body).await
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    MaybeJsonBody(body): MaybeJsonBody,
) -> AppResult<ApiResponse> {
    state.features.require_time_tracking()?;
    let id = target_id(query.id(), body.as_ref(), "Time entry")?;
    remove(&state, user, id).await
}

async fn create(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<Created>> {
    let req: CreateTimeEntryRequest = parse(body)?;
    let minutes = check_duration(req.duration_minutes)?;

    let category = req
        .category
        .as_deref()
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_TIME_CATEGORY);

    let id = sqlx::query(
        r#"
        INSERT INTO time_entries (user_id, activity_name, category, duration_minutes, entry_date, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(&req.activity_name)
    .bind(category)
    .bind(minutes)
    .bind(req.entry_date)
    .bind(req.notes.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    Ok(ApiResponse::ok("Time entry added successfully", Created { id }))
}

async fn update(
    state: &AppState,
    user: AuthUser,
    id: i64,
    body: Map<String, Value>,
) -> AppResult<ApiResponse> {
    let req: UpdateTimeEntryRequest = parse(body)?;
    let minutes = req.duration_minutes.map(check_duration).transpose()?;
    let category = req.category.as_deref().filter(|c| !c.is_empty());

    let updated = sqlx::query(
        r#"
        UPDATE time_entries SET
            activity_name = COALESCE(?, activity_name),
            category = COALESCE(?, category),
            duration_minutes = COALESCE(?, duration_minutes),
            entry_date = COALESCE(?, entry_date),
            notes = COALESCE(?, notes)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&req.activity_name)
    .bind(category)
    .bind(minutes)
    .bind(req.entry_date)
    .bind(&req.notes)
    .bind(id)
    .bind(user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Time entry not found".into()));
    }
    Ok(ApiResponse::message("Time entry updated successfully"))
}

async fn remove(state: &AppState, user: AuthUser, id: i64) -> AppResult<ApiResponse> {
    let deleted = sqlx::query("DELETE FROM time_entries WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Time entry not found".into()));
    }
    Ok(ApiResponse::message("Time entry deleted successfully"))
}

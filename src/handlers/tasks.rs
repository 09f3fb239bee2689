use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Extension,
};
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite};

use crate::api::{
    parse, resolve_action, target_id, ActionQuery, ApiResponse, JsonBody, MaybeJsonBody, Params,
    WriteAction,
};
use crate::auth::middleware::AuthUser;
use crate::dates::today;
use crate::dto::Created;
use crate::error::{AppError, AppResult};
use crate::models::task::{
    CreateTaskRequest, Task, TaskQuery, TaskStatus, TaskWithCategory, UpdateTaskRequest,
};
use crate::AppState;

/// Status filter of the task list; `None` lists every status.
fn status_filter(raw: Option<&str>) -> AppResult<Option<TaskStatus>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(other) => other
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest("Invalid status".into())),
    }
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<TaskQuery>,
) -> AppResult<ApiResponse<Vec<TaskWithCategory>>> {
    let status = status_filter(query.status.as_deref())?;

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT t.*, c.name AS category_name, c.color AS category_color \
         FROM tasks t \
         LEFT JOIN categories c ON t.category_id = c.id AND c.user_id = t.user_id \
         WHERE t.user_id = ",
    );
    qb.push_bind(user.id);

    if let Some(status) = status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if query.today.as_deref().map(str::trim) == Some("1") {
        let day = query.date.unwrap_or_else(today);
        qb.push(" AND (t.due_date = ")
            .push_bind(day)
            .push(" OR t.task_type = 'periodic')");
    }

    qb.push(
        " ORDER BY CASE t.priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END DESC, \
         t.due_date, t.due_time, t.id",
    );

    let tasks = qb
        .build_query_as::<TaskWithCategory>()
        .fetch_all(&state.db)
        .await?;

    Ok(ApiResponse::ok("Tasks retrieved successfully", tasks))
}

pub async fn post_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    body: MaybeJsonBody,
) -> AppResult<Response> {
    let action: WriteAction = resolve_action(query.action.as_deref(), body.0.as_ref())?;

    match action {
        WriteAction::Create => create(&state, user, body.require()?)
            .await
            .map(IntoResponse::into_response),
        WriteAction::Update => {
            let id = target_id(query.id(), body.0.as_ref(), "Task")?;
            update(&state, user, id, body.require()?)
                .await
                .map(IntoResponse::into_response)
        }
        WriteAction::Delete => {
            let id = target_id(query.id(), body.0.as_ref(), "Task")?;
            remove(&state, user, id).await.map(IntoResponse::into_response)
        }
    }
}

pub async fn put_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), Some(&body), "Task")?;
    update(&state, user, id, body).await
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    MaybeJsonBody(body): MaybeJsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), body.as_ref(), "Task")?;
    remove(&state, user, id).await
}

async fn create(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<Created>> {
    let req: CreateTaskRequest = parse(body)?;

    let id = sqlx::query(
        r#"
        INSERT INTO tasks (user_id, category_id, title, description, icon, color,
                           task_type, due_date, due_time, priority, recurrence_pattern)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(req.category_id)
    .bind(&req.title)
    .bind(req.description.as_deref().unwrap_or(""))
    .bind(req.icon.as_deref().unwrap_or("task"))
    .bind(req.color.as_deref().unwrap_or("#FF4081"))
    .bind(req.task_type.unwrap_or_default())
    .bind(req.due_date)
    .bind(req.due_time)
    .bind(req.priority.unwrap_or_default())
    .bind(req.recurrence_pattern.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    tracing::debug!(user_id = user.id, task_id = id, "Task created");
    Ok(ApiResponse::ok("Task created successfully", Created { id }))
}

async fn update(
    state: &AppState,
    user: AuthUser,
    id: i64,
    body: Map<String, Value>,
) -> AppResult<ApiResponse> {
    let req: UpdateTaskRequest = parse(body)?;

    let existing = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let task = req.merge_into(existing, Utc::now().naive_utc());

    sqlx::query(
        r#"
        UPDATE tasks SET
            category_id = ?,
            title = ?,
            description = ?,
            icon = ?,
            color = ?,
            task_type = ?,
            due_date = ?,
            due_time = ?,
            priority = ?,
            status = ?,
            recurrence_pattern = ?,
            completed_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(task.category_id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(&task.icon)
    .bind(&task.color)
    .bind(task.task_type)
    .bind(task.due_date)
    .bind(task.due_time)
    .bind(task.priority)
    .bind(task.status)
    .bind(&task.recurrence_pattern)
    .bind(task.completed_at)
    .bind(id)
    .bind(user.id)
    .execute(&state.db)
    .await?;

    Ok(ApiResponse::message("Task updated successfully"))
}

async fn remove(state: &AppState, user: AuthUser, id: i64) -> AppResult<ApiResponse> {
    let deleted = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }
    Ok(ApiResponse::message("Task deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_filter() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("all")).unwrap(), None);
        assert_eq!(status_filter(Some("")).unwrap(), None);
        assert_eq!(
            status_filter(Some("completed")).unwrap(),
            Some(TaskStatus::Completed)
        );
        assert_eq!(
            status_filter(Some("done")).unwrap_err().to_string(),
            "Invalid status"
        );
    }
}

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
use crate::dto::Created;
use crate::error::{AppError, AppResult};
use crate::models::category::{
    Category, CategoryQuery, CreateCategoryRequest, UpdateCategoryRequest,
};
use crate::AppState;

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<CategoryQuery>,
) -> AppResult<ApiResponse<Vec<Category>>> {
    let categories = match query.kind.kind() {
        Some(kind) => {
            sqlx::query_as::<_, Category>(
                "SELECT * FROM categories WHERE user_id = ? AND type = ? ORDER BY name, id",
            )
            .bind(user.id)
            .bind(kind)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Category>(
                "SELECT * FROM categories WHERE user_id = ? ORDER BY name, id",
            )
            .bind(user.id)
            .fetch_all(&state.db)
            .await?
        }
    };

    Ok(ApiResponse::ok("Categories retrieved successfully", categories))
}

pub async fn post_category(
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
            let id = target_id(query.id(), body.0.as_ref(), "Category")?;
            update(&state, user, id, body.require()?)
                .await
                .map(IntoResponse::into_response)
        }
        WriteAction::Delete => {
            let id = target_id(query.id(), body.0.as_ref(), "Category")?;
            remove(&state, user, id).await.map(IntoResponse::into_response)
        }
    }
}

pub async fn put_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), Some(&body), "Category")?;
    update(&state, user, id, body).await
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    MaybeJsonBody(body): MaybeJsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), body.as_ref(), "Category")?;
    remove(&state, user, id).await
}

async fn create(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<Created>> {
    let req: CreateCategoryRequest = parse(body)?;

    let id = sqlx::query(
        "INSERT INTO categories (user_id, name, color, icon, type) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&req.name)
    .bind(req.color.as_deref().unwrap_or("#FF4081"))
    .bind(req.icon.as_deref().unwrap_or("default"))
    .bind(req.kind.unwrap_or_default())
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    tracing::debug!(user_id = user.id, category_id = id, "Category created");
    Ok(ApiResponse::ok("Category created successfully", Created { id }))
}

async fn update(
    state: &AppState,
    user: AuthUser,
    id: i64,
    body: Map<String, Value>,
) -> AppResult<ApiResponse> {
    let req: UpdateCategoryRequest = parse(body)?;

    let updated = sqlx::query(
        r#"
        UPDATE categories SET
            name = ?,
            color = COALESCE(?, color),
            icon = COALESCE(?, icon)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(&req.name)
    .bind(&req.color)
    .bind(&req.icon)
    .bind(id)
    .bind(user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }
    Ok(ApiResponse::message("Category updated successfully"))
}

async fn remove(state: &AppState, user: AuthUser, id: i64) -> AppResult<ApiResponse> {
    let deleted = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Category not found".into()));
    }
    Ok(ApiResponse::message("Category deleted successfully"))
}

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
use crate::models::expense::{
    round_cents, ExpenseList, ExpenseQuery, ExpenseRequest, ExpenseWithCategory, Period,
};
use crate::AppState;

/// Expenses in `start_date..=end_date`, defaulting to the current month.
pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ExpenseQuery>,
) -> AppResult<ApiResponse<ExpenseList>> {
    let (month_start, month_end) = month_bounds(today());
    let start = query.start_date.unwrap_or(month_start);
    let end = query.end_date.unwrap_or(month_end);

    let expenses = sqlx::query_as::<_, ExpenseWithCategory>(
        r#"
        SELECT e.*, c.name AS category_name, c.color AS category_color
        FROM expenses e
        LEFT JOIN categories c ON e.category_id = c.id AND c.user_id = e.user_id
        WHERE e.user_id = ? AND e.expense_date BETWEEN ? AND ?
        ORDER BY e.expense_date DESC, e.created_at DESC, e.id DESC
        "#,
    )
    .bind(user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let total = round_cents(expenses.iter().map(|e| e.expense.amount).sum());
    let list = ExpenseList {
        expenses,
        total,
        period: Period { start, end },
    };
    Ok(ApiResponse::ok("Expenses retrieved", list))
}

pub async fn post_expense(
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
            let id = target_id(query.id(), body.0.as_ref(), "Expense")?;
            update(&state, user, id, body.require()?)
                .await
                .map(IntoResponse::into_response)
        }
        WriteAction::Delete => {
            let id = target_id(query.id(), body.0.as_ref(), "Expense")?;
            remove(&state, user, id).await.map(IntoResponse::into_response)
        }
    }
}

pub async fn put_expense(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), Some(&body), "Expense")?;
    update(&state, user, id, body).await
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Params(query): Params<ActionQuery>,
    MaybeJsonBody(body): MaybeJsonBody,
) -> AppResult<ApiResponse> {
    let id = target_id(query.id(), body.as_ref(), "Expense")?;
    remove(&state, user, id).await
}

async fn create(
    state: &AppState,
    user: AuthUser,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<Created>> {
    let req: ExpenseRequest = parse(body)?;
    let amount = req.amount()?;

    let id = sqlx::query(
        r#"
        INSERT INTO expenses (user_id, category_id, title, amount, expense_date, notes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(req.category_id)
    .bind(&req.title)
    .bind(amount)
    .bind(req.expense_date)
    .bind(req.notes.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await?
    .last_insert_rowid();

    tracing::debug!(user_id = user.id, expense_id = id, "Expense added");
    Ok(ApiResponse::ok("Expense added successfully", Created { id }))
}

async fn update(
    state: &AppState,
    user: AuthUser,
    id: i64,
    body: Map<String, Value>,
) -> AppResult<ApiResponse> {
    let req: ExpenseRequest = parse(body)?;
    let amount = req.amount()?;

    let updated = sqlx::query(
        r#"
        UPDATE expenses SET
            category_id = ?,
            title = ?,
            amount = ?,
            expense_date = ?,
            notes = COALESCE(?, notes)
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(req.category_id)
    .bind(&req.title)
    .bind(amount)
    .bind(req.expense_date)
    .bind(&req.notes)
    .bind(id)
    .bind(user.id)
    .execute(&state.db)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Expense not found".into()));
    }
    Ok(ApiResponse::message("Expense updated successfully"))
}

async fn remove(state: &AppState, user: AuthUser, id: i64) -> AppResult<ApiResponse> {
    let deleted = sqlx::query("DELETE FROM expenses WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("Expense not found".into()));
    }
    Ok(ApiResponse::message("Expense deleted successfully"))
}

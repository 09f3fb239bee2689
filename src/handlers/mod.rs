pub mod auth;
pub mod categories;
pub mod expenses;
pub mod export;
pub mod habits;
pub mod health;
pub mod moods;
pub mod password_reset;
pub mod statistics;
pub mod tasks;
pub mod time_entries;

use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

/// Fallback for verbs a resource route does not serve.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Answers any OPTIONS request with an empty 200 before routing.
pub async fn preflight(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}

/// True when `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map_or(false, |db_err| db_err.is_unique_violation())
}

/// Router fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".into())
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::session::{resolve_session, token_from_request};
use crate::error::AppError;
use crate::AppState;

/// Identity resolved from the session, handed to handlers via `Extension`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_request(&jar, req.headers(), &state.config.session_cookie_name)
        .ok_or_else(AppError::unauthorized)?;

    let user_id = resolve_session(&state.db, &token)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    req.extensions_mut().insert(AuthUser { id: user_id });
    Ok(next.run(req).await)
}

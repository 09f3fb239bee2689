use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sqlx::SqliteConnection;
use validator::Validate;

use crate::api::{parse, parse_action, ActionQuery, ApiResponse, AuthAction, MaybeJsonBody, Params};
use crate::auth::{
    password::{hash_password, verify_password},
    session::{self, clear_cookie, create_session, session_cookie, token_from_request},
};
use crate::dto::{LoginRequest, RegisterRequest, RegisteredUser};
use crate::error::{AppError, AppResult};
use crate::handlers::{is_unique_violation, password_reset};
use crate::models::{
    category::DEFAULT_CATEGORIES,
    user::{User, UserProfile},
};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const DUPLICATE_ACCOUNT: &str = "Username or email already exists";

/// `/api/auth?action=...`; the action comes from the query string only.
pub async fn auth(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Params(query): Params<ActionQuery>,
    body: MaybeJsonBody,
) -> AppResult<Response> {
    let action = parse_action::<AuthAction>(query.action.as_deref(), None)?
        .ok_or_else(|| AppError::BadRequest("Invalid action".into()))?;

    match action {
        AuthAction::Register => register(&state, jar, body).await,
        AuthAction::Login => login(&state, jar, body).await,
        AuthAction::Logout => logout(&state, jar, &headers).await,
        AuthAction::Verify => verify(&state, jar, &headers).await,
        AuthAction::DeleteAccount => delete_account(&state, jar, &headers).await,
        AuthAction::ForgotPassword => password_reset::forgot_password(&state, body.require()?)
            .await
            .map(IntoResponse::into_response),
        AuthAction::VerifyResetCode => password_reset::verify_reset_code(&state, body.require()?)
            .await
            .map(IntoResponse::into_response),
        AuthAction::ResetPassword => password_reset::reset_password(&state, body.require()?)
            .await
            .map(IntoResponse::into_response),
    }
}

async fn register(state: &AppState, jar: CookieJar, body: MaybeJsonBody) -> AppResult<Response> {
    let req: RegisterRequest = parse(body.require()?)?;
    req.validate()?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE username = ? OR email = ?",
    )
    .bind(&req.username)
    .bind(&req.email)
    .fetch_one(&state.db)
    .await?;

    if existing > 0 {
        return Err(AppError::Conflict(DUPLICATE_ACCOUNT.into()));
    }

    let password_hash = hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;
    let inserted = sqlx::query(
        "INSERT INTO users (username, email, password_hash, full_name) VALUES (?, ?, ?, ?)",
    )
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.full_name)
    .execute(&mut *tx)
    .await;

    // A concurrent registration can still win the race past the check above.
    let user_id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict(DUPLICATE_ACCOUNT.into()))
        }
        Err(e) => return Err(e.into()),
    };

    seed_default_categories(&mut *tx, user_id).await?;
    tx.commit().await?;

    let token = create_session(&state.db, user_id, state.config.session_ttl_secs).await?;
    tracing::info!(user_id, "User registered");

    let user = RegisteredUser {
        user_id,
        username: req.username,
        email: req.email,
        full_name: req.full_name,
    };
    let jar = jar.add(session_cookie(&state.config, token));
    Ok((jar, ApiResponse::ok("Registration successful", user)).into_response())
}

pub(crate) async fn seed_default_categories(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<(), sqlx::Error> {
    for (name, color, icon, kind) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (user_id, name, color, icon, type) VALUES (?, ?, ?, ?, ?)")
            .bind(user_id)
            .bind(name)
            .bind(color)
            .bind(icon)
            .bind(kind)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn login(state: &AppState, jar: CookieJar, body: MaybeJsonBody) -> AppResult<Response> {
    let req: LoginRequest = parse(body.require()?)?;

    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE username = ? OR email = ? ORDER BY id LIMIT 1",
    )
    .bind(&req.username)
    .bind(&req.username)
    .fetch_optional(&state.db)
    .await?;

    // Unknown user and wrong password must be indistinguishable.
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash)? => user,
        _ => {
            tracing::warn!("Failed login attempt");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS));
        }
    };

    let token = create_session(&state.db, user.id, state.config.session_ttl_secs).await?;
    tracing::info!(user_id = user.id, "User logged in");

    let jar = jar.add(session_cookie(&state.config, token));
    Ok((jar, ApiResponse::ok("Login successful", UserProfile::from(user))).into_response())
}

async fn logout(state: &AppState, jar: CookieJar, headers: &HeaderMap) -> AppResult<Response> {
    if let Some(token) = token_from_request(&jar, headers, &state.config.session_cookie_name) {
        session::destroy_session(&state.db, &token).await?;
    }

    let jar = clear_cookie(jar, &state.config);
    Ok((jar, ApiResponse::message("Logout successful")).into_response())
}

async fn verify(state: &AppState, jar: CookieJar, headers: &HeaderMap) -> AppResult<Response> {
    let token = token_from_request(&jar, headers, &state.config.session_cookie_name)
        .ok_or(AppError::Unauthorized("Not authenticated"))?;
    let user_id = session::resolve_session(&state.db, &token)
        .await?
        .ok_or(AppError::Unauthorized("Not authenticated"))?;

    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, username, email, full_name, avatar_url FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(&state.db)
    .await?;

    match profile {
        Some(profile) => Ok(ApiResponse::ok("Authenticated", profile).into_response()),
        None => {
            session::destroy_session(&state.db, &token).await?;
            let jar = clear_cookie(jar, &state.config);
            Ok((jar, ApiResponse::failure(StatusCode::UNAUTHORIZED, "User not found")).into_response())
        }
    }
}

async fn delete_account(state: &AppState, jar: CookieJar, headers: &HeaderMap) -> AppResult<Response> {
    let token = token_from_request(&jar, headers, &state.config.session_cookie_name)
        .ok_or(AppError::Unauthorized("Unauthorized"))?;
    let user_id = session::resolve_session(&state.db, &token)
        .await?
        .ok_or(AppError::Unauthorized("Unauthorized"))?;

    // Cascades to every owned row, sessions included.
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&state.db)
        .await?;

    tracing::info!(user_id, "Account deleted");

    let jar = clear_cookie(jar, &state.config);
    Ok((jar, ApiResponse::message("Account deleted successfully")).into_response())
}

use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value};
use validator::Validate;

use crate::api::{parse, ApiResponse};
use crate::auth::{password::hash_password, session::hash_token};
use crate::dto::{
    ForgotPasswordRequest, ResetCodeIssued, ResetCodeVerified, ResetPasswordRequest,
    VerifyResetCodeRequest,
};
use crate::error::{AppError, AppResult};
use crate::AppState;

const INVALID_OR_EXPIRED: &str = "Invalid or expired code";

#[derive(Debug, sqlx::FromRow)]
struct PendingReset {
    code_hash: String,
    expires_at: i64,
}

/// Why a presented code was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeCheck {
    Valid,
    Missing,
    Expired,
    Mismatch,
}

fn check_code(pending: Option<&PendingReset>, code: &str, now: i64) -> CodeCheck {
    match pending {
        None => CodeCheck::Missing,
        Some(p) if p.expires_at <= now => CodeCheck::Expired,
        Some(p) if p.code_hash != hash_token(code.trim()) => CodeCheck::Mismatch,
        Some(_) => CodeCheck::Valid,
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

async fn pending_reset(state: &AppState, email: &str) -> AppResult<Option<PendingReset>> {
    let pending = sqlx::query_as::<_, PendingReset>(
        "SELECT code_hash, expires_at FROM password_resets WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await?;
    Ok(pending)
}

/// Issues a fresh 6-digit code, replacing any earlier one for the address.
pub async fn forgot_password(
    state: &AppState,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<ResetCodeIssued>> {
    let req: ForgotPasswordRequest = parse(body)?;

    let known = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_one(&state.db)
        .await?;
    if known == 0 {
        return Err(AppError::NotFound("Email not found".into()));
    }

    let code = generate_code();
    let ttl = state.config.reset_code_ttl_secs;

    sqlx::query(
        r#"
        INSERT INTO password_resets (email, code_hash, expires_at)
        VALUES (?, ?, ?)
        ON CONFLICT(email) DO UPDATE SET
            code_hash = excluded.code_hash,
            expires_at = excluded.expires_at,
            created_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&req.email)
    .bind(hash_token(&code))
    .bind(Utc::now().timestamp() + ttl)
    .execute(&state.db)
    .await?;

    tracing::info!("Password reset code issued");

    let issued = ResetCodeIssued {
        expires_in_minutes: ttl / 60,
        code: state.config.expose_reset_code.then_some(code),
    };
    Ok(ApiResponse::ok("Reset code generated", issued))
}

pub async fn verify_reset_code(
    state: &AppState,
    body: Map<String, Value>,
) -> AppResult<ApiResponse<ResetCodeVerified>> {
    let req: VerifyResetCodeRequest = parse(body)?;
    let pending = pending_reset(state, &req.email).await?;

    match check_code(pending.as_ref(), &req.code, Utc::now().timestamp()) {
        CodeCheck::Valid => Ok(ApiResponse::ok(
            "Code verified",
            ResetCodeVerified { email: req.email },
        )),
        CodeCheck::Missing => Err(AppError::NotFound("No reset request found".into())),
        CodeCheck::Expired => Err(AppError::BadRequest(
            "Reset code expired. Request a new one.".into(),
        )),
        CodeCheck::Mismatch => Err(AppError::BadRequest("Invalid code".into())),
    }
}

/// Sets the new password, consumes the code and signs the user out everywhere.
pub async fn reset_password(state: &AppState, body: Map<String, Value>) -> AppResult<ApiResponse> {
    let req: ResetPasswordRequest = parse(body)?;
    req.validate()?;

    let pending = pending_reset(state, &req.email).await?;
    if check_code(pending.as_ref(), &req.code, Utc::now().timestamp()) != CodeCheck::Valid {
        return Err(AppError::BadRequest(INVALID_OR_EXPIRED.into()));
    }

    let password_hash = hash_password(&req.new_password)?;

    let mut tx = state.db.begin().await?;
    let user_id = sqlx::query_scalar::<_, i64>(
        "UPDATE users SET password_hash = ? WHERE email = ? RETURNING id",
    )
    .bind(&password_hash)
    .bind(&req.email)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::BadRequest(INVALID_OR_EXPIRED.into()))?;

    sqlx::query("DELETE FROM password_resets WHERE email = ?")
        .bind(&req.email)
        .execute(&mut *tx)
        .await?;
    let sessions = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;

    tracing::info!(user_id, sessions, "Password reset");
    Ok(ApiResponse::message("Password reset successfully"))
}

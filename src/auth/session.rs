use axum::http::HeaderMap;
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization, HeaderMapExt},
};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::AppResult;

/// 32 random bytes, hex encoded. Only its hash is ever stored.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of a raw token as lowercase hex.
pub fn hash_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Session cookie first, then `Authorization: Bearer`.
pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    jar.get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .typed_get::<Authorization<Bearer>>()
                .map(|auth| auth.token().to_string())
        })
}

pub async fn create_session(db: &SqlitePool, user_id: i64, ttl_secs: i64) -> AppResult<String> {
    let token = generate_token();
    let expires_at = Utc::now().timestamp() + ttl_secs;

    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(db)
        .await?;

    Ok(token)
}

/// User owning a live session, if any.
pub async fn resolve_session(db: &SqlitePool, token: &str) -> AppResult<Option<i64>> {
    let user_id = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM sessions WHERE token_hash = ? AND expires_at > ?",
    )
    .bind(hash_token(token))
    .bind(Utc::now().timestamp())
    .fetch_optional(db)
    .await?;

    Ok(user_id)
}

pub async fn destroy_session(db: &SqlitePool, token: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(db)
        .await?;
    Ok(())
}

pub async fn destroy_user_sessions(db: &SqlitePool, user_id: i64) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn purge_expired(db: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(Utc::now().timestamp())
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.session_cookie_secure)
        .max_age(time::Duration::seconds(config.session_ttl_secs))
        .build()
}

/// Expires the session cookie on the client.
pub fn clear_cookie(jar: CookieJar, config: &Config) -> CookieJar {
    jar.remove(Cookie::build((config.session_cookie_name.clone(), "")).path("/"))
}

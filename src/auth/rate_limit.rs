use axum::{
    extract::{ConnectInfo, Query, Request, State},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use crate::api::{parse_action, ActionQuery, AuthAction};
use crate::error::AppError;
use crate::AppState;

/// In-memory fixed-window counters (single-instance deployments).
#[derive(Clone, Default)]
pub struct RateLimitState {
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ok(remaining) while under the limit, Err(retry_after) once exhausted.
    pub async fn check_with_limits(
        &self,
        key: &str,
        max_requests: u32,
        window_secs: u64,
    ) -> Result<u32, Duration> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(window_secs);

        let entry = entries.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= max_requests {
            let retry_after = window.saturating_sub(now.duration_since(entry.window_start));
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(max_requests - entry.count)
    }

    /// Drops entries whose window ended long ago.
    pub async fn cleanup(&self, window_secs: u64) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        let now = Instant::now();
        let keep_for = Duration::from_secs(window_secs.saturating_mul(2));

        entries.retain(|_, entry| now.duration_since(entry.window_start) < keep_for);
        before - entries.len()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Limits the credential-facing auth actions per client IP and action.
pub async fn rate_limit_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let query = Query::<ActionQuery>::try_from_uri(req.uri())
        .map(|Query(q)| q)
        .unwrap_or_default();

    // Unknown actions are rejected by the handler itself.
    let action = match parse_action::<AuthAction>(query.action.as_deref(), None) {
        Ok(Some(action)) if action.is_rate_limited() => action,
        _ => return Ok(next.run(req).await),
    };

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("{}:{}", ip, action.as_str());

    let config = &state.config;
    match state
        .rate_limiter
        .check_with_limits(&key, config.auth_rate_limit_max, config.auth_rate_limit_window_secs)
        .await
    {
        Ok(remaining) => {
            tracing::debug!(ip = %ip, action = action.as_str(), remaining, "Rate limit check passed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %ip,
                action = action.as_str(),
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited)
        }
    }
}

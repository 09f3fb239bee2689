use chrono::Utc;
use sqlx::SqlitePool;

use crate::auth::{rate_limit::RateLimitState, session};

const CLEANUP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Purged {
    pub sessions: u64,
    pub reset_codes: u64,
    pub rate_limit_entries: usize,
}

/// Purges expired sessions, expired reset codes and stale rate-limit
/// counters every five minutes.
pub fn spawn_cleanup_worker(db: SqlitePool, limiter: RateLimitState, rate_window_secs: u64) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match purge_expired(&db, &limiter, rate_window_secs).await {
                Ok(purged) => {
                    if purged != Purged::default() {
                        tracing::info!(
                            sessions = purged.sessions,
                            reset_codes = purged.reset_codes,
                            rate_limit_entries = purged.rate_limit_entries,
                            "Cleanup: purged expired state"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Cleanup worker error");
                }
            }
        }
    });
}

pub async fn purge_expired(
    db: &SqlitePool,
    limiter: &RateLimitState,
    rate_window_secs: u64,
) -> Result<Purged, sqlx::Error> {
    let sessions = session::purge_expired(db).await?;

    let reset_codes = sqlx::query("DELETE FROM password_resets WHERE expires_at <= ?")
        .bind(Utc::now().timestamp())
        .execute(db)
        .await?
        .rows_affected();

    let rate_limit_entries = limiter.cleanup(rate_window_secs).await;

    Ok(Purged {
        sessions,
        reset_codes,
        rate_limit_entries,
    })
}

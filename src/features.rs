use sqlx::SqlitePool;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Optional capabilities, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub time_tracking: bool,
}

impl Features {
    /// A capability is on only when configured and its table is present.
    pub async fn detect(db: &SqlitePool, config: &Config) -> Result<Self, sqlx::Error> {
        let time_tracking = config.time_tracking_enabled && table_exists(db, "time_entries").await?;
        Ok(Self { time_tracking })
    }

    pub fn require_time_tracking(&self) -> AppResult<()> {
        if self.time_tracking {
            Ok(())
        } else {
            Err(AppError::Unavailable("Time tracking feature not set up".into()))
        }
    }
}

async fn table_exists(db: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
    )
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(count > 0)
}

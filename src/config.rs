use std::env;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    /// Empty means any origin is allowed.
    pub cors_allowed_origins: Vec<String>,

    pub session_cookie_name: String,
    pub session_ttl_secs: i64,
    pub session_cookie_secure: bool,

    pub reset_code_ttl_secs: i64,
    /// No mail transport exists, so deployments opt in to returning the code.
    pub expose_reset_code: bool,

    pub time_tracking_enabled: bool,

    pub auth_rate_limit_max: u32,
    pub auth_rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://tracker.db".into()),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 8080)?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "tracker_session".into()),
            session_ttl_secs: parse_var("SESSION_TTL_SECS", 604_800)?, // 7 days
            session_cookie_secure: parse_var("SESSION_COOKIE_SECURE", false)?,

            reset_code_ttl_secs: parse_var("RESET_CODE_TTL_SECS", 900)?, // 15 minutes
            expose_reset_code: parse_var("EXPOSE_RESET_CODE", false)?,

            time_tracking_enabled: parse_var("TIME_TRACKING_ENABLED", true)?,

            auth_rate_limit_max: parse_var("AUTH_RATE_LIMIT_MAX", 10)?,
            auth_rate_limit_window_secs: parse_var("AUTH_RATE_LIMIT_WINDOW_SECS", 60)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

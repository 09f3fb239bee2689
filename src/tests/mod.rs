//! Router-level tests against an in-memory database.

mod auth;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tower::ServiceExt;

use crate::auth::rate_limit::RateLimitState;
use crate::config::Config;
use crate::features::Features;
use crate::{app, AppState};

pub const PASSWORD: &str = "secret123";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 0,
        cors_allowed_origins: Vec::new(),
        session_cookie_name: "tracker_session".into(),
        session_ttl_secs: 3600,
        session_cookie_secure: false,
        reset_code_ttl_secs: 900,
        expose_reset_code: true,
        time_tracking_enabled: true,
        auth_rate_limit_max: 1000,
        auth_rate_limit_window_secs: 60,
    }
}

/// Single long-lived connection, so the in-memory database outlives each query.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub async fn insert_user(db: &SqlitePool, username: &str, email: &str) -> i64 {
    sqlx::query("INSERT INTO users (username, email, password_hash, full_name) VALUES (?, ?, 'x', ?)")
        .bind(username)
        .bind(email)
        .bind(username)
        .execute(db)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", self.text))
    }

    pub fn message(&self) -> String {
        self.json()["message"].as_str().unwrap_or_default().to_string()
    }

    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }

    /// Session token from `Set-Cookie`, if one was issued.
    pub fn session_token(&self) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|cookie| {
                let pair = cookie.split(';').next()?;
                let value = pair.strip_prefix("tracker_session=")?;
                (!value.is_empty()).then(|| value.to_string())
            })
    }

    pub fn set_cookie(&self) -> String {
        self.headers
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = test_pool().await;
        let features = Features::detect(&db, &config).await.unwrap();
        let state = AppState {
            db: db.clone(),
            config: Arc::new(config),
            features,
            rate_limiter: RateLimitState::new(),
        };
        Self {
            router: app(state),
            db,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(COOKIE, format!("tracker_session={token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            text: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn auth(&self, action: &str, body: Value) -> TestResponse {
        let uri = format!("/api/auth?action={action}");
        self.send(Method::POST, &uri, None, Some(body)).await
    }

    /// Registers `username` and returns its session token.
    pub async fn register(&self, username: &str) -> String {
        let resp = self
            .auth(
                "register",
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": PASSWORD,
                    "full_name": format!("{username} tester"),
                }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
        resp.session_token().expect("register sets a session cookie")
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

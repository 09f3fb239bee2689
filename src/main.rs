use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use sqlx::SqlitePool;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod api;
mod auth;
mod config;
mod dates;
mod db;
mod dto;
mod error;
mod features;
mod handlers;
mod maintenance;
mod models;

#[cfg(test)]
mod tests;

use auth::rate_limit::RateLimitState;
use config::Config;
use features::Features;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub features: Features,
    pub rate_limiter: RateLimitState,
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(origins).allow_credentials(true)
}

pub fn app(state: AppState) -> Router {
    use handlers::{
        auth as auth_h, categories, expenses, export, habits, health, moods, statistics, tasks,
        time_entries,
    };

    // Auth actions, with the credential-facing ones rate limited
    let auth_routes = Router::new()
        .route(
            "/api/auth",
            get(auth_h::auth)
                .post(auth_h::auth)
                .fallback(handlers::method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/readyz", get(health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route(
            "/api/categories",
            get(categories::list_categories)
                .post(categories::post_category)
                .put(categories::put_category)
                .delete(categories::delete_category)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/habits",
            get(habits::list_habits)
                .post(habits::post_habit)
                .put(habits::put_habit)
                .delete(habits::delete_habit)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/tasks",
            get(tasks::list_tasks)
                .post(tasks::post_task)
                .put(tasks::put_task)
                .delete(tasks::delete_task)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/expenses",
            get(expenses::list_expenses)
                .post(expenses::post_expense)
                .put(expenses::put_expense)
                .delete(expenses::delete_expense)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/moods",
            get(moods::get_moods)
                .post(moods::save_mood)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/time_tracking",
            get(time_entries::list_time_entries)
                .post(time_entries::post_time_entry)
                .put(time_entries::put_time_entry)
                .delete(time_entries::delete_time_entry)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/statistics",
            get(statistics::get_statistics).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/export",
            get(export::export).fallback(handlers::method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(handlers::preflight))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "life_tracker=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db).await?;
    tracing::info!("Database migrations applied");

    let features = Features::detect(&db, &config).await?;
    if !features.time_tracking {
        tracing::warn!("Time tracking is disabled");
    }

    let rate_limiter = RateLimitState::new();

    // Purges expired sessions, reset codes and rate-limit counters every 5 min
    maintenance::spawn_cleanup_worker(
        db.clone(),
        rate_limiter.clone(),
        config.auth_rate_limit_window_secs,
    );

    let state = AppState {
        db,
        config: config.clone(),
        features,
        rate_limiter,
    };

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    // Client IPs feed the auth rate limiter
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

use axum::http::{header::AUTHORIZATION, Method, Request, StatusCode};
use serde_json::json;

use super::{test_config, TestApp, PASSWORD};
use crate::config::Config;

#[tokio::test]
async fn test_register_seeds_default_categories() {
    let app = TestApp::new().await;

    let resp = app
        .auth(
            "register",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": PASSWORD,
                "full_name": "Alice Liddell"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.message(), "Registration successful");

    let data = resp.data();
    assert!(data["user_id"].as_i64().unwrap() > 0);
    assert_eq!(data["username"], "alice");
    assert_eq!(data["full_name"], "Alice Liddell");

    let cookie = resp.set_cookie();
    assert!(cookie.contains("HttpOnly"), "{cookie}");
    assert!(cookie.contains("SameSite=Lax"), "{cookie}");
    assert!(cookie.contains("Max-Age=3600"), "{cookie}");

    let token = resp.session_token().unwrap();
    let all = app.get("/api/categories", &token).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.data().as_array().unwrap().len(), 9);

    let expense = app.get("/api/categories?type=expense", &token).await;
    let names: Vec<String> = expense
        .data()
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Entertainment", "Food", "Shopping", "Transport"]);

    let habit = app.get("/api/categories?type=habit", &token).await;
    assert_eq!(habit.data().as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_duplicate_email_conflicts_without_new_row() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let resp = app
        .auth(
            "register",
            json!({
                "username": "someone_else",
                "email": "alice@example.com",
                "password": PASSWORD,
                "full_name": "Impostor"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.message(), "Username or email already exists");
    assert_eq!(resp.json()["success"], false);
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 1);
}

#[tokio::test]
async fn test_register_validation_messages() {
    let app = TestApp::new().await;

    let resp = app.auth("register", json!({})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.message(),
        "Missing required fields: username, email, password, full_name"
    );

    let resp = app
        .auth(
            "register",
            json!({
                "username": "bob",
                "email": "not-an-email",
                "password": PASSWORD,
                "full_name": "Bob"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Invalid email format");

    let resp = app
        .auth(
            "register",
            json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": "123",
                "full_name": "Bob"
            }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Password must be at least 6 characters");
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let wrong_password = app
        .auth("login", json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    let unknown_user = app
        .auth("login", json!({ "username": "nobody", "password": "wrong-password" }))
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.text, unknown_user.text);
    assert_eq!(wrong_password.message(), "Invalid username or password");
}

#[tokio::test]
async fn test_login_by_email_returns_profile() {
    let app = TestApp::new().await;
    app.register("alice").await;

    let resp = app
        .auth("login", json!({ "username": "alice@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.message(), "Login successful");

    let data = resp.data();
    assert_eq!(data["username"], "alice");
    assert!(data.get("avatar_url").is_some());
    assert!(data.get("password_hash").is_none());
    assert!(resp.session_token().is_some());
}

#[tokio::test]
async fn test_gate_rejects_missing_and_bogus_sessions() {
    let app = TestApp::new().await;

    let resp = app.send(Method::GET, "/api/habits", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.json(), json!({ "success": false, "message": "Unauthorized. Please login." }));

    let resp = app.get("/api/tasks", "not-a-real-token").await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth?action=verify")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;

    let verify = app.send(Method::GET, "/api/auth?action=verify", Some(&token), None).await;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(verify.message(), "Authenticated");
    assert_eq!(verify.data()["username"], "alice");

    let logout = app.send(Method::POST, "/api/auth?action=logout", Some(&token), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.message(), "Logout successful");

    let verify = app.send(Method::GET, "/api/auth?action=verify", Some(&token), None).await;
    assert_eq!(verify.status, StatusCode::UNAUTHORIZED);
    assert_eq!(verify.message(), "Not authenticated");
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let app = TestApp::new().await;
    let token = app.register("alice").await;
    app.post("/api/habits", &token, json!({ "title": "Read" })).await;

    let resp = app
        .send(Method::POST, "/api/auth?action=delete_account", Some(&token), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.message(), "Account deleted successfully");

    let verify = app.send(Method::GET, "/api/auth?action=verify", Some(&token), None).await;
    assert_eq!(verify.status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM categories").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM habits").await, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 0);
}

#[tokio::test]
async fn test_delete_account_requires_session() {
    let app = TestApp::new().await;
    let resp = app
        .send(Method::POST, "/api/auth?action=delete_account", None, None)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.message(), "Unauthorized");
}

#[tokio::test]
async fn test_unknown_or_missing_action() {
    let app = TestApp::new().await;

    let resp = app.auth("impersonate", json!({})).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Invalid action");

    let resp = app.send(Method::POST, "/api/auth", None, Some(json!({ "action": "login" }))).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Invalid action");
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    let old_token = app.register("alice").await;

    let resp = app
        .auth("forgot_password", json!({ "email": "nobody@example.com" }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.message(), "Email not found");

    let resp = app
        .auth("verify_reset_code", json!({ "email": "alice@example.com", "code": "123456" }))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.message(), "No reset request found");

    let resp = app
        .auth("forgot_password", json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.message(), "Reset code generated");
    assert_eq!(resp.data()["expires_in_minutes"], 15);
    let code = resp.data()["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);

    let stored: String = sqlx::query_scalar("SELECT code_hash FROM password_resets")
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_ne!(stored, code);

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let resp = app
        .auth("verify_reset_code", json!({ "email": "alice@example.com", "code": wrong }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Invalid code");

    let resp = app
        .auth("verify_reset_code", json!({ "email": "alice@example.com", "code": code }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.message(), "Code verified");
    assert_eq!(resp.data()["email"], "alice@example.com");

    let resp = app
        .auth(
            "reset_password",
            json!({ "email": "alice@example.com", "code": wrong, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Invalid or expired code");

    let resp = app
        .auth(
            "reset_password",
            json!({ "email": "alice@example.com", "code": code, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK, "{}", resp.text);
    assert_eq!(resp.message(), "Password reset successfully");

    // Every earlier session is gone and the code is single use.
    let verify = app
        .send(Method::GET, "/api/auth?action=verify", Some(&old_token), None)
        .await;
    assert_eq!(verify.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .auth(
            "reset_password",
            json!({ "email": "alice@example.com", "code": code, "new_password": "another-pass" }),
        )
        .await;
    assert_eq!(resp.message(), "Invalid or expired code");

    let old = app
        .auth("login", json!({ "username": "alice", "password": PASSWORD }))
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = app
        .auth("login", json!({ "username": "alice", "password": "brand-new-pass" }))
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_expired_reset_code() {
    let app = TestApp::new().await;
    app.register("alice").await;
    app.auth("forgot_password", json!({ "email": "alice@example.com" })).await;

    sqlx::query("UPDATE password_resets SET expires_at = 0")
        .execute(&app.db)
        .await
        .unwrap();

    let resp = app
        .auth("verify_reset_code", json!({ "email": "alice@example.com", "code": "123456" }))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.message(), "Reset code expired. Request a new one.");
}

#[tokio::test]
async fn test_reset_code_hidden_unless_exposed() {
    let config = Config {
        expose_reset_code: false,
        ..test_config()
    };
    let app = TestApp::with_config(config).await;
    app.register("alice").await;

    let resp = app
        .auth("forgot_password", json!({ "email": "alice@example.com" }))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.data().get("code").is_none());
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let config = Config {
        auth_rate_limit_max: 2,
        ..test_config()
    };
    let app = TestApp::with_config(config).await;

    for _ in 0..2 {
        let resp = app
            .auth("login", json!({ "username": "ghost", "password": "whatever" }))
            .await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }

    let resp = app
        .auth("login", json!({ "username": "ghost", "password": "whatever" }))
        .await;
    assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.message(), "Too many requests. Please try again later.");

    // Verify is not a credential action and stays reachable.
    let resp = app.send(Method::GET, "/api/auth?action=verify", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

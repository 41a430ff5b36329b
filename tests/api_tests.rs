use learnshare_gateway::{
    AppConfig, AppState, FixedWindowLimiter, LocalDiskStorage, SeededIdentityStore, StorageState,
    create_router, repository::IdentityState,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    // Held so the upload directory outlives the spawned server.
    _upload_dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let upload_dir = TempDir::new().expect("Failed to create temp upload dir");

    let config = AppConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        // Generous budget so ordinary test traffic never trips the limiter.
        rate_limit_max: 1000,
        ..AppConfig::default()
    };

    let identity = Arc::new(SeededIdentityStore::with_demo_data()) as IdentityState;
    let storage = Arc::new(LocalDiskStorage::new(config.upload_dir.clone())) as StorageState;
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));

    let state = AppState {
        identity,
        storage,
        limiter,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        _upload_dir: upload_dir,
    }
}

async fn login(app: &TestApp, openid: &str, user_type: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "openid": openid, "userType": user_type }))
        .send()
        .await
        .expect("login request failed")
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_camps_are_public() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/camps", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"][0]["name"], "Python Starter Camp");
}

#[tokio::test]
async fn test_login_unknown_identity_is_401() {
    let app = spawn_app().await;

    let response = login(&app, "nobody_at_all", "student").await;
    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_role_mismatch_is_403_and_issues_no_token() {
    let app = spawn_app().await;

    // teacher_test is a teacher; asking for the admin section is forbidden.
    let response = login(&app, "teacher_test", "admin").await;
    assert_eq!(response.status(), 403);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_login_with_incomplete_body_gets_400_envelope() {
    let app = spawn_app().await;

    // Missing the required userType field.
    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/login", app.address))
        .json(&serde_json::json!({ "openid": "teacher_test" }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 400);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "got {content_type}");

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("userType"));
}

#[tokio::test]
async fn test_login_with_invalid_json_gets_400_envelope() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/auth/login", app.address))
        .header("content-type", "application/json")
        .body("{not json at all")
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_and_user_info_roundtrip() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = login(&app, "teacher_test", "teacher").await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["userType"], "teacher");
    assert_eq!(body["user"]["nickname"], "Teacher Zhang");
    let token = body["token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{}/api/user/info", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], 2);
    assert_eq!(body["data"]["userType"], "teacher");
    assert!(body["data"]["avatar"].as_str().unwrap().starts_with("https://"));
}

#[tokio::test]
async fn test_user_info_without_token_is_401() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/user/info", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_user_info_with_garbage_token_is_401() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/user/info", app.address))
        .bearer_auth("definitely-not-a-token")
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_admin_users_requires_admin_role() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Admin sees the full user list.
    let body: serde_json::Value = login(&app, "admin_test", "admin").await.json().await.unwrap();
    let admin_token = body["token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{}/api/admin/users", app.address))
        .bearer_auth(&admin_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    // A student is authenticated but forbidden.
    let body: serde_json::Value = login(&app, "student_test", "student")
        .await
        .json()
        .await
        .unwrap();
    let student_token = body["token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("{}/api/admin/users", app.address))
        .bearer_auth(&student_token)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    // Static retrieval responses are covered by the same layer.
    let response = reqwest::Client::new()
        .get(format!("{}/uploads/absent.png", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_unknown_route_returns_404_envelope() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/no/such/route", app.address))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

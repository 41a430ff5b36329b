use learnshare_gateway::{
    AppConfig, AppState, FixedWindowLimiter, LocalDiskStorage, SeededIdentityStore, StorageState,
    create_router, repository::IdentityState,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

struct TestApp {
    address: String,
    _upload_dir: TempDir,
}

/// Spawns the gateway with a deliberately tiny admission budget so the
/// ceiling can be hit inside a test.
async fn spawn_app_with_budget(max_requests: u32) -> TestApp {
    let upload_dir = TempDir::new().expect("Failed to create temp upload dir");

    let config = AppConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        rate_limit_max: max_requests,
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

async fn get_health(app: &TestApp, forwarded_for: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{}/api/health", app.address))
        .header("x-forwarded-for", forwarded_for)
        .send()
        .await
        .expect("req fail")
}

#[tokio::test]
async fn requests_past_the_ceiling_get_429() {
    let app = spawn_app_with_budget(5).await;

    for _ in 0..5 {
        assert_eq!(get_health(&app, "10.0.0.1").await.status(), 200);
    }

    let response = get_health(&app, "10.0.0.1").await;
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("retry-after"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn budgets_are_per_client() {
    let app = spawn_app_with_budget(5).await;

    for _ in 0..5 {
        assert_eq!(get_health(&app, "10.0.0.1").await.status(), 200);
    }
    assert_eq!(get_health(&app, "10.0.0.1").await.status(), 429);

    // A different client address still has its full budget.
    assert_eq!(get_health(&app, "10.0.0.2").await.status(), 200);
}

#[tokio::test]
async fn static_retrieval_is_outside_the_budget() {
    let app = spawn_app_with_budget(2).await;
    let client = reqwest::Client::new();

    // Exhaust the API budget.
    assert_eq!(get_health(&app, "10.0.0.9").await.status(), 200);
    assert_eq!(get_health(&app, "10.0.0.9").await.status(), 200);
    assert_eq!(get_health(&app, "10.0.0.9").await.status(), 429);

    // /uploads requests are never throttled, only unmatched names 404.
    for _ in 0..5 {
        let response = client
            .get(format!("{}/uploads/absent.png", app.address))
            .header("x-forwarded-for", "10.0.0.9")
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), 404);
    }
}

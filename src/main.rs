use learnshare_gateway::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    rate_limit::FixedWindowLimiter,
    repository::{IdentityState, PostgresIdentityStore, SeededIdentityStore},
    storage::{LocalDiskStorage, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// The asynchronous entry point for the gateway, responsible for initializing
/// all core components: Configuration, Logging, Identity Store, Upload
/// Pipeline, Admission Limiter, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    // AppConfig::load() implements the fail-fast principle for missing production secrets.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // Prioritizes RUST_LOG, falling back to sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "learnshare_gateway=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // The structured logging format is dynamically selected based on APP_ENV.
    match config.env {
        Env::Local => {
            // LOCAL: pretty output for human readability during debugging.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: JSON output for ingestion by centralized log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);

    // 4. Upload Directory (idempotent creation)
    let disk = LocalDiskStorage::new(config.upload_dir.clone());
    disk.ensure_root()
        .await
        .expect("FATAL: failed to create upload directory");
    let storage = Arc::new(disk) as StorageState;

    // 5. Identity Store Initialization
    // Local runs against the seeded in-memory records; production requires a
    // Postgres-backed store.
    let identity: IdentityState = match config.env {
        Env::Local => Arc::new(SeededIdentityStore::with_demo_data()),
        Env::Production => {
            let db_url = config
                .db_url
                .clone()
                .expect("FATAL: DATABASE_URL required in production");
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            Arc::new(PostgresIdentityStore::new(pool))
        }
    };

    // 6. Admission Limiter
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));
    // Keeps the keyed window map bounded for the process lifetime.
    Arc::clone(&limiter).spawn_pruner();

    // 7. Unified State Assembly
    let app_state = AppState {
        identity,
        storage,
        limiter,
        config: app_config_logged(config),
    };

    // 8. Router and Server Startup
    let app = create_router(app_state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], app_state.config.port));
    let listener = TcpListener::bind(addr).await.expect("FATAL: failed to bind port");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {addr}");
    tracing::info!("Upload directory: {}", app_state.config.upload_dir.display());
    tracing::info!(
        "Health check: http://localhost:{}/api/health",
        app_state.config.port
    );
    tracing::info!(
        "API documentation (Swagger UI) available at: http://localhost:{}/swagger-ui",
        app_state.config.port
    );

    // The long-running Axum server process. ConnectInfo supplies peer
    // addresses to the admission limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

/// Logs the effective non-secret knobs once at startup and passes the config through.
fn app_config_logged(config: AppConfig) -> AppConfig {
    tracing::info!(
        rate_limit_max = config.rate_limit_max,
        rate_limit_window_secs = config.rate_limit_window_secs,
        token_ttl_secs = config.token_ttl_secs,
        "admission and session policy loaded"
    );
    config
}

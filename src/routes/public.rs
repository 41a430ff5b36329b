use crate::{AppState, handlers, storage::MAX_UPLOAD_BYTES};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// Login is the entry to the authenticated tier; camps and uploads follow the
/// source system's behavior of accepting anonymous traffic. All of these sit
/// behind the admission limiter like the rest of the API surface.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /api/health
        // Monitoring and load balancer checks. Returns status/version metadata.
        .route("/health", get(handlers::health))
        // POST /api/auth/login
        // Resolves an external identity, enforces the role check, issues a token.
        .route("/auth/login", post(handlers::login))
        // GET /api/camps
        // Read-only camp catalogue.
        .route("/camps", get(handlers::get_camps))
        // POST /api/upload
        // Multipart ingestion pipeline. The body limit is raised above the
        // 100 MiB ceiling so the pipeline itself performs the size rejection
        // and reports it through the standard envelope.
        .route(
            "/upload",
            post(handlers::upload_file)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 2 * 1024 * 1024)),
        )
}

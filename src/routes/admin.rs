use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to users with the admin role.
///
/// Access Control:
/// This entire router is wrapped in the authentication middleware, and each
/// handler additionally verifies `role == admin` before touching the store.
/// This prevents any non-admin access to oversight functions.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/admin/users
        // Lists every known user, including their external identifiers.
        .route("/users", get(handlers::get_admin_users))
}

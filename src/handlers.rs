use crate::{
    AppState,
    auth::{AuthUser, issue_token},
    error::{AppError, AppResult},
    models::{Camp, HealthStatus, LoginRequest, LoginResponse, UploadReceipt, User, UserProfile, UserRole},
    response::{AppJson, Envelope},
    storage::{storage_name, validate_mime_type, validate_size},
};
use axum::{
    Json,
    extract::{Multipart, State},
};

// --- Handlers ---

/// health
///
/// [Public Route] A simple, unauthenticated endpoint used for monitoring and
/// load balancer checks.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.env.as_str().to_string(),
    })
}

/// login
///
/// [Public Route] Resolves the presented external identifier against the
/// Identity Store and issues a session token.
///
/// *Authorization*: the requested role is compared against the resolved user's
/// actual role **before** a token is issued — an unknown identity is 401, a
/// role mismatch is 403, and neither produces a credential.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Unknown identity"),
        (status = 403, description = "Role mismatch")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state
        .identity
        .find_by_openid(&payload.openid)
        .await
        .ok_or_else(|| AppError::Unauthenticated("user does not exist".to_string()))?;

    if user.user_type != payload.user_type {
        return Err(AppError::Forbidden("permission denied".to_string()));
    }

    let token = issue_token(&state.config.token_secret, user.id, state.config.token_ttl_secs)?;

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserProfile::from(user),
    }))
}

/// get_camps
///
/// [Public Route] Lists the camp catalogue. No authentication required.
#[utoipa::path(
    get,
    path = "/api/camps",
    responses((status = 200, description = "Camp catalogue", body = [Camp]))
)]
pub async fn get_camps(State(state): State<AppState>) -> Json<Envelope<Vec<Camp>>> {
    let camps = state.identity.list_camps().await;
    Json(Envelope::ok(camps))
}

/// get_user_info
///
/// [Authenticated Route] Returns the profile of the user bound to the bearer
/// token. The identity is resolved securely by the `AuthUser` extractor.
#[utoipa::path(
    get,
    path = "/api/user/info",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Missing, invalid, or unknown token")
    )
)]
pub async fn get_user_info(user: AuthUser) -> Json<Envelope<UserProfile>> {
    Json(Envelope::ok(UserProfile {
        id: user.id,
        nickname: user.nickname,
        user_type: user.role,
        avatar: user
            .avatar
            .unwrap_or_else(|| crate::models::DEFAULT_AVATAR.to_string()),
    }))
}

/// get_admin_users
///
/// [Admin Route] Lists every known user.
///
/// *RBAC*: strict enforcement of the admin role before consulting the store.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn get_admin_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<Vec<User>>>> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("permission denied".to_string()));
    }
    Ok(Json(Envelope::ok(state.identity.list_users().await)))
}

/// upload_file
///
/// [Public Route] Accepts a multipart upload in the `file` field and runs the
/// ingestion pipeline: type check, size check, unique naming, persistence.
///
/// Fail-fast ordering: the declared MIME type is checked before the payload is
/// read, the size ceiling after; the first violation wins. The payload is
/// fully buffered and validated before any disk write, so an aborted stream
/// never registers a partial asset.
#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "Stored", body = UploadReceipt),
        (status = 400, description = "Missing file, unsupported type, or too large")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<UploadReceipt>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        validate_mime_type(&mimetype).map_err(|e| AppError::Validation(e.to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        validate_size(data.len()).map_err(|e| AppError::Validation(e.to_string()))?;

        let stored_name = storage_name("file", &original_name);
        state
            .storage
            .save(&stored_name, &data)
            .await
            .map_err(|e| AppError::Internal(format!("failed to persist upload: {e}")))?;

        tracing::info!(
            filename = %original_name,
            stored = %stored_name,
            size = data.len(),
            "upload accepted"
        );

        return Ok(Json(Envelope::ok(UploadReceipt {
            url: format!("/uploads/{stored_name}"),
            filename: original_name,
            size: data.len() as u64,
            mimetype,
        })));
    }

    Err(AppError::Validation("no file uploaded".to_string()))
}

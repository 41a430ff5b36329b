use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig,
    error::AppError,
    models::UserRole,
    repository::IdentityState,
};

/// Claims
///
/// The signed payload of a session token. Tokens are stateless: everything
/// needed to re-derive the user identity is inside the token itself, there is
/// no server-side session or revocation list. Logout is purely client discard;
/// `exp` bounds how long a discarded-but-leaked token stays usable.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the numeric user id looked up in the Identity Store.
    pub sub: i64,
    /// Issued At timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp. Tokens past this instant are rejected.
    pub exp: usize,
}

/// Why a presented token was rejected. Both outcomes surface to the client as
/// a 401; the distinction exists for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong structure, bad signature, or undecodable claims.
    Malformed,
    /// Structurally valid but past its expiry.
    Expired,
}

/// issue_token
///
/// Produces a signed session token binding `user_id` and the issuance
/// timestamp. Pure over its inputs; no server-side state is created.
pub fn issue_token(secret: &str, user_id: i64, ttl_secs: i64) -> Result<String, AppError> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token issuance failed: {e}")))
}

/// parse_token
///
/// Verifies the signature and expiry of a presented token and returns the
/// bound user id. A given token string deterministically decodes to exactly
/// one user id or is rejected.
pub fn parse_token(secret: &str, token: &str) -> Result<i64, TokenError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims.sub),
        Err(e) => match e.kind() {
            ErrorKind::ExpiredSignature => Err(TokenError::Expired),
            _ => Err(TokenError::Malformed),
        },
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request — the terminal
/// `Authenticated` state of the authorization gate. Handlers take this as an
/// argument to receive a fully verified user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub nickname: String,
    pub role: UserRole,
    pub avatar: Option<String>,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any authenticated handler. The gate walks the state
/// machine: bearer token present? → token parses? → user exists? Any failure
/// is the terminal `Unauthenticated` state (401 envelope); the gate never
/// panics on an absent user.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = IdentityState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthenticated("unauthorized".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthenticated("unauthorized".to_string()))?;

        let user_id = parse_token(&config.token_secret, token)
            .map_err(|_| AppError::Unauthenticated("invalid or expired token".to_string()))?;

        // Final verification against the Identity Store. A token may be valid
        // while the user no longer exists; that is a rejection, not a crash.
        let user = identity
            .get_user(user_id)
            .await
            .ok_or_else(|| AppError::Unauthenticated("user does not exist".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            nickname: user.nickname,
            role: user.user_type,
            avatar: user.avatar,
        })
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Fallback avatar served for users without a stored profile image.
pub const DEFAULT_AVATAR: &str = "https://randomuser.me/api/portraits/lego/1.jpg";

// --- Core Application Schemas ---

/// UserRole
///
/// The RBAC field: determines which subtree of routes a user may enter.
/// Serialized in lowercase on the wire (`"admin"`, `"teacher"`, `"student"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
        };
        f.write_str(s)
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "teacher" => Ok(UserRole::Teacher),
            "student" => Ok(UserRole::Student),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// User
///
/// The canonical identity record owned by the Identity Store. The gateway only
/// reads it; creation and seeding happen externally.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// Opaque external identifier resolved at login (e.g. a WeChat openid).
    pub openid: String,
    pub nickname: String,
    pub user_type: UserRole,
    /// Optional stored avatar URL; responses fall back to [`DEFAULT_AVATAR`].
    pub avatar: Option<String>,
}

/// Camp
///
/// A learning camp record, served read-only from the Identity Store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Camp {
    pub id: i64,
    pub name: String,
    pub description: String,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /api/auth/login. The requested `userType` must match
/// the resolved user's actual role, otherwise login is forbidden.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub openid: String,
    pub user_type: UserRole,
}

// --- Response Schemas ---

/// UserProfile
///
/// The user view returned by login and GET /api/user/info. Never exposes the
/// external identifier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub nickname: String,
    pub user_type: UserRole,
    pub avatar: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nickname: user.nickname,
            user_type: user.user_type,
            avatar: user.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
        }
    }
}

/// LoginResponse
///
/// Successful login keeps the flat `{success, token, user}` shape rather than
/// the generic data envelope, so the session token sits at the top level.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    /// Opaque bearer credential for subsequent requests.
    pub token: String,
    pub user: UserProfile,
}

/// UploadReceipt
///
/// Output schema for an accepted upload: where the asset can be retrieved and
/// what was stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadReceipt {
    /// Retrieval path under the static upload prefix, e.g. `/uploads/file-...-....pdf`.
    pub url: String,
    /// The client-supplied original filename.
    pub filename: String,
    pub size: u64,
    pub mimetype: String,
}

/// HealthStatus
///
/// Output schema for the monitoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub environment: String,
}

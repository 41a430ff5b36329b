use crate::models::{Camp, User, UserRole};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::str::FromStr;
use std::sync::Arc;

/// IdentityStore Trait
///
/// Defines the abstract contract for all identity lookups. The gateway core
/// treats the store backing users and camps as an external collaborator; this
/// trait makes the core testable without a live database and swappable to a
/// real persistent store.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn IdentityStore>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Resolves a user by the opaque external identifier presented at login.
    async fn find_by_openid(&self, openid: &str) -> Option<User>;
    /// Resolves a user by the numeric id bound inside a session token.
    async fn get_user(&self, id: i64) -> Option<User>;
    /// Admin view: every known user.
    async fn list_users(&self) -> Vec<User>;
    /// Public camp catalogue.
    async fn list_camps(&self) -> Vec<Camp>;
}

/// IdentityState
///
/// The concrete type used to share identity lookups across the application state.
pub type IdentityState = Arc<dyn IdentityStore>;

/// SeededIdentityStore
///
/// In-memory implementation holding a fixed set of records. Used in
/// `Env::Local` and in tests, where the gateway runs without a database.
pub struct SeededIdentityStore {
    users: Vec<User>,
    camps: Vec<Camp>,
}

impl SeededIdentityStore {
    pub fn new(users: Vec<User>, camps: Vec<Camp>) -> Self {
        Self { users, camps }
    }

    /// The well-known demo records: one user per role plus two camps.
    pub fn with_demo_data() -> Self {
        let user = |id, openid: &str, nickname: &str, user_type| User {
            id,
            openid: openid.to_string(),
            nickname: nickname.to_string(),
            user_type,
            avatar: None,
        };
        let camp = |id, name: &str, description: &str| Camp {
            id,
            name: name.to_string(),
            description: description.to_string(),
        };
        Self::new(
            vec![
                user(1, "admin_test", "Administrator", UserRole::Admin),
                user(2, "teacher_test", "Teacher Zhang", UserRole::Teacher),
                user(3, "student_test", "Student Li", UserRole::Student),
            ],
            vec![
                camp(1, "Python Starter Camp", "Learn the fundamentals of Python programming"),
                camp(2, "Web Development Bootcamp", "Hands-on full-stack development course"),
            ],
        )
    }
}

#[async_trait]
impl IdentityStore for SeededIdentityStore {
    async fn find_by_openid(&self, openid: &str) -> Option<User> {
        self.users.iter().find(|u| u.openid == openid).cloned()
    }

    async fn get_user(&self, id: i64) -> Option<User> {
        self.users.iter().find(|u| u.id == id).cloned()
    }

    async fn list_users(&self) -> Vec<User> {
        self.users.clone()
    }

    async fn list_camps(&self) -> Vec<Camp> {
        self.camps.clone()
    }
}

/// PostgresIdentityStore
///
/// The production implementation of `IdentityStore`, backed by PostgreSQL.
/// Lookup failures degrade to empty results with an error log rather than
/// surfacing database detail to request handlers.
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Creates a new store instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a `users` row to the domain model. Rows carrying a role string the
/// gateway does not know are skipped with a warning instead of failing the
/// whole query.
fn user_from_row(row: &PgRow) -> Option<User> {
    let role: String = row.try_get("user_type").ok()?;
    let user_type = match UserRole::from_str(&role) {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!(error = %e, "skipping user row with unknown role");
            return None;
        }
    };
    Some(User {
        id: row.try_get("id").ok()?,
        openid: row.try_get("openid").ok()?,
        nickname: row.try_get("nickname").ok()?,
        user_type,
        avatar: row.try_get::<Option<String>, _>("avatar").ok().flatten(),
    })
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn find_by_openid(&self, openid: &str) -> Option<User> {
        sqlx::query("SELECT id, openid, nickname, user_type, avatar FROM users WHERE openid = $1")
            .bind(openid)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("find_by_openid error: {:?}", e);
                None
            })
            .and_then(|row| user_from_row(&row))
    }

    async fn get_user(&self, id: i64) -> Option<User> {
        sqlx::query("SELECT id, openid, nickname, user_type, avatar FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_user error: {:?}", e);
                None
            })
            .and_then(|row| user_from_row(&row))
    }

    async fn list_users(&self) -> Vec<User> {
        match sqlx::query("SELECT id, openid, nickname, user_type, avatar FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows.iter().filter_map(user_from_row).collect(),
            Err(e) => {
                tracing::error!("list_users error: {:?}", e);
                vec![]
            }
        }
    }

    async fn list_camps(&self) -> Vec<Camp> {
        match sqlx::query("SELECT id, name, description FROM camps ORDER BY id")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| {
                    Some(Camp {
                        id: row.try_get("id").ok()?,
                        name: row.try_get("name").ok()?,
                        description: row.try_get("description").ok()?,
                    })
                })
                .collect(),
            Err(e) => {
                tracing::error!("list_camps error: {:?}", e);
                vec![]
            }
        }
    }
}

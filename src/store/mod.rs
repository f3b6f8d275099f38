/// Storage collaborators
///
/// The auth core only talks to these traits. `PgStore` backs them with
/// Postgres, `InMemoryStore` keeps everything in process memory.

mod memory;
mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::HashedPassword;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Stored refresh token
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// `None` while the token is active
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub hashed_password: HashedPassword,
    pub is_chirpy_red: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UniqueViolation(String),
    NotFound,
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UniqueViolation(msg) => write!(f, "Duplicate entry: {}", msg),
            StoreError::NotFound => write!(f, "Record not found"),
            StoreError::Unavailable(msg) => write!(f, "Storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::UniqueViolation(db_err.message().to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Persistence for refresh tokens, keyed by the token string.
///
/// Each method is a single atomic operation from the caller's point of view.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(
        &self,
        token: &str,
        owner: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError>;

    async fn get_refresh_token(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Mark the token revoked. A token that is already revoked keeps its
    /// original timestamp.
    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError>;
}

/// Persistence for user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &HashedPassword,
    ) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &HashedPassword,
    ) -> Result<User, StoreError>;

    async fn upgrade_user(&self, id: Uuid) -> Result<(), StoreError>;
}

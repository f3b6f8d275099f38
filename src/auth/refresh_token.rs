/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 bytes from the OS CSPRNG, hex encoded (64 lowercase characters)
/// - Stored by the token string itself through a [`RefreshTokenStore`]
/// - Valid for 60 days unless revoked first
/// - Never rotated on exchange and never deleted here

use std::fmt;

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::auth::jwt::{access_token_ttl, issue_access_token, SigningSecret};
use crate::store::{RefreshToken, RefreshTokenStore, StoreError};

pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    NotFound,
    Revoked,
    Expired,
    /// Generated value collided with an existing token; retry with a new one
    Conflict,
    Storage(String),
    Signing(String),
}

impl RefreshError {
    /// Lifecycle failures are reported to clients as one uniform denial
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            RefreshError::NotFound | RefreshError::Revoked | RefreshError::Expired
        )
    }
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshError::NotFound => write!(f, "refresh token not found"),
            RefreshError::Revoked => write!(f, "refresh token has been revoked"),
            RefreshError::Expired => write!(f, "refresh token has expired"),
            RefreshError::Conflict => write!(f, "refresh token already exists"),
            RefreshError::Storage(msg) => write!(f, "refresh token storage failed: {}", msg),
            RefreshError::Signing(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RefreshError {}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => RefreshError::NotFound,
            StoreError::UniqueViolation(_) => RefreshError::Conflict,
            StoreError::Unavailable(msg) => RefreshError::Storage(msg),
        }
    }
}

/// Generate a new refresh token candidate.
///
/// Uniqueness is not checked here; the store's unique key is the backstop.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generate a refresh token for `owner` and persist it
///
/// # Errors
/// `Conflict` on a token collision, `Storage` if the store is unavailable
pub async fn issue_refresh_token(
    store: &dyn RefreshTokenStore,
    owner: Uuid,
) -> Result<RefreshToken, RefreshError> {
    let token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_TTL_DAYS);

    let record = store.create_refresh_token(&token, owner, expires_at).await?;

    tracing::debug!(user_id = %owner, expires_at = %record.expires_at, "Refresh token issued");
    Ok(record)
}

/// Exchange a refresh token for a new access token with the default lifetime
///
/// # Errors
/// `NotFound`, `Revoked` or `Expired` when the token cannot be used,
/// `Storage` if the lookup fails
pub async fn exchange_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
    secret: &SigningSecret,
) -> Result<String, RefreshError> {
    let record = match store.get_refresh_token(token).await {
        Ok(record) => record,
        Err(StoreError::NotFound) => {
            tracing::warn!("Attempt to use unknown refresh token");
            return Err(RefreshError::NotFound);
        }
        Err(e) => return Err(e.into()),
    };

    if record.is_revoked() {
        tracing::warn!(
            user_id = %record.user_id,
            revoked_at = ?record.revoked_at,
            "Attempt to use revoked refresh token"
        );
        return Err(RefreshError::Revoked);
    }

    if record.is_expired_at(Utc::now()) {
        tracing::info!(user_id = %record.user_id, "Refresh token expired");
        return Err(RefreshError::Expired);
    }

    issue_access_token(record.user_id, secret, access_token_ttl(None))
        .map_err(|e| RefreshError::Signing(e.to_string()))
}

/// Revoke a refresh token. Revoking twice succeeds and keeps the first time.
///
/// # Errors
/// `NotFound` if the token was never issued, `Storage` if the store fails
pub async fn revoke_refresh_token(
    store: &dyn RefreshTokenStore,
    token: &str,
) -> Result<(), RefreshError> {
    match store.revoke_refresh_token(token).await {
        Ok(()) => {
            tracing::info!("Refresh token revoked");
            Ok(())
        }
        Err(StoreError::NotFound) => {
            tracing::warn!("Attempt to revoke unknown refresh token");
            Err(RefreshError::NotFound)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_access_token;
    use crate::store::InMemoryStore;

    fn secret() -> SigningSecret {
        SigningSecret::new("refresh-test-secret").unwrap()
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_tokens_are_distinct() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[tokio::test]
    async fn issued_token_expires_in_sixty_days() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();

        let record = issue_refresh_token(&store, owner).await.unwrap();

        assert_eq!(record.user_id, owner);
        assert!(record.revoked_at.is_none());
        let lifetime = record.expires_at - record.created_at;
        assert!((lifetime - Duration::days(REFRESH_TOKEN_TTL_DAYS)).num_seconds().abs() <= 1);
    }

    #[tokio::test]
    async fn exchange_returns_access_token_for_owner() {
        let store = InMemoryStore::new();
        let owner = Uuid::new_v4();
        let record = issue_refresh_token(&store, owner).await.unwrap();

        let access = exchange_refresh_token(&store, &record.token, &secret())
            .await
            .unwrap();

        assert_eq!(verify_access_token(&access, &secret()), Ok(owner));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let store = InMemoryStore::new();
        let record = issue_refresh_token(&store, Uuid::new_v4()).await.unwrap();

        revoke_refresh_token(&store, &record.token).await.unwrap();
        assert!(store.get_refresh_token(&record.token).await.unwrap().is_revoked());
        let result = exchange_refresh_token(&store, &record.token, &secret()).await;

        assert_eq!(result, Err(RefreshError::Revoked));
        assert!(result.unwrap_err().is_lifecycle());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = InMemoryStore::new();
        let record = issue_refresh_token(&store, Uuid::new_v4()).await.unwrap();

        revoke_refresh_token(&store, &record.token).await.unwrap();
        let first = store.get_refresh_token(&record.token).await.unwrap().revoked_at;
        revoke_refresh_token(&store, &record.token).await.unwrap();
        let second = store.get_refresh_token(&record.token).await.unwrap().revoked_at;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let store = InMemoryStore::new();
        let unknown = generate_refresh_token();

        assert_eq!(
            exchange_refresh_token(&store, &unknown, &secret()).await,
            Err(RefreshError::NotFound)
        );
        assert_eq!(
            revoke_refresh_token(&store, &unknown).await,
            Err(RefreshError::NotFound)
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let store = InMemoryStore::new();
        let token = generate_refresh_token();
        store
            .create_refresh_token(&token, Uuid::new_v4(), Utc::now() - Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(
            exchange_refresh_token(&store, &token, &secret()).await,
            Err(RefreshError::Expired)
        );
    }

    #[tokio::test]
    async fn collision_surfaces_as_conflict() {
        let store = InMemoryStore::new();
        let token = generate_refresh_token();
        let expires_at = Utc::now() + Duration::days(1);
        store
            .create_refresh_token(&token, Uuid::new_v4(), expires_at)
            .await
            .unwrap();

        let err = store
            .create_refresh_token(&token, Uuid::new_v4(), expires_at)
            .await
            .map_err(RefreshError::from)
            .unwrap_err();

        assert_eq!(err, RefreshError::Conflict);
    }
}

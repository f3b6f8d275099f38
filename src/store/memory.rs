use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::HashedPassword;
use crate::store::{RefreshToken, RefreshTokenStore, StoreError, User, UserStore};

/// Process-local store for development and tests.
///
/// Every operation holds the lock for its whole duration, which gives the same
/// per-record atomicity the Postgres store gets from single statements.
#[derive(Default)]
pub struct InMemoryStore {
    refresh_tokens: Mutex<HashMap<String, RefreshToken>>,
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh_tokens(&self) -> Result<MutexGuard<'_, HashMap<String, RefreshToken>>, StoreError> {
        self.refresh_tokens
            .lock()
            .map_err(|_| StoreError::Unavailable("refresh token table poisoned".to_string()))
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<Uuid, User>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Unavailable("user table poisoned".to_string()))
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create_refresh_token(
        &self,
        token: &str,
        owner: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        let mut tokens = self.refresh_tokens()?;
        if tokens.contains_key(token) {
            return Err(StoreError::UniqueViolation("refresh token already exists".to_string()));
        }

        let now = Utc::now();
        let record = RefreshToken {
            token: token.to_string(),
            user_id: owner,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };
        tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<RefreshToken, StoreError> {
        self.refresh_tokens()?
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens()?;
        let record = tokens.get_mut(token).ok_or(StoreError::NotFound)?;

        let now = Utc::now();
        record.revoked_at.get_or_insert(now);
        record.updated_at = now;
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &HashedPassword,
    ) -> Result<User, StoreError> {
        let mut users = self.users()?;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::UniqueViolation("email already registered".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.clone(),
            is_chirpy_red: false,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users()?
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &HashedPassword,
    ) -> Result<User, StoreError> {
        let mut users = self.users()?;
        if users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::UniqueViolation("email already registered".to_string()));
        }

        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn upgrade_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut users = self.users()?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn duplicate_refresh_token_is_rejected() {
        let store = InMemoryStore::new();
        let expires_at = Utc::now() + Duration::days(60);

        store
            .create_refresh_token("abc", Uuid::new_v4(), expires_at)
            .await
            .expect("first insert");
        let second = store
            .create_refresh_token("abc", Uuid::new_v4(), expires_at)
            .await;

        assert!(matches!(second, Err(StoreError::UniqueViolation(_))));
    }

    #[tokio::test]
    async fn revocation_keeps_first_timestamp() {
        let store = InMemoryStore::new();
        store
            .create_refresh_token("abc", Uuid::new_v4(), Utc::now() + Duration::days(60))
            .await
            .unwrap();

        store.revoke_refresh_token("abc").await.unwrap();
        let first = store.get_refresh_token("abc").await.unwrap().revoked_at;
        store.revoke_refresh_token("abc").await.unwrap();
        let second = store.get_refresh_token("abc").await.unwrap().revoked_at;

        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let store = InMemoryStore::new();

        assert_eq!(store.get_refresh_token("nope").await, Err(StoreError::NotFound));
        assert_eq!(store.revoke_refresh_token("nope").await, Err(StoreError::NotFound));
        assert!(matches!(
            store.get_user_by_email("nobody@example.com").await,
            Err(StoreError::NotFound)
        ));
        assert_eq!(store.upgrade_user(Uuid::new_v4()).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn user_emails_are_unique() {
        let store = InMemoryStore::new();
        let hashed = HashedPassword::from("$2b$04$placeholder".to_string());

        let user = store.create_user("a@example.com", &hashed).await.unwrap();
        assert!(matches!(
            store.create_user("a@example.com", &hashed).await,
            Err(StoreError::UniqueViolation(_))
        ));

        let updated = store.update_user(user.id, "b@example.com", &hashed).await.unwrap();
        assert_eq!(updated.email, "b@example.com");
        store.upgrade_user(user.id).await.unwrap();
        assert!(store.get_user_by_email("b@example.com").await.unwrap().is_chirpy_red);
    }
}

//! Runs `PgStore` against a real Postgres. Each test creates its own database
//! from `configuration.database` and applies `migrations/`.
//!
//! `cargo test -- --ignored` with Postgres reachable.

use chrono::{Duration, Utc};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use chirpy::auth::{
    generate_refresh_token, hash_password, issue_refresh_token, revoke_refresh_token,
    verify_password, RefreshError,
};
use chirpy::configuration::{get_configuration, DatabaseSettings};
use chirpy::store::{PgStore, RefreshTokenStore, StoreError, User, UserStore};

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

async fn spawn_store() -> PgStore {
    let mut configuration = get_configuration().expect("Failed to read configuration.");
    configuration.database.database_name = Uuid::new_v4().to_string();

    PgStore::new(configure_database(&configuration.database).await)
}

async fn create_walt(store: &PgStore) -> User {
    let hashed = hash_password("04234").unwrap();
    store
        .create_user("walt@breakingbad.com", &hashed)
        .await
        .expect("Failed to create user")
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn users_round_trip_through_postgres() {
    let store = spawn_store().await;
    let created = create_walt(&store).await;

    let fetched = store.get_user_by_email("walt@breakingbad.com").await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert!(!fetched.is_chirpy_red);
    assert!(verify_password(&fetched.hashed_password, "04234").is_ok());

    let duplicate = store
        .create_user("walt@breakingbad.com", &hash_password("other").unwrap())
        .await;
    assert!(matches!(duplicate, Err(StoreError::UniqueViolation(_))));

    assert_eq!(
        store.get_user_by_email("saul@bettercall.com").await.unwrap_err(),
        StoreError::NotFound
    );
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn update_and_upgrade_user() {
    let store = spawn_store().await;
    let user = create_walt(&store).await;

    let updated = store
        .update_user(user.id, "heisenberg@breakingbad.com", &hash_password("blue").unwrap())
        .await
        .unwrap();
    assert_eq!(updated.email, "heisenberg@breakingbad.com");
    assert!(verify_password(&updated.hashed_password, "blue").is_ok());

    store.upgrade_user(user.id).await.unwrap();
    let fetched = store
        .get_user_by_email("heisenberg@breakingbad.com")
        .await
        .unwrap();
    assert!(fetched.is_chirpy_red);

    assert_eq!(
        store.upgrade_user(Uuid::new_v4()).await.unwrap_err(),
        StoreError::NotFound
    );
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn revoke_twice_keeps_first_revocation_time() {
    let store = spawn_store().await;
    let user = create_walt(&store).await;
    let record = issue_refresh_token(&store, user.id).await.unwrap();

    let fetched = store.get_refresh_token(&record.token).await.unwrap();
    assert_eq!(fetched.user_id, user.id);
    assert!(fetched.revoked_at.is_none());

    revoke_refresh_token(&store, &record.token).await.unwrap();
    let first = store.get_refresh_token(&record.token).await.unwrap();
    revoke_refresh_token(&store, &record.token).await.unwrap();
    let second = store.get_refresh_token(&record.token).await.unwrap();

    assert!(first.is_revoked());
    assert_eq!(first.revoked_at, second.revoked_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn unknown_and_duplicate_refresh_tokens() {
    let store = spawn_store().await;
    let user = create_walt(&store).await;
    let unknown = generate_refresh_token();

    assert_eq!(
        store.get_refresh_token(&unknown).await.unwrap_err(),
        StoreError::NotFound
    );
    assert_eq!(
        revoke_refresh_token(&store, &unknown).await,
        Err(RefreshError::NotFound)
    );

    let token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(1);
    store
        .create_refresh_token(&token, user.id, expires_at)
        .await
        .unwrap();
    let duplicate = store
        .create_refresh_token(&token, user.id, expires_at)
        .await
        .map_err(RefreshError::from);

    assert_eq!(duplicate.unwrap_err(), RefreshError::Conflict);
}

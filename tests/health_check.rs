//! Integration tests for the public, unauthenticated surface

use std::net::TcpListener;
use std::sync::Arc;

use chirpy::configuration::AuthKeys;
use chirpy::startup::run;
use chirpy::store::InMemoryStore;
use chirpy::auth::SigningSecret;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(InMemoryStore::new());
    let keys = AuthKeys {
        secret: SigningSecret::new("health-check-secret").unwrap(),
        polka_key: "polka-key".to_string(),
    };
    let server = run(listener, store.clone(), store, keys).expect("Failed to create server");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/api/healthz", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/app/index.html", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}

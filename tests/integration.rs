//! Integration tests against a live Postgres
//!
//! These tests require a running Postgres instance with TLS enabled.
//! Configure it the same way the application is configured:
//!
//! ```bash
//! export DB_HOST=localhost DB_PORT=5432 DB_NAME=postgres DB_USER=postgres DB_PASSWORD=postgres
//! cargo test --test integration -- --ignored --nocapture
//! ```

use pg_bootstrap::{ConnectionConfig, ConnectionFactory, HandleState, SslMode};
use std::sync::Arc;

#[tokio::test]
#[ignore] // Requires Postgres running with TLS
async fn test_connect_lazily_and_query() {
    let db = ConnectionFactory::from_process_env()
        .initialize()
        .expect("initialize");
    assert_eq!(db.state().await, HandleState::Configured);

    let row = db.query_one("SELECT 1::INT4", &[]).await.expect("query");
    let value: i32 = row.get(0);
    assert_eq!(value, 1);
    assert_eq!(db.state().await, HandleState::Connected);

    db.close().await;
}

#[tokio::test]
#[ignore] // Requires Postgres running with TLS
async fn test_connection_uses_tls() {
    let db = ConnectionFactory::from_process_env()
        .initialize()
        .expect("initialize");

    let row = db
        .query_one(
            "SELECT ssl FROM pg_stat_ssl WHERE pid = pg_backend_pid()",
            &[],
        )
        .await
        .expect("query");
    let ssl: bool = row.get(0);
    assert!(ssl, "connection should be encrypted");
}

#[tokio::test]
#[ignore] // Requires Postgres running with TLS
async fn test_concurrent_first_use_shares_client() {
    let db = Arc::new(
        ConnectionFactory::from_process_env()
            .initialize()
            .expect("initialize"),
    );

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.connect().await.expect("connect") })
        })
        .collect();

    let mut clients = Vec::new();
    for task in tasks {
        clients.push(task.await.expect("task panicked"));
    }
    for client in &clients[1..] {
        assert!(Arc::ptr_eq(&clients[0], client));
    }
}

#[tokio::test]
#[ignore] // Requires Postgres running with TLS
async fn test_verify_full_rejects_self_signed() {
    // Only meaningful when the server uses a self-signed certificate.
    let mut config = ConnectionFactory::from_process_env()
        .load_config()
        .expect("config");
    config.tls.mode = SslMode::VerifyFull;

    let db = ConnectionFactory::build(config).expect("build");
    let result = db.ping().await;
    assert!(result.is_err(), "self-signed certificate should be rejected");
}

#[tokio::test]
#[ignore] // Requires Postgres running
async fn test_log_queries_enabled() {
    let config = ConnectionConfig {
        log_queries: true,
        ..ConnectionFactory::from_process_env()
            .load_config()
            .expect("config")
    };

    let db = ConnectionFactory::build(config).expect("build");
    assert!(db.logs_queries());
    db.ping().await.expect("ping");
}

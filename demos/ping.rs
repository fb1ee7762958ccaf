//! Connect with the environment configuration and run `SELECT version()`.
//!
//! ```bash
//! DB_HOST=localhost DB_PORT=5432 DB_NAME=postgres DB_USER=postgres DB_PASSWORD=secret \
//!   RUST_LOG=pg_bootstrap=debug cargo run --example ping
//! ```

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> pg_bootstrap::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    pg_bootstrap::load_dotenv()?;
    let db = pg_bootstrap::initialize()?;

    tracing::info!(
        dialect = %db.dialect(),
        tls = db.tls_enabled(),
        verify = db.verifies_certificates(),
        "handle ready"
    );

    let row = db.query_one("SELECT version()", &[]).await?;
    let version: String = row.get(0);
    println!("{}", version);

    pg_bootstrap::shutdown().await;
    Ok(())
}

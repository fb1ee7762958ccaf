//! pg-bootstrap: environment-driven Postgres connection bootstrap
//!
//! Reads `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_HOST` and `DB_PORT`,
//! builds a single Postgres client handle that requires TLS (without
//! validating the server certificate) and keeps statement logging off, and
//! exposes it as a process-wide shared handle.
//!
//! Building the handle opens no connection; the first query does.
//!
//! ```no_run
//! # async fn example() -> pg_bootstrap::Result<()> {
//! pg_bootstrap::load_dotenv()?;
//! let db = pg_bootstrap::initialize()?;
//!
//! let rows = db.query("SELECT now()", &[]).await?;
//! assert_eq!(rows.len(), 1);
//!
//! pg_bootstrap::shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod error;
pub mod factory;
pub mod metrics;

pub use bootstrap::{
    initialize, initialize_with, load_dotenv, load_dotenv_from, shared, shutdown,
};
pub use config::{ConnectionConfig, ConnectionParams, Dialect, EnvSource, ProcessEnv, Secret};
pub use connection::{Database, HandleState, SslMode, TlsOptions};
pub use error::{Error, Result};
pub use factory::ConnectionFactory;

/// Re-export of the wrapped client for row and parameter types
pub use tokio_postgres;

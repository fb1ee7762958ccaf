//! Shared database handle

use super::state::HandleState;
use super::TlsConfig;
use crate::config::{ConnectionConfig, ConnectionParams, Dialect};
use crate::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row, SimpleQueryMessage};
use tracing::Instrument;

/// Target for statement logging when `log_queries` is enabled
const QUERY_LOG_TARGET: &str = "pg_bootstrap::query";

/// A configured Postgres client handle.
///
/// Building a handle performs no I/O. The first operation that needs the
/// server opens the connection; if the server later drops it, the next
/// operation reconnects. Share it as `Arc<Database>`.
pub struct Database {
    config: ConnectionConfig,
    tls: Option<TlsConfig>,
    inner: Mutex<Inner>,
    connect_gate: tokio::sync::Mutex<()>,
}

struct Inner {
    state: HandleState,
    client: Option<Arc<Client>>,
}

impl Database {
    /// Build a handle from configuration.
    ///
    /// # Errors
    ///
    /// Fails only if the TLS configuration cannot be compiled (unreadable or
    /// empty CA file). Missing hosts or credentials surface on connect.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let tls = config.tls.to_tls_config()?;

        tracing::debug!(
            url = %config.redacted_url(),
            dialect = %config.dialect,
            log_queries = config.log_queries,
            "database handle configured"
        );

        Ok(Self {
            config,
            tls,
            inner: Mutex::new(Inner {
                state: HandleState::Configured,
                client: None,
            }),
            connect_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Configuration the handle was built from
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// SQL dialect
    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /// Recorded connection parameters (no password)
    pub fn params(&self) -> ConnectionParams {
        self.config.params()
    }

    /// Whether connections negotiate TLS
    pub fn tls_enabled(&self) -> bool {
        self.config.tls.enabled()
    }

    /// Whether the server certificate is validated
    pub fn verifies_certificates(&self) -> bool {
        self.config.tls.verifies_certificates()
    }

    /// Whether statements are logged
    pub fn logs_queries(&self) -> bool {
        self.config.log_queries
    }

    /// Current lifecycle state
    pub async fn state(&self) -> HandleState {
        self.inner().state
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live client, if any. A client the server has closed is dropped here.
    fn current_client(&self) -> Result<Option<Arc<Client>>> {
        let mut inner = self.inner();

        if !inner.state.is_open() {
            return Err(closed_error(inner.state));
        }

        if let Some(client) = inner.client.as_ref().filter(|c| !c.is_closed()) {
            return Ok(Some(client.clone()));
        }

        if inner.client.take().is_some() {
            tracing::warn!("connection closed by server, reconnecting");
            crate::metrics::counters::disconnected();
            inner.state.transition(HandleState::Disconnected)?;
        }

        Ok(None)
    }

    /// Return the live client, connecting first if needed.
    ///
    /// Concurrent callers share one connection attempt. `close()` does not
    /// wait for an attempt in flight; a client that arrives after the handle
    /// was closed is discarded.
    pub async fn connect(&self) -> Result<Arc<Client>> {
        if let Some(client) = self.current_client()? {
            return Ok(client);
        }

        let _attempt = self.connect_gate.lock().await;

        // Another caller may have connected while we waited.
        if let Some(client) = self.current_client()? {
            return Ok(client);
        }

        let client = Arc::new(self.establish().await?);

        let mut inner = self.inner();
        if !inner.state.is_open() {
            tracing::debug!("handle closed during connect, discarding client");
            return Err(closed_error(inner.state));
        }
        inner.state.transition(HandleState::Connected)?;
        inner.client = Some(client.clone());
        Ok(client)
    }

    async fn establish(&self) -> Result<Client> {
        let sslmode = self.config.tls.mode.to_string();
        let pg_config = self.config.to_pg_config();

        async {
            let start = Instant::now();
            crate::metrics::counters::connect_attempted(&sslmode);

            let result = match &self.tls {
                Some(tls) => pg_config
                    .connect(tls.make_tls_connect())
                    .await
                    .map(|(client, connection)| {
                        tokio::spawn(async move {
                            if let Err(e) = connection.await {
                                tracing::warn!(error = %e, "connection terminated with error");
                            }
                        });
                        client
                    }),
                None => pg_config.connect(NoTls).await.map(|(client, connection)| {
                    tokio::spawn(async move {
                        if let Err(e) = connection.await {
                            tracing::warn!(error = %e, "connection terminated with error");
                        }
                    });
                    client
                }),
            };

            match result {
                Ok(client) => {
                    crate::metrics::counters::connect_succeeded(&sslmode);
                    crate::metrics::histograms::connect_duration(
                        &sslmode,
                        start.elapsed().as_millis() as u64,
                    );
                    tracing::info!("connected");
                    Ok(client)
                }
                Err(e) => {
                    crate::metrics::counters::connect_failed(&sslmode);
                    tracing::debug!(error = %e, "connect failed");
                    Err(Error::Postgres(e))
                }
            }
        }
        .instrument(tracing::info_span!(
            "connect",
            host = %self.config.host,
            database = %self.config.database,
            sslmode = %sslmode
        ))
        .await
    }

    fn log_statement(&self, sql: &str) {
        if self.config.log_queries {
            tracing::debug!(target: QUERY_LOG_TARGET, sql = %sql, "executing statement");
        }
    }

    /// Run a statement and return its rows
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        let client = self.connect().await?;
        self.log_statement(sql);
        let result = client.query(sql, params).await;
        crate::metrics::counters::statement(crate::metrics::labels::KIND_QUERY, result.is_ok());
        Ok(result?)
    }

    /// Run a statement that returns exactly one row
    pub async fn query_one(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row> {
        let client = self.connect().await?;
        self.log_statement(sql);
        let result = client.query_one(sql, params).await;
        crate::metrics::counters::statement(crate::metrics::labels::KIND_QUERY, result.is_ok());
        Ok(result?)
    }

    /// Run a statement and return the number of affected rows
    pub async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64> {
        let client = self.connect().await?;
        self.log_statement(sql);
        let result = client.execute(sql, params).await;
        crate::metrics::counters::statement(crate::metrics::labels::KIND_EXECUTE, result.is_ok());
        Ok(result?)
    }

    /// Run one or more statements over the simple query protocol
    pub async fn simple_query(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>> {
        let client = self.connect().await?;
        self.log_statement(sql);
        let result = client.simple_query(sql).await;
        crate::metrics::counters::statement(crate::metrics::labels::KIND_SIMPLE, result.is_ok());
        Ok(result?)
    }

    /// Round-trip `SELECT 1`
    pub async fn ping(&self) -> Result<()> {
        self.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Close the handle. Later operations fail with `InvalidState`.
    ///
    /// This stops new use of the handle. Clients already returned by
    /// [`connect`](Self::connect) stay usable until their holders drop them;
    /// the connection ends when the last one is dropped.
    pub async fn close(&self) {
        let mut inner = self.inner();
        if inner.state == HandleState::Closed {
            return;
        }
        inner.client = None;
        let _ = inner.state.transition(HandleState::Closed);
        tracing::info!("database handle closed");
    }
}

fn closed_error(state: HandleState) -> Error {
    Error::InvalidState {
        expected: "open handle".into(),
        actual: state.to_string(),
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

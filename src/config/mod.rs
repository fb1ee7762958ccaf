//! Connection configuration
//!
//! This module handles:
//! * The `ConnectionConfig` value and its builder
//! * Reading configuration from the environment (`env`)
//! * `postgres://` connection strings (`connection_string`)

mod connection_string;
mod env;

pub use env::{
    EnvSource, ProcessEnv, DB_HOST, DB_NAME, DB_PASSWORD, DB_PORT, DB_USER,
};

use crate::connection::{SslMode, TlsOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SQL dialect of the target server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL
    #[default]
    Postgres,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// A secret string. `Debug` and `Display` never print the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying value
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Non-secret connection parameters recorded on a handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database name
    pub name: String,
    /// Username
    pub user: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: Option<u16>,
}

/// Connection configuration
///
/// Values are carried as given: empty strings and a missing port are not
/// rejected here. The wrapped client reports them when a connection is
/// attempted.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Database name
    pub database: String,
    /// Username
    pub user: String,
    /// Password
    pub password: Secret,
    /// Server host
    pub host: String,
    /// Server port (None = client default)
    pub port: Option<u16>,
    /// SQL dialect
    pub dialect: Dialect,
    /// TLS negotiation and certificate policy
    pub tls: TlsOptions,
    /// Emit every statement at debug level
    pub log_queries: bool,
    /// TCP connection timeout
    pub connect_timeout: Option<Duration>,
    /// Application name for Postgres logs
    pub application_name: Option<String>,
}

impl ConnectionConfig {
    /// Create new configuration with defaults
    ///
    /// # Defaults
    ///
    /// - `tls`: `verify-full` with system roots
    /// - `log_queries`: false
    /// - `port`, `connect_timeout`, `application_name`: None
    pub fn new(database: impl Into<String>, user: impl Into<String>) -> Self {
        Self::builder(database, user).build()
    }

    /// Create a builder for advanced configuration
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = ConnectionConfig::builder("mydb", "user")
    ///     .host("db.internal")
    ///     .port(5432)
    ///     .tls(TlsOptions::require_unverified())
    ///     .build();
    /// ```
    pub fn builder(
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            database: database.into(),
            user: user.into(),
            password: Secret::default(),
            host: String::new(),
            port: None,
            tls: TlsOptions::default(),
            log_queries: false,
            connect_timeout: None,
            application_name: None,
        }
    }

    /// The parameters worth recording, without the password
    pub fn params(&self) -> ConnectionParams {
        ConnectionParams {
            name: self.database.clone(),
            user: self.user.clone(),
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Translate into the wrapped client's configuration.
    ///
    /// Empty strings are left unset so the client reports them as missing.
    pub(crate) fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut pg = tokio_postgres::Config::new();

        if !self.host.is_empty() {
            pg.host(&self.host);
        }
        if let Some(port) = self.port {
            pg.port(port);
        }
        if !self.user.is_empty() {
            pg.user(&self.user);
        }
        if !self.password.is_empty() {
            pg.password(self.password.expose());
        }
        if !self.database.is_empty() {
            pg.dbname(&self.database);
        }
        if let Some(timeout) = self.connect_timeout {
            pg.connect_timeout(timeout);
        }
        if let Some(ref name) = self.application_name {
            pg.application_name(name);
        }

        pg.ssl_mode(self.tls.mode.to_pg());
        pg
    }
}

/// Builder for creating `ConnectionConfig`
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    database: String,
    user: String,
    password: Secret,
    host: String,
    port: Option<u16>,
    tls: TlsOptions,
    log_queries: bool,
    connect_timeout: Option<Duration>,
    application_name: Option<String>,
}

impl ConnectionConfigBuilder {
    /// Set the password
    pub fn password(mut self, password: impl Into<Secret>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set TLS options
    ///
    /// Default: `verify-full`
    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Set SSL/TLS mode, keeping any configured CA path
    pub fn sslmode(mut self, mode: SslMode) -> Self {
        self.tls.mode = mode;
        self
    }

    /// Log every statement at debug level
    ///
    /// Default: false
    pub fn log_queries(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    /// Set TCP connection timeout
    ///
    /// Default: None (no timeout)
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set application name for Postgres logs
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConnectionConfig {
        ConnectionConfig {
            database: self.database,
            user: self.user,
            password: self.password,
            host: self.host,
            port: self.port,
            dialect: Dialect::Postgres,
            tls: self.tls,
            log_queries: self.log_queries,
            connect_timeout: self.connect_timeout,
            application_name: self.application_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_defaults() {
        let config = ConnectionConfig::new("db", "user");

        assert_eq!(config.dialect, Dialect::Postgres);
        assert!(config.host.is_empty());
        assert!(config.port.is_none());
        assert!(config.password.is_empty());
        assert!(!config.log_queries);
        assert!(config.connect_timeout.is_none());
        assert!(config.application_name.is_none());
        assert_eq!(config.tls.mode, SslMode::VerifyFull);
    }

    #[test]
    fn test_connection_config_builder_fluent() {
        let config = ConnectionConfig::builder("mydb", "myuser")
            .password("secret")
            .host("db.internal")
            .port(6432)
            .sslmode(SslMode::Require)
            .log_queries(true)
            .connect_timeout(Duration::from_secs(5))
            .application_name("test_app")
            .build();

        assert_eq!(config.database, "mydb");
        assert_eq!(config.user, "myuser");
        assert_eq!(config.password.expose(), "secret");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, Some(6432));
        assert_eq!(config.tls.mode, SslMode::Require);
        assert!(config.log_queries);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.application_name, Some("test_app".to_string()));
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = ConnectionConfig::builder("mydb", "myuser")
            .password("hunter2")
            .build();

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("Secret(***)"));
        assert_eq!(config.password.to_string(), "***");
    }

    #[test]
    fn test_params_exclude_password() {
        let config = ConnectionConfig::builder("testdb", "u")
            .password("p")
            .host("localhost")
            .port(5432)
            .build();

        let json = serde_json::to_value(config.params()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "testdb",
                "user": "u",
                "host": "localhost",
                "port": 5432
            })
        );
    }

    #[test]
    fn test_dialect_display_and_serde() {
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(
            serde_json::to_string(&Dialect::Postgres).unwrap(),
            "\"postgres\""
        );
    }

    #[test]
    fn test_to_pg_config() {
        let config = ConnectionConfig::builder("mydb", "myuser")
            .password("secret")
            .host("localhost")
            .port(5433)
            .sslmode(SslMode::Require)
            .application_name("svc")
            .build();

        let pg = config.to_pg_config();
        assert_eq!(pg.get_user(), Some("myuser"));
        assert_eq!(pg.get_dbname(), Some("mydb"));
        assert_eq!(pg.get_password(), Some(&b"secret"[..]));
        assert_eq!(pg.get_ports(), &[5433]);
        assert_eq!(pg.get_application_name(), Some("svc"));
        assert_eq!(pg.get_ssl_mode(), tokio_postgres::config::SslMode::Require);
    }

    #[test]
    fn test_to_pg_config_leaves_empty_values_unset() {
        let config = ConnectionConfig::new("", "");

        let pg = config.to_pg_config();
        assert!(pg.get_hosts().is_empty());
        assert!(pg.get_ports().is_empty());
        assert_eq!(pg.get_user(), None);
        assert_eq!(pg.get_dbname(), None);
        assert_eq!(pg.get_password(), None);
    }
}

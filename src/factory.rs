//! Builds database handles from configuration

use crate::config::{ConnectionConfig, EnvSource, ProcessEnv};
use crate::connection::Database;
use crate::Result;

/// Produces [`Database`] handles from an environment source.
///
/// # Examples
///
/// ```no_run
/// # fn example() -> pg_bootstrap::Result<()> {
/// use pg_bootstrap::ConnectionFactory;
///
/// let db = ConnectionFactory::from_process_env().initialize()?;
/// assert!(db.tls_enabled());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionFactory<E = ProcessEnv> {
    env: E,
}

impl ConnectionFactory<ProcessEnv> {
    /// Factory over the process environment
    pub fn from_process_env() -> Self {
        Self { env: ProcessEnv }
    }

    /// Build a handle from explicit configuration, without reading any environment
    pub fn build(config: ConnectionConfig) -> Result<Database> {
        Database::new(config)
    }
}

impl<E: EnvSource> ConnectionFactory<E> {
    /// Factory over an arbitrary environment source
    pub fn with_env(env: E) -> Self {
        Self { env }
    }

    /// Read the connection configuration without building a handle
    pub fn load_config(&self) -> Result<ConnectionConfig> {
        ConnectionConfig::from_env_source(&self.env)
    }

    /// Read the environment and build a handle. No connection is opened.
    pub fn initialize(&self) -> Result<Database> {
        let config = self.load_config()?;
        Database::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dialect, DB_HOST, DB_NAME, DB_PASSWORD, DB_PORT, DB_USER};
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            (DB_NAME, "testdb"),
            (DB_USER, "u"),
            (DB_PASSWORD, "p"),
            (DB_HOST, "localhost"),
            (DB_PORT, "5432"),
        ])
    }

    #[test]
    fn test_initialize_postgres_dialect() {
        let db = ConnectionFactory::with_env(full_env()).initialize().unwrap();
        assert_eq!(db.dialect(), Dialect::Postgres);
    }

    #[test]
    fn test_initialize_recorded_params() {
        let db = ConnectionFactory::with_env(full_env()).initialize().unwrap();

        assert_eq!(
            serde_json::to_value(db.params()).unwrap(),
            serde_json::json!({
                "name": "testdb",
                "user": "u",
                "host": "localhost",
                "port": 5432
            })
        );
        assert_eq!(db.config().password.expose(), "p");
    }

    #[test]
    fn test_tls_and_logging_fixed_regardless_of_env() {
        let cases = [
            full_env(),
            HashMap::new(),
            env(&[(DB_HOST, "db.example.com"), (DB_PORT, "1")]),
            env(&[("DB_SSLMODE", "verify-full"), ("RUST_LOG", "trace")]),
        ];

        for vars in cases {
            let db = ConnectionFactory::with_env(vars).initialize().unwrap();
            assert!(db.tls_enabled());
            assert!(!db.verifies_certificates());
            assert!(!db.logs_queries());
        }
    }

    #[test]
    fn test_missing_host_does_not_fail_locally() {
        let mut vars = full_env();
        vars.remove(DB_HOST);

        let db = ConnectionFactory::with_env(vars).initialize().unwrap();
        assert_eq!(db.params().host, "");
    }

    #[test]
    fn test_malformed_port_fails_construction() {
        let mut vars = full_env();
        vars.insert(DB_PORT.to_string(), "postgres".to_string());

        let result = ConnectionFactory::with_env(vars).initialize();
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_build_is_pure() {
        let config = ConnectionConfig::builder("db", "user")
            .host("localhost")
            .log_queries(true)
            .build();
        let db = ConnectionFactory::build(config).unwrap();
        assert!(db.logs_queries());
        assert!(db.verifies_certificates());
    }
}

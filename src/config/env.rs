//! Environment-sourced configuration

use super::{ConnectionConfig, Secret};
use crate::connection::TlsOptions;
use crate::{Error, Result};
use std::collections::HashMap;

/// Target database name
pub const DB_NAME: &str = "DB_NAME";
/// Authentication user
pub const DB_USER: &str = "DB_USER";
/// Authentication secret
pub const DB_PASSWORD: &str = "DB_PASSWORD";
/// Server hostname or address
pub const DB_HOST: &str = "DB_HOST";
/// Server port
pub const DB_PORT: &str = "DB_PORT";

/// Source of configuration variables.
///
/// Lets configuration be read from something other than the process
/// environment, e.g. a map in tests.
pub trait EnvSource {
    /// Value of `key`, or `None` if unset
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<E: EnvSource + ?Sized> EnvSource for &E {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

impl ConnectionConfig {
    /// Read `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_HOST` and `DB_PORT`.
    ///
    /// Missing variables become empty values (no port) and are passed through.
    /// A `DB_PORT` that is present but not a port number is rejected.
    ///
    /// The TLS and logging settings are not read from the environment: TLS
    /// is required without certificate validation and query logging is off.
    pub fn from_env_source<E: EnvSource>(env: &E) -> Result<Self> {
        let port = match env.var(DB_PORT) {
            Some(raw) if !raw.trim().is_empty() => Some(parse_port(&raw)?),
            _ => None,
        };

        Ok(ConnectionConfig {
            database: env.var(DB_NAME).unwrap_or_default(),
            user: env.var(DB_USER).unwrap_or_default(),
            password: Secret::new(env.var(DB_PASSWORD).unwrap_or_default()),
            host: env.var(DB_HOST).unwrap_or_default(),
            port,
            tls: TlsOptions::require_unverified(),
            log_queries: false,
            ..ConnectionConfig::new("", "")
        })
    }

    /// [`from_env_source`](Self::from_env_source) over the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_source(&ProcessEnv)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim().parse::<u16>().map_err(|_| {
        Error::Config(format!(
            "invalid {} '{}': expected a port number between 0 and 65535",
            DB_PORT, raw
        ))
    })
}

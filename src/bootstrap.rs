//! Process-wide database handle
//!
//! The first successful [`initialize`] installs a handle that every later
//! call (and [`shared`]) returns. Code that can take the handle as a
//! parameter should do so; the shared slot exists for call sites that can't.

use crate::config::{EnvSource, ProcessEnv};
use crate::connection::Database;
use crate::factory::ConnectionFactory;
use crate::{Error, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};

static DATABASE: OnceLock<Arc<Database>> = OnceLock::new();

/// Load variables from `.env` in the current directory or its parents.
///
/// Variables already present in the process environment win. A missing
/// file is fine; a file that cannot be parsed is a configuration error.
pub fn load_dotenv() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(e) => dotenv_result(e),
    }
}

/// Like [`load_dotenv`], reading the file at `path`.
pub fn load_dotenv_from(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match dotenvy::from_path(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            Ok(())
        }
        Err(e) => dotenv_result(e),
    }
}

fn dotenv_result(e: dotenvy::Error) -> Result<()> {
    if e.not_found() {
        return Ok(());
    }
    Err(Error::Config(format!("failed to load .env: {}", e)))
}

/// Build the shared handle from the process environment, or return the one
/// already installed.
pub fn initialize() -> Result<Arc<Database>> {
    initialize_with(ProcessEnv)
}

/// Like [`initialize`], reading configuration from `env`.
///
/// Once a handle is installed, `env` is not consulted again.
pub fn initialize_with<E: EnvSource>(env: E) -> Result<Arc<Database>> {
    if let Some(db) = DATABASE.get() {
        return Ok(db.clone());
    }

    let db = Arc::new(ConnectionFactory::with_env(env).initialize()?);

    // A concurrent initializer may have won; everyone gets the installed one.
    let installed = DATABASE.get_or_init(|| db);
    tracing::info!(
        url = %installed.config().redacted_url(),
        "shared database handle ready"
    );
    Ok(installed.clone())
}

/// The shared handle, if [`initialize`] has succeeded
pub fn shared() -> Option<Arc<Database>> {
    DATABASE.get().cloned()
}

/// Close the shared handle. Safe to call more than once.
pub async fn shutdown() {
    if let Some(db) = DATABASE.get() {
        db.close().await;
    }
}

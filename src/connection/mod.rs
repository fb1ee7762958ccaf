//! Connection management
//!
//! This module handles:
//! * TLS configuration for the wrapped client
//! * The shared `Database` handle and its lazy connection
//! * Handle lifecycle state machine

mod handle;
mod state;
mod tls;

pub use handle::Database;
pub use state::HandleState;
pub use tls::{SslMode, TlsConfig, TlsConfigBuilder, TlsOptions};

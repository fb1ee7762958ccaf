//! Metric names and label values

/// Connection attempts
pub const CONNECT_ATTEMPTS: &str = "pg_bootstrap_connect_attempts_total";
/// Connections established
pub const CONNECT_SUCCESS: &str = "pg_bootstrap_connect_success_total";
/// Failed connection attempts
pub const CONNECT_FAILURES: &str = "pg_bootstrap_connect_failures_total";
/// Connections lost after being established
pub const DISCONNECTS: &str = "pg_bootstrap_disconnects_total";
/// Statements sent through the handle
pub const STATEMENTS: &str = "pg_bootstrap_statements_total";
/// Time to establish a connection
pub const CONNECT_DURATION: &str = "pg_bootstrap_connect_duration_ms";

/// Label key for TLS mode
pub const TLS_MODE: &str = "sslmode";
/// Label key for outcome
pub const STATUS: &str = "status";
/// Label key for statement kind
pub const KIND: &str = "kind";

/// Outcome: success
pub const STATUS_OK: &str = "ok";
/// Outcome: error
pub const STATUS_ERROR: &str = "error";

/// Extended-protocol query returning rows
pub const KIND_QUERY: &str = "query";
/// Extended-protocol statement returning a row count
pub const KIND_EXECUTE: &str = "execute";
/// Simple-protocol query
pub const KIND_SIMPLE: &str = "simple";

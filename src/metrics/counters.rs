//! Counter metrics

use super::labels;

/// Record a connection attempt
pub fn connect_attempted(sslmode: &str) {
    metrics::counter!(labels::CONNECT_ATTEMPTS, labels::TLS_MODE => sslmode.to_string())
        .increment(1);
}

/// Record an established connection
pub fn connect_succeeded(sslmode: &str) {
    metrics::counter!(labels::CONNECT_SUCCESS, labels::TLS_MODE => sslmode.to_string())
        .increment(1);
}

/// Record a failed connection attempt
pub fn connect_failed(sslmode: &str) {
    metrics::counter!(labels::CONNECT_FAILURES, labels::TLS_MODE => sslmode.to_string())
        .increment(1);
}

/// Record a connection found closed by the server
pub fn disconnected() {
    metrics::counter!(labels::DISCONNECTS).increment(1);
}

/// Record a statement and its outcome
pub fn statement(kind: &'static str, ok: bool) {
    let status = if ok {
        labels::STATUS_OK
    } else {
        labels::STATUS_ERROR
    };
    metrics::counter!(labels::STATEMENTS, labels::KIND => kind, labels::STATUS => status)
        .increment(1);
}

//! Histogram metrics

use super::labels;

/// Record how long establishing a connection took
pub fn connect_duration(sslmode: &str, duration_ms: u64) {
    metrics::histogram!(labels::CONNECT_DURATION, labels::TLS_MODE => sslmode.to_string())
        .record(duration_ms as f64);
}

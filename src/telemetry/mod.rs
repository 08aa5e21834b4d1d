//! Logging and metrics setup

pub mod logging;
pub mod prometheus;

pub use logging::{init_tracing, LogGuard};
pub use prometheus::{install_prometheus, PrometheusMetrics};

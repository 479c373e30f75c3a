//! Lightweight helpers for relay telemetry.
//! Provides subscriber bootstrap, span utilities, and metric recorders
//! built on top of `tracing` and the `metrics` facade.

mod config;
mod context;
mod metrics;
mod tracing_init;

pub use config::{LogFormat, TelemetryConfig};
pub use context::TelemetryLabels;
pub use self::metrics::{record_counter, record_histogram};
pub use tracing_init::{TelemetryGuard, init_telemetry, redact, with_common_fields};

/// Installs the shared subscriber using configuration read from the environment.
pub fn install(service_name: &str, service_version: &str) -> anyhow::Result<TelemetryGuard> {
    init_telemetry(TelemetryConfig::from_env(service_name, service_version))
}

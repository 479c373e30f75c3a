use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::Span;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogFormat, TelemetryConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

static INIT: OnceLock<()> = OnceLock::new();

/// Keeps the background log writer alive; drop it only at process exit.
#[must_use]
#[derive(Default)]
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

pub fn init_telemetry(cfg: TelemetryConfig) -> Result<TelemetryGuard> {
    if INIT.get().is_some() {
        return Ok(TelemetryGuard::default());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.default_filter.clone()));

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(cfg.format)];
    let mut guard = TelemetryGuard::default();

    if let Some(dir) = cfg.log_dir.as_ref() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create log directory {}", dir.display()))?;
        let appender = tracing_appender::rolling::daily(dir, cfg.log_file_prefix());
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
        guard._file = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .ok();

    INIT.set(()).ok();
    tracing::info!(
        service = %cfg.service_name,
        version = %cfg.service_version,
        environment = %cfg.environment,
        "telemetry initialised"
    );
    Ok(guard)
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    }
}

pub fn with_common_fields(
    span: &Span,
    service: &str,
    chat_id: Option<&str>,
    event_id: Option<&str>,
) {
    span.record("service", tracing::field::display(service));
    if let Some(chat_id) = chat_id {
        span.record("chat_id", tracing::field::display(chat_id));
    }
    if let Some(event_id) = event_id {
        span.record("event_id", tracing::field::display(event_id));
    }
}

/// Shortens a credential to a prefix that is safe to log.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(5).collect();
    if prefix.is_empty() {
        "<unset>".into()
    } else {
        format!("{prefix}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_short_prefix() {
        assert_eq!(redact("ntn_3589353185215"), "ntn_3...");
        assert_eq!(redact("abc"), "abc...");
        assert_eq!(redact(""), "<unset>");
    }

    #[test]
    fn init_is_idempotent_and_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let cfg = TelemetryConfig {
            service_name: "telemetry-test".into(),
            service_version: "0.0.0".into(),
            environment: "test".into(),
            format: LogFormat::Text,
            default_filter: "info".into(),
            log_dir: Some(log_dir.clone()),
        };
        let _first = init_telemetry(cfg.clone()).expect("first init");
        assert!(log_dir.exists());
        let _second = init_telemetry(cfg).expect("second init is a no-op");
    }
}

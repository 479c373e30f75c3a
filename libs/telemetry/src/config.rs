use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    pub format: LogFormat,
    pub default_filter: String,
    /// When set, a daily-rolling log file is written next to stdout output.
    pub log_dir: Option<PathBuf>,
}

impl TelemetryConfig {
    pub fn from_env(default_service_name: &str, default_service_version: &str) -> Self {
        Self::from_lookup(default_service_name, default_service_version, |key| {
            env::var(key).ok()
        })
    }

    pub fn from_lookup<F>(
        default_service_name: &str,
        default_service_version: &str,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = lookup("SERVICE_NAME")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| default_service_name.to_string());
        let environment = lookup("DEPLOYMENT_ENV").unwrap_or_else(|| "dev".into());
        let format = lookup("LOG_FORMAT")
            .map(|v| parse_format(&v))
            .unwrap_or(LogFormat::Json);
        let default_filter = lookup("LOG_LEVEL").unwrap_or_else(|| "info".into());
        let log_dir = lookup("LOG_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            service_name,
            service_version: default_service_version.to_string(),
            environment,
            format,
            default_filter,
            log_dir,
        }
    }

    pub fn log_file_prefix(&self) -> String {
        format!("{}.log", self.service_name)
    }
}

fn parse_format(value: &str) -> LogFormat {
    match value.to_lowercase().as_str() {
        "text" | "pretty" | "plain" => LogFormat::Text,
        _ => LogFormat::Json,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_json_and_info() {
        let cfg = TelemetryConfig::from_lookup("notion-webhook", "0.1.0", lookup_from(&[]));
        assert_eq!(cfg.service_name, "notion-webhook");
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.default_filter, "info");
        assert_eq!(cfg.environment, "dev");
        assert!(cfg.log_dir.is_none());
    }

    #[test]
    fn reads_text_format_and_log_dir() {
        let cfg = TelemetryConfig::from_lookup(
            "relay-bot",
            "0.1.0",
            lookup_from(&[("LOG_FORMAT", "Pretty"), ("LOG_DIR", "/var/log/relay")]),
        );
        assert_eq!(cfg.format, LogFormat::Text);
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/var/log/relay")));
        assert_eq!(cfg.log_file_prefix(), "relay-bot.log");
    }
}

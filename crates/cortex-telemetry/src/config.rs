//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logs, traces and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and logs
    pub service_name: String,

    /// Worker process identifier, appended to the service name when set
    pub worker_id: Option<String>,

    /// Whether spans are exported over OTLP
    pub otlp_enabled: bool,

    /// OpenTelemetry OTLP collector endpoint
    pub otlp_endpoint: String,

    /// Log level filter (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Port the metrics endpoint is expected on
    pub metrics_port: u16,

    /// Deployment environment (development, staging, production)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cortex-core".to_string(),
            worker_id: None,
            otlp_enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_port: 9100,
            environment: "development".to_string(),
        }
    }
}

fn flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: cortex-core)
    /// - `CX_WORKER_ID`: Worker identifier (default: none)
    /// - `CX_OTLP_ENABLED`: Export spans over OTLP (default: false)
    /// - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint (default: http://localhost:4317)
    /// - `CX_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CX_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `CX_METRICS_PORT`: Prometheus metrics port (default: 9100)
    /// - `CX_ENVIRONMENT`: Deployment environment (default: development)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();
        let defaults = Self::default();

        Self {
            service_name: env::var("OTEL_SERVICE_NAME").unwrap_or(defaults.service_name),

            worker_id: env::var("CX_WORKER_ID").ok().filter(|id| !id.is_empty()),

            otlp_enabled: env::var("CX_OTLP_ENABLED")
                .map(|v| flag(&v))
                .unwrap_or(false),

            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or(defaults.otlp_endpoint),

            log_level: env::var("CX_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            json_logs: env::var("CX_JSON_LOGS")
                .map(|v| flag(&v))
                .unwrap_or(is_container),

            metrics_port: env::var("CX_METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.metrics_port),

            environment: env::var("CX_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Service name including the worker identifier.
    pub fn full_service_name(&self) -> String {
        match &self.worker_id {
            Some(id) => format!("{}-{}", self.service_name, id),
            None => self.service_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "cortex-core");
        assert_eq!(config.log_level, "info");
        assert!(!config.otlp_enabled);
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "cortex-core");

        config.worker_id = Some("w2".to_string());
        assert_eq!(config.full_service_name(), "cortex-core-w2");
    }

    #[test]
    fn test_flag_parsing() {
        assert!(flag("TRUE"));
        assert!(flag("1"));
        assert!(!flag("yes"));
    }
}

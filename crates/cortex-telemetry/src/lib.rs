//! # Cortex Telemetry
//!
//! Logs, traces and metrics for the consistency core workers.
//!
//! ## Components
//!
//! - Structured logs to stdout (pretty in development, JSON in containers)
//! - Optional span export over OTLP
//! - Prometheus collectors recorded by the job handlers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cortex_telemetry::{init_telemetry, TelemetryConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = init_telemetry(TelemetryConfig::from_env()).await;
//!     if let Err(e) = &guard {
//!         eprintln!("telemetry unavailable: {e}");
//!     }
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `cortex-core` | Service name in traces |
//! | `CX_OTLP_ENABLED` | `false` | Export spans over OTLP |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | `http://localhost:4317` | Collector endpoint |
//! | `CX_LOG_LEVEL` | `info` | Log level filter |
//! | `CX_JSON_LOGS` | container-dependent | JSON log output |
//! | `CX_WORKER_ID` | none | Worker identifier |

mod config;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{encode_metrics, CortexMetrics, REGISTRY};
pub use tracing_setup::TracingGuard;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize OpenTelemetry tracer: {0}")]
    TracerInit(String),

    #[error("Prometheus metrics error: {0}")]
    Metrics(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<prometheus::Error> for TelemetryError {
    fn from(e: prometheus::Error) -> Self {
        TelemetryError::Metrics(e.to_string())
    }
}

/// Guard for the telemetry stack. Flushes pending spans on drop.
pub struct TelemetryGuard {
    tracing: TracingGuard,
}

impl TelemetryGuard {
    /// Whether spans are being exported.
    pub fn exporting(&self) -> bool {
        self.tracing.exporting()
    }
}

/// Initialize logging and tracing.
///
/// An unreachable collector is not an error: the subscriber is installed
/// without the export layer and a warning is logged. Errors are returned
/// only when no subscriber could be installed at all.
pub async fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing = tracing_setup::init_tracing(&config).await?;
    Ok(TelemetryGuard { tracing })
}

//! `cortex-worker`: runs the queue consumers and the periodic scheduler.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (failure is reported, never fatal)
//! 2. Load and validate configuration from `CX_*` variables
//! 3. Wire every subsystem
//! 4. Start consumers and the scheduler
//! 5. Drain and stop on Ctrl+C

use std::sync::Arc;

use anyhow::{Context, Result};
use cortex_telemetry::{init_telemetry, TelemetryConfig, REGISTRY};
use shared_types::SystemClock;
use tracing::info;

use worker_runtime::{Platform, PlatformConfig, WorkerRuntime};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = match init_telemetry(TelemetryConfig::from_env()).await {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("telemetry disabled: {e}");
            None
        }
    };

    let config = PlatformConfig::from_env();
    config
        .validate()
        .context("Invalid platform configuration")?;

    let platform = Platform::build(config, Arc::new(SystemClock), REGISTRY.clone())
        .context("Failed to wire platform")?;
    let mut runtime = WorkerRuntime::new(platform);
    runtime.start();

    info!("Worker is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    runtime.shutdown().await;
    drop(telemetry);
    Ok(())
}

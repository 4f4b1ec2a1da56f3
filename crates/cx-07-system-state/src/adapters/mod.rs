//! Adapters for the System State Controller driven ports

pub mod queue_metrics;
pub mod risk_signals;

pub use queue_metrics::{JobQueueMetrics, StaticQueueLoad};
pub use risk_signals::StoreRiskSignals;

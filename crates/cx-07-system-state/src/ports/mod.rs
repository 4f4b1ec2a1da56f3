//! Ports module for the System State Controller

pub mod inbound;
pub mod outbound;

pub use inbound::SystemStateApi;
pub use outbound::{QueueMetricsSource, RiskSignalSource};

//! Driven Ports (SPI - Outbound)
//!
//! Same prediction port and feature construction as the Ranking Processor.

pub use shared_types::{Clock, PredictionProvider};

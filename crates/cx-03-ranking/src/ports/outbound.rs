//! Driven Ports (SPI - Outbound)
//!
//! The processor reads and writes the shared document store directly inside
//! ledger-fenced transactions. Its other dependencies are the shared ports
//! below.

pub use shared_types::{Clock, PredictionProvider};

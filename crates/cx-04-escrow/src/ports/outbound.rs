//! Driven Ports (SPI - Outbound)
//!
//! Balances and transaction records live in the shared document store.
//! The payout freeze reads the platform state through [`SystemStateReader`].

pub use shared_types::{Clock, SystemStateReader};

//! Ports module for the Idempotency Ledger

pub mod inbound;
pub mod outbound;

pub use inbound::IdempotencyLedgerApi;
pub use outbound::FenceWriter;

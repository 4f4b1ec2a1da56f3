//! Ports module for the Escrow Ledger

pub mod inbound;
pub mod outbound;

pub use inbound::EscrowApi;

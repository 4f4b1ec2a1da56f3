//! Ports module for the Integrity Analyzer

pub mod inbound;
pub mod outbound;

pub use inbound::IntegrityApi;

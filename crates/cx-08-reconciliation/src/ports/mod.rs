//! Ports module for the Reconciliation Auditors

pub mod inbound;
pub mod outbound;

pub use inbound::ReconciliationApi;
pub use outbound::CriticalEscalation;

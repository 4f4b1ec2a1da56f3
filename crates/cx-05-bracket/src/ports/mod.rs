//! Ports module for the Bracket Automator

pub mod inbound;
pub mod outbound;

pub use inbound::BracketApi;
pub use outbound::PrizeDisbursement;

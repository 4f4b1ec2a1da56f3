//! Domain module for the Escrow Ledger
//!
//! - limits: pure cap and spend-window checks
//! - receipts: what a movement returns to the caller

pub mod limits;
pub mod receipts;

pub use limits::{cap_payout, check_debit, daily_entry_spend};
pub use receipts::{entry_fee_key, refund_key, CreditReceipt, DebitReceipt, PayoutReceipt};

//! Adapters for the Bracket Automator ports.

pub mod disbursement;
pub mod notifier;

pub use disbursement::{EscrowDisbursement, MockDisbursement};
pub use notifier::RecordingNotifier;

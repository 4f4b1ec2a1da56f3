//! Runtime adapters: outbound ports the subsystems do not ship themselves.

pub mod escrow;
pub mod notifier;
pub mod prediction;

pub use escrow::MeteredEscrow;
pub use notifier::LoggingNotifier;
pub use prediction::HttpPredictor;

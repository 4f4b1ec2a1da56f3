//! # Cortex Worker Runtime
//!
//! The worker process of the consistency core.
//!
//! ## Modular Structure
//!
//! - `config` - platform configuration from defaults and `CX_*` variables
//! - `container` - subsystem wiring in dependency order
//! - `adapters` - prediction HTTP client, logging notifier, metered escrow
//! - `handlers` - one job handler per queue
//! - `intake` - match result confirmation and job dispatch
//! - `scheduler` - repeatable controller, auditor and season jobs
//! - `admin` - operator console
//! - `runtime` - process lifecycle
//!
//! ## Match Flow
//!
//! ```text
//! confirm_match_result ──→ ranking-updates ──────────→ cx-03 ranking
//!                      ├─→ integrity-analysis ───────→ cx-06 integrity
//!                      └─→ tournament-advancement ───→ cx-05 bracket ──→ cx-04 payout
//!
//! scheduler ──→ system-state ──→ cx-07 evaluate, cx-08 audits ──→ forced CRITICAL
//!           └─→ season-rollover ──→ cx-06 season check
//! ```

pub mod adapters;
pub mod admin;
pub mod config;
pub mod container;
pub mod error;
pub mod handlers;
pub mod intake;
pub mod runtime;
pub mod scheduler;

pub use admin::{AdminConsole, ChaosStatus};
pub use config::{ConfigError, PlatformConfig, PredictionSettings, QueueTuning, ScheduledJob};
pub use container::Platform;
pub use error::{RuntimeError, RuntimeResult};
pub use intake::{
    ConfirmedMatch, IntakeError, MatchResultIntake, ResultSubmission, ResultValidationError,
};
pub use runtime::WorkerRuntime;
pub use scheduler::{Scheduler, TickOutcome};

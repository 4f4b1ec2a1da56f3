//! # Cortex Scenario Suite
//!
//! Cross-subsystem tests of the consistency core, driven through the same
//! [`Platform`](worker_runtime::Platform) wiring the worker binary uses.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── harness.rs          # platform on a manual clock, seeding helpers
//!     ├── exactly_once.rs     # duplicate ranking jobs, replayed completions
//!     ├── escrow_guardrails.rs# daily cap, no negative balance, supply conservation
//!     ├── bracket_flow.rs     # 2^n brackets, byes
//!     ├── system_state.rs     # hysteresis, forced critical, write gate
//!     └── worker_pipeline.rs  # running workers end to end
//! ```
//!
//! ```bash
//! cargo test -p cx-tests
//! cargo test -p cx-tests integration::bracket_flow::
//! ```

pub mod integration;

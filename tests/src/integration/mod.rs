//! Cross-subsystem scenarios.

#[cfg(test)]
mod harness;

mod bracket_flow;
mod escrow_guardrails;
mod exactly_once;
mod system_state;
mod worker_pipeline;

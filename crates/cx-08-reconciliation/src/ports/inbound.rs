//! Driving Ports (API - Inbound)

use async_trait::async_trait;

use crate::domain::AuditReport;
use crate::error::ReconciliationResult;

/// Primary Reconciliation API. Every failing run escalates to CRITICAL.
#[async_trait]
pub trait ReconciliationApi: Send + Sync {
    /// Supply conservation, orphans and duplicate bindings.
    async fn run_light(&self) -> ReconciliationResult<AuditReport>;

    /// Light checks over a full scan plus per-user wallet equality.
    async fn run_deep(&self) -> ReconciliationResult<AuditReport>;

    /// Wallets, ratings, participant uniqueness and state freshness.
    async fn validate_invariants(&self) -> ReconciliationResult<AuditReport>;
}

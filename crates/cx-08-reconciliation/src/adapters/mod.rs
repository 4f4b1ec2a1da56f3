//! Escalation adapters

use std::sync::Arc;

use async_trait::async_trait;
use cx_07_system_state::{SystemStateApi, SystemStateError, SystemStateResult};
use parking_lot::Mutex;

use crate::ports::outbound::CriticalEscalation;

/// Escalates through the system state controller.
pub struct ControllerEscalation {
    controller: Arc<dyn SystemStateApi>,
}

impl ControllerEscalation {
    pub fn new(controller: Arc<dyn SystemStateApi>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl CriticalEscalation for ControllerEscalation {
    async fn escalate(
        &self,
        reason: &str,
        source: &str,
        details: Vec<String>,
    ) -> SystemStateResult<()> {
        self.controller
            .force_critical(reason, source, details)
            .await
            .map(|_| ())
    }
}

/// One recorded escalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub reason: String,
    pub source: String,
    pub details: Vec<String>,
}

/// Records escalations instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingEscalation {
    escalations: Mutex<Vec<Escalation>>,
    fail_with: Mutex<Option<SystemStateError>>,
}

impl RecordingEscalation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn escalations(&self) -> Vec<Escalation> {
        self.escalations.lock().clone()
    }

    pub fn set_failure(&self, error: Option<SystemStateError>) {
        *self.fail_with.lock() = error;
    }
}

#[async_trait]
impl CriticalEscalation for RecordingEscalation {
    async fn escalate(
        &self,
        reason: &str,
        source: &str,
        details: Vec<String>,
    ) -> SystemStateResult<()> {
        if let Some(e) = self.fail_with.lock().clone() {
            return Err(e);
        }
        self.escalations.lock().push(Escalation {
            reason: reason.to_string(),
            source: source.to_string(),
            details,
        });
        Ok(())
    }
}

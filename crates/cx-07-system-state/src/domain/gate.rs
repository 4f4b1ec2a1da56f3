//! Request gating rules for the write gate.

use serde::{Deserialize, Serialize};
use shared_types::{Role, SystemStateKind};
use thiserror::Error;

/// Whether a request reads or mutates platform data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
}

/// The parts of an incoming request the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRequest {
    pub access: Access,
    pub path: String,
    /// `None` for anonymous callers.
    pub role: Option<Role>,
}

impl GateRequest {
    pub fn read(path: impl Into<String>) -> Self {
        Self {
            access: Access::Read,
            path: path.into(),
            role: None,
        }
    }

    pub fn write(path: impl Into<String>, role: Option<Role>) -> Self {
        Self {
            access: Access::Write,
            path: path.into(),
            role,
        }
    }

    fn is_exempt(&self) -> bool {
        self.role == Some(Role::Admin) || self.path.contains("/login")
    }
}

/// Reason-bearing rejection of a mutation (a 503 at the HTTP layer).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message} ({reason})")]
pub struct GateRejection {
    /// `SYSTEM_DEGRADED` or `SYSTEM_CRITICAL`.
    pub code: String,
    /// Reason recorded with the current state.
    pub reason: String,
    pub message: String,
}

/// Decide a request against the current state.
pub fn evaluate_request(
    state: SystemStateKind,
    reason: &str,
    request: &GateRequest,
) -> Result<(), GateRejection> {
    if request.access == Access::Read || request.is_exempt() {
        return Ok(());
    }
    let message = match state {
        SystemStateKind::Normal => return Ok(()),
        SystemStateKind::Degraded => {
            "Platform is operating in DEGRADED mode. Write operations are temporarily disabled \
             to protect financial and competitive integrity."
        }
        SystemStateKind::Critical => {
            "Platform is in CRITICAL maintenance mode. All write operations are temporarily \
             disabled to prevent data corruption."
        }
    };
    Err(GateRejection {
        code: format!("SYSTEM_{}", state.as_str()),
        reason: reason.to_string(),
        message: message.to_string(),
    })
}

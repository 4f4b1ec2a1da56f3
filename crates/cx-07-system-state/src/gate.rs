//! Write gate consumed by the request-handling layer.

use std::sync::Arc;

use shared_types::SystemStateReader;
use tracing::debug;

use crate::domain::{evaluate_request, Access, GateRejection, GateRequest};

/// Rejects mutations while the platform is not NORMAL.
///
/// Reads never touch the state store.
pub struct WriteGate {
    reader: Arc<dyn SystemStateReader>,
}

impl WriteGate {
    pub fn new(reader: Arc<dyn SystemStateReader>) -> Self {
        Self { reader }
    }

    pub async fn check(&self, request: &GateRequest) -> Result<(), GateRejection> {
        if request.access == Access::Read {
            return Ok(());
        }
        let current = self.reader.current_state().await;
        evaluate_request(current.state, &current.reason, request).map_err(|rejection| {
            debug!(path = %request.path, code = %rejection.code, "[cx-07] Write rejected");
            rejection
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Role, StaticStateReader, SystemStateKind};

    #[tokio::test]
    async fn test_gate_follows_state() {
        let reader = Arc::new(StaticStateReader::default());
        let gate = WriteGate::new(reader.clone());
        let join = GateRequest::write("/api/tournaments/join", Some(Role::Player));

        assert!(gate.check(&join).await.is_ok());

        reader.set(SystemStateKind::Critical);
        let rejection = gate.check(&join).await.unwrap_err();
        assert_eq!(rejection.code, "SYSTEM_CRITICAL");
        assert!(gate.check(&GateRequest::read("/api/leaderboard")).await.is_ok());
        assert!(gate
            .check(&GateRequest::write("/api/system/chaos", Some(Role::Admin)))
            .await
            .is_ok());
    }
}

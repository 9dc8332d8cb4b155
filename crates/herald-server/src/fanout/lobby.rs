//! Lobby fan-out: every connection of every registered identity.

use herald_core::Payload;
use herald_settings::DeliveryMode;
use tracing::debug;

use super::DeliveryReport;
use super::delivery::{Audience, dispatch, encode_or_warn, push};
use crate::registry::ConnectionRegistry;

/// Pushes a payload to all lobby connections.
#[derive(Clone, Copy, Debug, Default)]
pub struct LobbyFanout {
    mode: DeliveryMode,
}

impl LobbyFanout {
    /// Create a lobby fan-out using `mode` to issue sends.
    pub fn new(mode: DeliveryMode) -> Self {
        Self { mode }
    }

    /// Delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Attempt one send per lobby connection present at enumeration time.
    ///
    /// Peer resets are absorbed; other send failures are logged and kept in
    /// the report. Connections registered after the snapshot are not reached.
    pub async fn broadcast(&self, registry: &ConnectionRegistry, payload: &Payload) -> DeliveryReport {
        let Some(frame) = encode_or_warn(payload) else {
            return DeliveryReport::default();
        };

        let targets = registry.lobby_snapshot();
        let mut report = DeliveryReport {
            attempted: targets.len(),
            ..DeliveryReport::default()
        };

        let sends: Vec<_> = targets
            .into_iter()
            .map(|(identity, conn)| push(Audience::Lobby, identity, None, conn, frame.clone()))
            .collect();
        for outcome in dispatch(self.mode, sends).await {
            report.record(Audience::Lobby, outcome);
        }

        debug!(
            message_type = payload.message_type().unwrap_or(""),
            recipients = report.attempted,
            delivered = report.delivered,
            absorbed = report.absorbed,
            reported = report.reported(),
            "lobby broadcast complete"
        );
        report
    }
}

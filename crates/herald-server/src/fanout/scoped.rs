//! Session-scoped fan-out: spectators, principals, then streaming sinks.

use herald_core::{Frame, Identity, Payload, SessionId};
use herald_settings::DeliveryMode;
use tracing::{debug, trace};

use super::DeliveryReport;
use super::delivery::{Audience, dispatch, encode_or_warn, push, settle};
use crate::metrics;
use crate::registry::ConnectionRegistry;
use crate::session::{GameSession, RoundScope, Side};
use crate::sink::SharedSink;

/// Pushes a round update to the recipients of one session.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScopedFanout {
    mode: DeliveryMode,
}

impl ScopedFanout {
    /// Create a scoped fan-out using `mode` to issue sends.
    pub fn new(mode: DeliveryMode) -> Self {
        Self { mode }
    }

    /// Delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Deliver `payload` to the session's recipients.
    ///
    /// Recipient categories run in order and independently: spectators,
    /// principals (only for [`RoundScope::Full`]), then every sink. Automated
    /// principals are skipped. Each category's failures follow its own
    /// policy; none stops the others.
    pub async fn deliver(
        &self,
        session: &dyn GameSession,
        registry: &ConnectionRegistry,
        payload: &Payload,
        scope: RoundScope,
        sinks: &[SharedSink],
    ) -> DeliveryReport {
        let Some(frame) = encode_or_warn(payload) else {
            return DeliveryReport::default();
        };
        let session_id = session.id();
        let mut report = DeliveryReport::default();

        self.reach(Audience::Spectator, session.spectators(), session_id, registry, &frame, &mut report)
            .await;

        if scope.includes_principals() {
            let mut principals = Vec::with_capacity(Side::ALL.len());
            for side in Side::ALL {
                let participant = session.principal(side);
                if let Some(identity) = participant.delivery_target() {
                    principals.push(identity.clone());
                } else {
                    trace!(
                        session = %session_id,
                        side = side.as_str(),
                        identity = %participant.identity(),
                        "automated principal skipped"
                    );
                }
            }
            self.reach(Audience::Principal, principals, session_id, registry, &frame, &mut report)
                .await;
        }

        for sink in sinks {
            sink.enqueue(frame.clone());
        }
        if !sinks.is_empty() {
            report.sinks = sinks.len();
            metrics::record_sink_enqueued(sinks.len());
        }

        debug!(
            session = %session_id,
            scope = ?scope,
            recipients = report.attempted,
            delivered = report.delivered,
            absorbed = report.absorbed,
            reported = report.reported(),
            sinks = report.sinks,
            "round broadcast complete"
        );
        report
    }

    /// Resolve each identity to its session connection, then send to all
    /// that resolved.
    async fn reach(
        &self,
        audience: Audience,
        identities: Vec<Identity>,
        session: &SessionId,
        registry: &ConnectionRegistry,
        frame: &Frame,
        report: &mut DeliveryReport,
    ) {
        let mut sends = Vec::with_capacity(identities.len());
        for identity in identities {
            match registry.resolve(&identity, session) {
                Ok(conn) => sends.push(push(audience, identity, Some(session), conn, frame.clone())),
                Err(err) => report.record(audience, settle(audience, &identity, Some(session), err)),
            }
        }

        report.attempted += sends.len();
        for outcome in dispatch(self.mode, sends).await {
            report.record(audience, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use herald_core::logging::capture_logs;
    use herald_core::{ConnectionId, DeliveryError, SendError, Unresolvable};
    use tracing::Level;

    use crate::connection::{MockConnection, SharedConnection};
    use crate::session::{GameRoom, Participant};
    use crate::sink::QueueSink;

    fn payload() -> Payload {
        Payload::new().with("type", "move").with("ply", 5)
    }

    fn g1() -> SessionId {
        SessionId::from("g1")
    }

    fn mock(result: Result<(), SendError>) -> SharedConnection {
        let mut mock = MockConnection::new();
        let _ = mock.expect_id().returning(ConnectionId::new);
        let _ = mock.expect_send().times(1).returning(move |_| result.clone());
        Arc::new(mock)
    }

    fn untouched() -> SharedConnection {
        let mut mock = MockConnection::new();
        let _ = mock.expect_id().returning(ConnectionId::new);
        let _ = mock.expect_send().never();
        Arc::new(mock)
    }

    fn humans(white: &str, black: &str) -> GameRoom {
        GameRoom::new(
            g1(),
            Participant::Human(Identity::from(white)),
            Participant::Human(Identity::from(black)),
        )
    }

    #[tokio::test]
    async fn missing_spectators_are_absorbed() {
        let (logs, _guard) = capture_logs();
        let registry = ConnectionRegistry::new();
        let room = humans("white", "black");
        let _ = room.add_spectator(Identity::from("alice"));
        let _ = room.add_spectator(Identity::from("bob"));
        registry.register_session(&Identity::from("alice"), g1(), mock(Ok(())));

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Partial, &[])
            .await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.absorbed, 1);
        assert_eq!(report.reported(), 0);
        assert_eq!(logs.count_reported(), 0);
    }

    #[tokio::test]
    async fn partial_scope_skips_principals() {
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        registry.register_session(&Identity::from("alice"), g1(), untouched());
        registry.register_session(&Identity::from("bob"), g1(), untouched());

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Partial, &[])
            .await;
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn full_scope_reaches_both_principals() {
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        registry.register_session(&Identity::from("alice"), g1(), mock(Ok(())));
        registry.register_session(&Identity::from("bob"), g1(), mock(Ok(())));

        let report = ScopedFanout::new(DeliveryMode::Sequential)
            .deliver(&room, &registry, &payload(), RoundScope::Full, &[])
            .await;
        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
    }

    #[tokio::test]
    async fn automated_principal_is_never_sent_to() {
        let registry = ConnectionRegistry::new();
        let room = GameRoom::new(
            g1(),
            Participant::Automated(Identity::from("Fairy-Stockfish")),
            Participant::Human(Identity::from("bob")),
        );
        registry.register_session(&Identity::from("Fairy-Stockfish"), g1(), untouched());
        registry.register_session(&Identity::from("bob"), g1(), mock(Ok(())));

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Full, &[])
            .await;
        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn unreachable_principal_is_reported_and_other_still_reached() {
        let (logs, _guard) = capture_logs();
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        let _ = room.add_spectator(Identity::from("carol"));
        let _ = registry.entry(&Identity::from("alice"));
        registry.register_session(&Identity::from("bob"), g1(), mock(Ok(())));
        registry.register_session(&Identity::from("carol"), g1(), mock(Ok(())));

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Full, &[])
            .await;
        assert_eq!(report.delivered, 2);
        assert_eq!(report.reported(), 1);
        assert_matches!(
            &report.diagnostics[0].error,
            DeliveryError::RecipientUnresolvable { reason: Unresolvable::NoSessionConnection, identity, .. }
                if identity.as_str() == "alice"
        );
        assert_eq!(logs.count_at_level(Level::WARN), 1);

        let warning = logs
            .events_for_target("herald_server::fanout")
            .into_iter()
            .find(|e| e.level == Level::WARN)
            .unwrap();
        assert_eq!(warning.field("audience"), Some("principal"));
        assert_eq!(warning.field("session"), Some("g1"));
        assert_eq!(warning.field("connection"), None);
    }

    #[tokio::test]
    async fn principal_reset_is_absorbed() {
        let (logs, _guard) = capture_logs();
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        registry.register_session(&Identity::from("alice"), g1(), mock(Err(SendError::ResetByPeer)));
        registry.register_session(&Identity::from("bob"), g1(), mock(Ok(())));

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Full, &[])
            .await;
        assert_eq!(report.absorbed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(logs.count_reported(), 0);
    }

    #[tokio::test]
    async fn inconsistent_entry_is_reported_at_error() {
        let (logs, _guard) = capture_logs();
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        let _ = registry.insert_uninitialized(&Identity::from("alice"));
        registry.register_session(&Identity::from("bob"), g1(), mock(Ok(())));

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Full, &[])
            .await;
        assert_eq!(report.delivered, 1);
        assert_matches!(
            report.diagnostics[0].error,
            DeliveryError::RegistryInconsistency { .. }
        );
        assert_eq!(logs.count_at_level(Level::ERROR), 1);
    }

    #[tokio::test]
    async fn sinks_get_the_same_bytes() {
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");
        let (first, mut first_rx) = QueueSink::channel();
        let (second, mut second_rx) = QueueSink::channel();
        let sinks = vec![first as SharedSink, second];

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Full, &sinks)
            .await;
        assert_eq!(report.sinks, 2);
        assert_eq!(report.reported(), 2);

        let a = first_rx.recv().await.unwrap();
        let b = second_rx.recv().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.bytes().as_ptr(), b.bytes().as_ptr());
        assert_eq!(a.as_str(), r#"{"ply":5,"type":"move"}"#);
    }

    #[tokio::test]
    async fn empty_session_partial_is_noop() {
        let (logs, _guard) = capture_logs();
        let registry = ConnectionRegistry::new();
        let room = humans("alice", "bob");

        let report = ScopedFanout::default()
            .deliver(&room, &registry, &payload(), RoundScope::Partial, &[])
            .await;
        assert_eq!(report, DeliveryReport::default());
        assert!(logs.has_event(Level::DEBUG, "round broadcast complete"));
    }
}

//! Entry point owning the registry and both fan-out paths.

use std::sync::Arc;

use herald_core::logging::init_subscriber;
use herald_core::{Frame, Identity, Payload};
use herald_settings::{FanoutSettings, HeraldSettings, get_settings};
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::{ClientConnection, Connection};
use crate::fanout::{DeliveryReport, LobbyFanout, ScopedFanout};
use crate::registry::ConnectionRegistry;
use crate::session::{GameSession, RoundScope};
use crate::sink::SharedSink;

/// Lobby and round broadcasts over a shared connection registry.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
    lobby: LobbyFanout,
    scoped: ScopedFanout,
    queue_capacity: usize,
}

impl Broadcaster {
    /// Create a broadcaster with an empty registry.
    pub fn new(settings: &FanoutSettings) -> Self {
        Self::with_registry(Arc::new(ConnectionRegistry::new()), settings)
    }

    /// Validate `settings`, install the log subscriber at `logging.level`,
    /// and create a broadcaster from the fan-out section.
    pub fn from_settings(settings: &HeraldSettings) -> herald_settings::Result<Self> {
        settings.validate()?;
        init_subscriber(&settings.logging.level);
        debug!(
            delivery_mode = ?settings.fanout.delivery_mode,
            queue_capacity = settings.fanout.connection_queue_capacity,
            "broadcaster configured"
        );
        Ok(Self::new(&settings.fanout))
    }

    /// [`Broadcaster::from_settings`] over the process-wide settings.
    pub fn from_global_settings() -> herald_settings::Result<Self> {
        Self::from_settings(get_settings())
    }

    /// Create a broadcaster over an existing registry.
    pub fn with_registry(registry: Arc<ConnectionRegistry>, settings: &FanoutSettings) -> Self {
        Self {
            registry,
            lobby: LobbyFanout::new(settings.delivery_mode),
            scoped: ScopedFanout::new(settings.delivery_mode),
            queue_capacity: settings.connection_queue_capacity,
        }
    }

    /// The registry connect/disconnect handlers mutate.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Open an outbound queue for `identity`, sized from settings.
    ///
    /// The caller registers the connection (lobby or session) and drains the
    /// receiver into its socket.
    pub fn open_connection(&self, identity: &Identity) -> (Arc<ClientConnection>, mpsc::Receiver<Frame>) {
        let (conn, rx) = ClientConnection::channel(self.queue_capacity);
        debug!(identity = %identity, connection = %conn.id(), "connection opened");
        (conn, rx)
    }

    /// Send `payload` to every lobby connection.
    pub async fn lobby_broadcast(&self, payload: &Payload) -> DeliveryReport {
        self.lobby.broadcast(&self.registry, payload).await
    }

    /// Send a round update to the session's recipients.
    pub async fn round_broadcast(
        &self,
        session: &dyn GameSession,
        payload: &Payload,
        scope: RoundScope,
        sinks: &[SharedSink],
    ) -> DeliveryReport {
        self.scoped
            .deliver(session, &self.registry, payload, scope, sinks)
            .await
    }
}

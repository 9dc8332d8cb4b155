//! Connection registry: which live connections belong to which identity.
//!
//! Two views per identity:
//! - lobby connections (any number, keyed by connection id)
//! - session-scoped connections (at most one per session id)
//!
//! The registry is mutated by connect/disconnect handlers while fan-out reads
//! it. Every accessor clones `Arc`s out of the map and releases the guard
//! before returning, so callers never hold a registry lock across a send.
//! Lookups return "not found" instead of assuming earlier membership still
//! holds.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use herald_core::{ConnectionId, DeliveryError, Identity, SessionId, Unresolvable};
use parking_lot::RwLock;

use crate::connection::SharedConnection;

/// All live connections of one identity.
pub struct UserConnections {
    identity: Identity,
    lobby: RwLock<HashMap<ConnectionId, SharedConnection>>,
    /// `None` until the entry is set up for game play.
    sessions: RwLock<Option<HashMap<SessionId, SharedConnection>>>,
}

impl UserConnections {
    /// A fully initialized, empty entry.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            lobby: RwLock::new(HashMap::new()),
            sessions: RwLock::new(Some(HashMap::new())),
        }
    }

    /// An entry whose session table was never set up.
    ///
    /// Lookups against it report [`DeliveryError::RegistryInconsistency`].
    pub fn uninitialized(identity: Identity) -> Self {
        Self {
            identity,
            lobby: RwLock::new(HashMap::new()),
            sessions: RwLock::new(None),
        }
    }

    /// Owner of these connections.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether the session table exists.
    pub fn is_initialized(&self) -> bool {
        self.sessions.read().is_some()
    }

    /// The connection scoped to `session`, if one is open.
    pub fn connection_for(
        &self,
        session: &SessionId,
    ) -> Result<Option<SharedConnection>, DeliveryError> {
        match &*self.sessions.read() {
            Some(map) => Ok(map.get(session).cloned()),
            None => Err(DeliveryError::RegistryInconsistency {
                identity: self.identity.clone(),
                detail: "session connections were never initialized".to_string(),
            }),
        }
    }

    /// Bind `conn` to `session`, initializing the table if needed.
    ///
    /// Returns the connection it replaced.
    pub fn attach_session(
        &self,
        session: SessionId,
        conn: SharedConnection,
    ) -> Option<SharedConnection> {
        self.sessions
            .write()
            .get_or_insert_with(HashMap::new)
            .insert(session, conn)
    }

    /// Unbind the connection for `session`.
    pub fn detach_session(&self, session: &SessionId) -> Option<SharedConnection> {
        self.sessions.write().as_mut()?.remove(session)
    }

    /// Add a lobby connection. Returns `false` if its id was already present.
    pub fn attach_lobby(&self, conn: SharedConnection) -> bool {
        self.lobby.write().insert(conn.id(), conn).is_none()
    }

    /// Remove a lobby connection by id.
    pub fn detach_lobby(&self, id: &ConnectionId) -> Option<SharedConnection> {
        self.lobby.write().remove(id)
    }

    /// Snapshot of the lobby connections.
    pub fn lobby_connections(&self) -> Vec<SharedConnection> {
        self.lobby.read().values().cloned().collect()
    }

    /// Number of lobby connections.
    pub fn lobby_count(&self) -> usize {
        self.lobby.read().len()
    }

    /// Number of session-scoped connections.
    pub fn session_count(&self) -> usize {
        self.sessions.read().as_ref().map_or(0, HashMap::len)
    }

    /// Whether no connection of either kind remains.
    pub fn is_empty(&self) -> bool {
        self.lobby_count() == 0 && self.session_count() == 0
    }
}

/// Process-wide identity → connections map.
#[derive(Default)]
pub struct ConnectionRegistry {
    users: DashMap<Identity, Arc<UserConnections>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an identity.
    pub fn find(&self, identity: &Identity) -> Option<Arc<UserConnections>> {
        self.users.get(identity).map(|entry| Arc::clone(entry.value()))
    }

    /// Get or create the entry for `identity`.
    ///
    /// The returned handle may be pruned once it is empty; register
    /// connections through [`Self::register_lobby`] and
    /// [`Self::register_session`] instead of attaching to it directly.
    pub fn entry(&self, identity: &Identity) -> Arc<UserConnections> {
        let entry = self
            .users
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(UserConnections::new(identity.clone())));
        Arc::clone(entry.value())
    }

    /// Insert (or replace) an entry whose session table is not set up.
    pub fn insert_uninitialized(&self, identity: &Identity) -> Arc<UserConnections> {
        let user = Arc::new(UserConnections::uninitialized(identity.clone()));
        let _ = self.users.insert(identity.clone(), Arc::clone(&user));
        user
    }

    /// Register a lobby connection for `identity`.
    pub fn register_lobby(&self, identity: &Identity, conn: SharedConnection) {
        let _ = self.with_entry(identity, |user| user.attach_lobby(conn));
    }

    /// Register the connection `identity` uses for `session`.
    pub fn register_session(&self, identity: &Identity, session: SessionId, conn: SharedConnection) {
        let _ = self.with_entry(identity, |user| user.attach_session(session, conn));
    }

    /// Run `f` on the entry for `identity` while its shard is write-locked.
    ///
    /// Attaching under the shard guard serializes with [`Self::prune`], so a
    /// connection is never attached to an entry that was just removed.
    fn with_entry<R>(&self, identity: &Identity, f: impl FnOnce(&UserConnections) -> R) -> R {
        let entry = self
            .users
            .entry(identity.clone())
            .or_insert_with(|| Arc::new(UserConnections::new(identity.clone())));
        f(entry.value())
    }

    /// Remove a lobby connection; drops the entry once it is empty.
    pub fn remove_lobby(&self, identity: &Identity, id: &ConnectionId) -> Option<SharedConnection> {
        let removed = self.find(identity)?.detach_lobby(id);
        self.prune(identity);
        removed
    }

    /// Remove a session-scoped connection; drops the entry once it is empty.
    pub fn remove_session(
        &self,
        identity: &Identity,
        session: &SessionId,
    ) -> Option<SharedConnection> {
        let removed = self.find(identity)?.detach_session(session);
        self.prune(identity);
        removed
    }

    /// Remove an identity and all its connections.
    pub fn remove_user(&self, identity: &Identity) -> Option<Arc<UserConnections>> {
        self.users.remove(identity).map(|(_, user)| user)
    }

    fn prune(&self, identity: &Identity) {
        let _ = self
            .users
            .remove_if(identity, |_, user| user.is_initialized() && user.is_empty());
    }

    /// Resolve `identity` to its connection for `session`.
    pub fn resolve(
        &self,
        identity: &Identity,
        session: &SessionId,
    ) -> Result<SharedConnection, DeliveryError> {
        let unresolvable = |reason| DeliveryError::RecipientUnresolvable {
            identity: identity.clone(),
            session: session.clone(),
            reason,
        };
        let user = self
            .find(identity)
            .ok_or_else(|| unresolvable(Unresolvable::NotRegistered))?;
        user.connection_for(session)?
            .ok_or_else(|| unresolvable(Unresolvable::NoSessionConnection))
    }

    /// Snapshot of every lobby connection, paired with its owner.
    pub fn lobby_snapshot(&self) -> Vec<(Identity, SharedConnection)> {
        let users: Vec<Arc<UserConnections>> = self
            .users
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        users
            .iter()
            .flat_map(|user| {
                user.lobby_connections()
                    .into_iter()
                    .map(|conn| (user.identity().clone(), conn))
            })
            .collect()
    }

    /// Number of registered identities.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of lobby connections across all identities.
    pub fn lobby_connection_count(&self) -> usize {
        self.users.iter().map(|entry| entry.value().lobby_count()).sum()
    }
}

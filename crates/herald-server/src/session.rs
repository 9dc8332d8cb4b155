//! Game session model as seen by the fan-out layer.
//!
//! A session owns a spectator set (membership changes externally) and two
//! principal slots. Fan-out only reads it.

use std::collections::HashSet;

use herald_core::{Identity, SessionId};
use parking_lot::RwLock;

/// One of the two principal slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// First principal.
    White,
    /// Second principal.
    Black,
}

impl Side {
    /// Both slots, in delivery order.
    pub const ALL: [Side; 2] = [Side::White, Side::Black];

    /// Lowercase label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

/// Occupant of a principal slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Participant {
    /// A person with (possibly) a live connection.
    Human(Identity),
    /// An engine or bot. Never a delivery target.
    Automated(Identity),
}

impl Participant {
    /// The identity to deliver to, if any.
    pub fn delivery_target(&self) -> Option<&Identity> {
        match self {
            Self::Human(identity) => Some(identity),
            Self::Automated(_) => None,
        }
    }

    /// Identity regardless of kind.
    pub fn identity(&self) -> &Identity {
        match self {
            Self::Human(identity) | Self::Automated(identity) => identity,
        }
    }
}

/// Which recipients a round update reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundScope {
    /// Spectators only (clock ticks, ephemeral updates).
    #[default]
    Partial,
    /// Spectators and both principals (authoritative state changes).
    Full,
}

impl RoundScope {
    /// Whether principals are delivered to.
    pub fn includes_principals(self) -> bool {
        matches!(self, Self::Full)
    }
}

impl From<bool> for RoundScope {
    fn from(include_principals: bool) -> Self {
        if include_principals { Self::Full } else { Self::Partial }
    }
}

/// Read-only view of a session.
pub trait GameSession: Send + Sync {
    /// Session id connections are scoped to.
    fn id(&self) -> &SessionId;

    /// Snapshot of the current spectators.
    fn spectators(&self) -> Vec<Identity>;

    /// Occupant of `side`.
    fn principal(&self, side: Side) -> Participant;
}

/// In-memory [`GameSession`].
pub struct GameRoom {
    id: SessionId,
    white: Participant,
    black: Participant,
    spectators: RwLock<HashSet<Identity>>,
}

impl GameRoom {
    /// Create a room with no spectators.
    pub fn new(id: SessionId, white: Participant, black: Participant) -> Self {
        Self {
            id,
            white,
            black,
            spectators: RwLock::new(HashSet::new()),
        }
    }

    /// Add a spectator. Returns `false` if already watching.
    pub fn add_spectator(&self, identity: Identity) -> bool {
        self.spectators.write().insert(identity)
    }

    /// Remove a spectator. Returns `false` if not watching.
    pub fn remove_spectator(&self, identity: &Identity) -> bool {
        self.spectators.write().remove(identity)
    }

    /// Number of spectators.
    pub fn spectator_count(&self) -> usize {
        self.spectators.read().len()
    }
}

impl GameSession for GameRoom {
    fn id(&self) -> &SessionId {
        &self.id
    }

    fn spectators(&self) -> Vec<Identity> {
        self.spectators.read().iter().cloned().collect()
    }

    fn principal(&self, side: Side) -> Participant {
        match side {
            Side::White => self.white.clone(),
            Side::Black => self.black.clone(),
        }
    }
}

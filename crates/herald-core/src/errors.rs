//! Delivery error taxonomy.
//!
//! Every way a single delivery can go wrong is a named value here rather than
//! an implicit catch clause:
//!
//! - [`SendError`]: what a connection's `send` reports
//! - [`DeliveryError`]: the classified outcome of one recipient's delivery,
//!   carrying identity/session/connection context for logging
//! - [`DeliveryErrorKind`]: the four failure classes, used for policy
//!   decisions and metric labels
//!
//! None of these ever escape a fan-out call. The fan-out layer decides per
//! audience whether a failure is absorbed or reported.

use std::fmt;

use thiserror::Error;

use crate::ids::{ConnectionId, Identity, SessionId};

/// Failure reported by a connection's send primitive.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The remote end closed or reset the connection.
    #[error("connection reset by peer")]
    ResetByPeer,
    /// The outbound queue is full; the client is not draining it.
    #[error("outbound queue full (capacity {capacity})")]
    Backpressure {
        /// Queue capacity that was exhausted.
        capacity: usize,
    },
    /// Any other transport failure.
    #[error("transport error: {0}")]
    Other(String),
}

impl SendError {
    /// Whether this is the expected steady-state "peer went away" failure.
    pub fn is_peer_reset(&self) -> bool {
        matches!(self, Self::ResetByPeer)
    }
}

/// Why a recipient could not be resolved to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unresolvable {
    /// The identity has no registry entry at all.
    NotRegistered,
    /// The identity is registered but has no connection for this session.
    NoSessionConnection,
}

impl fmt::Display for Unresolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "not registered"),
            Self::NoSessionConnection => write!(f, "no connection for session"),
        }
    }
}

/// Classified outcome of a failed delivery to one recipient.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Remote closed the connection. Always absorbed.
    #[error("connection {connection} reset by peer")]
    PeerReset {
        /// Connection that was reset.
        connection: ConnectionId,
    },

    /// Identity or session-scoped connection is missing.
    #[error("{identity} unresolvable for session {session}: {reason}")]
    RecipientUnresolvable {
        /// Recipient identity.
        identity: Identity,
        /// Session the lookup was scoped to.
        session: SessionId,
        /// Which lookup step failed.
        reason: Unresolvable,
    },

    /// Send failed for a reason other than a peer reset.
    #[error("send to {identity} on connection {connection} failed: {source}")]
    TransportAnomaly {
        /// Recipient identity.
        identity: Identity,
        /// Connection the send was attempted on.
        connection: ConnectionId,
        /// Underlying send error.
        #[source]
        source: SendError,
    },

    /// A registry entry exists but is structurally malformed.
    #[error("registry entry for {identity} is inconsistent: {detail}")]
    RegistryInconsistency {
        /// Identity whose entry is malformed.
        identity: Identity,
        /// What is wrong with it.
        detail: String,
    },
}

impl DeliveryError {
    /// Classify a send failure.
    pub fn from_send(identity: &Identity, connection: &ConnectionId, err: SendError) -> Self {
        match err {
            SendError::ResetByPeer => Self::PeerReset { connection: connection.clone() },
            source => Self::TransportAnomaly {
                identity: identity.clone(),
                connection: connection.clone(),
                source,
            },
        }
    }

    /// Connection the failure happened on, when a send was attempted.
    pub fn connection(&self) -> Option<&ConnectionId> {
        match self {
            Self::PeerReset { connection } | Self::TransportAnomaly { connection, .. } => {
                Some(connection)
            }
            Self::RecipientUnresolvable { .. } | Self::RegistryInconsistency { .. } => None,
        }
    }

    /// The failure class.
    pub fn kind(&self) -> DeliveryErrorKind {
        match self {
            Self::PeerReset { .. } => DeliveryErrorKind::PeerReset,
            Self::RecipientUnresolvable { .. } => DeliveryErrorKind::RecipientUnresolvable,
            Self::TransportAnomaly { .. } => DeliveryErrorKind::TransportAnomaly,
            Self::RegistryInconsistency { .. } => DeliveryErrorKind::RegistryInconsistency,
        }
    }
}

/// The four delivery failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryErrorKind {
    /// Remote closed the connection.
    PeerReset,
    /// Identity or session-scoped connection missing.
    RecipientUnresolvable,
    /// Unexpected send failure.
    TransportAnomaly,
    /// Malformed registry entry.
    RegistryInconsistency,
}

impl DeliveryErrorKind {
    /// Stable `snake_case` label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeerReset => "peer_reset",
            Self::RecipientUnresolvable => "recipient_unresolvable",
            Self::TransportAnomaly => "transport_anomaly",
            Self::RegistryInconsistency => "registry_inconsistency",
        }
    }
}

impl fmt::Display for DeliveryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn reset_maps_to_peer_reset() {
        let conn = ConnectionId::from("c1");
        let err = DeliveryError::from_send(&Identity::from("alice"), &conn, SendError::ResetByPeer);
        assert_matches!(err, DeliveryError::PeerReset { connection } if connection == conn);
    }

    #[test]
    fn other_send_errors_are_transport_anomalies() {
        let err = DeliveryError::from_send(
            &Identity::from("alice"),
            &ConnectionId::from("c1"),
            SendError::Backpressure { capacity: 8 },
        );
        assert_eq!(err.kind(), DeliveryErrorKind::TransportAnomaly);

        let err = DeliveryError::from_send(
            &Identity::from("alice"),
            &ConnectionId::from("c1"),
            SendError::Other("broken pipe".into()),
        );
        assert_matches!(
            err,
            DeliveryError::TransportAnomaly { source: SendError::Other(ref m), .. } if m == "broken pipe"
        );
    }

    #[test]
    fn connection_only_for_send_failures() {
        let conn = ConnectionId::from("c1");
        let alice = Identity::from("alice");
        let reset = DeliveryError::from_send(&alice, &conn, SendError::ResetByPeer);
        let anomaly = DeliveryError::from_send(&alice, &conn, SendError::Other("eof".into()));
        assert_eq!(reset.connection(), Some(&conn));
        assert_eq!(anomaly.connection(), Some(&conn));

        let missing = DeliveryError::RecipientUnresolvable {
            identity: alice,
            session: SessionId::from("g1"),
            reason: Unresolvable::NotRegistered,
        };
        assert_eq!(missing.connection(), None);
    }

    #[test]
    fn is_peer_reset() {
        assert!(SendError::ResetByPeer.is_peer_reset());
        assert!(!SendError::Other("x".into()).is_peer_reset());
    }

    #[test]
    fn unresolvable_display() {
        let err = DeliveryError::RecipientUnresolvable {
            identity: Identity::from("bob"),
            session: SessionId::from("g1"),
            reason: Unresolvable::NoSessionConnection,
        };
        assert_eq!(err.to_string(), "bob unresolvable for session g1: no connection for session");
    }

    #[test]
    fn transport_anomaly_has_source() {
        use std::error::Error as _;
        let err = DeliveryError::TransportAnomaly {
            identity: Identity::from("bob"),
            connection: ConnectionId::from("c9"),
            source: SendError::Backpressure { capacity: 4 },
        };
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "outbound queue full (capacity 4)");
    }

    #[test]
    fn kind_labels_are_snake_case() {
        for kind in [
            DeliveryErrorKind::PeerReset,
            DeliveryErrorKind::RecipientUnresolvable,
            DeliveryErrorKind::TransportAnomaly,
            DeliveryErrorKind::RegistryInconsistency,
        ] {
            let label = kind.as_str();
            assert!(label.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{label}");
        }
    }
}

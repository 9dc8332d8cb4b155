//! Single-recipient delivery: one send, classified, logged, counted.

use std::future::Future;

use futures::future::join_all;
use herald_core::{ConnectionId, DeliveryError, DeliveryErrorKind, Frame, Identity, Payload, SessionId};
use herald_settings::DeliveryMode;
use tracing::{error, trace, warn};

use crate::connection::SharedConnection;
use crate::metrics;

/// Recipient category. Each has its own failure policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Every lobby connection.
    Lobby,
    /// A session's observers.
    Spectator,
    /// A session's two participants.
    Principal,
}

impl Audience {
    /// Label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Spectator => "spectator",
            Self::Principal => "principal",
        }
    }
}

/// What happens to a failed delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Dropped without an operator-visible trace.
    Absorb,
    /// Logged as a diagnostic and kept in the report.
    Report,
}

/// Failure policy for one audience.
///
/// Spectator churn is expected; a principal that cannot be reached means the
/// session and the registry disagree.
pub fn policy(audience: Audience, err: &DeliveryError) -> Disposition {
    match (err.kind(), audience) {
        (DeliveryErrorKind::RecipientUnresolvable, Audience::Principal)
        | (DeliveryErrorKind::TransportAnomaly | DeliveryErrorKind::RegistryInconsistency, _) => {
            Disposition::Report
        }
        (DeliveryErrorKind::PeerReset | DeliveryErrorKind::RecipientUnresolvable, _) => {
            Disposition::Absorb
        }
    }
}

/// Result of one recipient's delivery.
#[derive(Debug)]
pub enum Outcome {
    /// The connection accepted the frame.
    Delivered,
    /// Failed, and the failure was absorbed.
    Absorbed,
    /// Failed, and the failure was reported.
    Reported(DeliveryError),
}

/// Apply the audience policy to a failure: log it and count it.
///
/// `session` is `None` for lobby deliveries.
pub fn settle(
    audience: Audience,
    identity: &Identity,
    session: Option<&SessionId>,
    err: DeliveryError,
) -> Outcome {
    let kind = err.kind();
    let session = session.map(SessionId::as_str);
    let connection = err.connection().map(ConnectionId::as_str);
    match policy(audience, &err) {
        Disposition::Absorb => {
            trace!(
                audience = audience.as_str(),
                identity = %identity,
                session,
                connection,
                kind = kind.as_str(),
                error = %err,
                "delivery failure absorbed"
            );
            metrics::record_absorbed(audience, kind);
            Outcome::Absorbed
        }
        Disposition::Report => {
            if kind == DeliveryErrorKind::RegistryInconsistency {
                error!(
                    audience = audience.as_str(),
                    identity = %identity,
                    session,
                    connection,
                    kind = kind.as_str(),
                    error = %err,
                    "delivery failed"
                );
            } else {
                warn!(
                    audience = audience.as_str(),
                    identity = %identity,
                    session,
                    connection,
                    kind = kind.as_str(),
                    error = %err,
                    "delivery failed"
                );
            }
            metrics::record_reported(audience, kind);
            Outcome::Reported(err)
        }
    }
}

/// Send `frame` on `conn` and classify the result.
pub async fn push(
    audience: Audience,
    identity: Identity,
    session: Option<&SessionId>,
    conn: SharedConnection,
    frame: Frame,
) -> Outcome {
    metrics::record_send(audience);
    match conn.send(frame).await {
        Ok(()) => {
            metrics::record_delivered(audience);
            Outcome::Delivered
        }
        Err(err) => {
            let err = DeliveryError::from_send(&identity, &conn.id(), err);
            settle(audience, &identity, session, err)
        }
    }
}

/// Drive a batch of sends to completion.
///
/// Every send runs regardless of how the others end; outcomes come back in
/// input order.
pub async fn dispatch<F>(mode: DeliveryMode, sends: Vec<F>) -> Vec<Outcome>
where
    F: Future<Output = Outcome>,
{
    match mode {
        DeliveryMode::Sequential => {
            let mut outcomes = Vec::with_capacity(sends.len());
            for send in sends {
                outcomes.push(send.await);
            }
            outcomes
        }
        DeliveryMode::Concurrent => join_all(sends).await,
    }
}

/// Encode once for the whole call. A payload that cannot be encoded reaches
/// nobody.
pub fn encode_or_warn(payload: &Payload) -> Option<Frame> {
    match payload.encode() {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!(error = %err, "payload encode failed, nothing delivered");
            None
        }
    }
}

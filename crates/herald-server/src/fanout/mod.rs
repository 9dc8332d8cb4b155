//! Best-effort fan-out of one payload to many independent recipients.
//!
//! - [`LobbyFanout`]: every lobby connection of every identity
//! - [`ScopedFanout`]: one session's spectators, optionally its principals,
//!   and any streaming sinks
//!
//! A fan-out call never fails outward. Per-recipient failures are classified
//! by [`delivery::policy`] and either absorbed or logged; the returned
//! [`DeliveryReport`] is for observability only.

pub mod delivery;
mod lobby;
mod scoped;

use herald_core::DeliveryError;

pub use delivery::{Audience, Disposition};
pub use lobby::LobbyFanout;
pub use scoped::ScopedFanout;

use delivery::Outcome;

/// A failure that was reported rather than absorbed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Which recipient category it came from.
    pub audience: Audience,
    /// The classified failure.
    pub error: DeliveryError,
}

/// Tally of one fan-out call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Sends issued on a connection.
    pub attempted: usize,
    /// Sends the connection accepted.
    pub delivered: usize,
    /// Failures dropped under the audience policy.
    pub absorbed: usize,
    /// Sinks the frame was enqueued to.
    pub sinks: usize,
    /// Failures surfaced to operators.
    pub diagnostics: Vec<Diagnostic>,
}

impl DeliveryReport {
    pub(crate) fn record(&mut self, audience: Audience, outcome: Outcome) {
        match outcome {
            Outcome::Delivered => self.delivered += 1,
            Outcome::Absorbed => self.absorbed += 1,
            Outcome::Reported(error) => self.diagnostics.push(Diagnostic { audience, error }),
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: DeliveryReport) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
        self.absorbed += other.absorbed;
        self.sinks += other.sinks;
        self.diagnostics.extend(other.diagnostics);
    }

    /// Number of reported failures.
    pub fn reported(&self) -> usize {
        self.diagnostics.len()
    }

    /// Diagnostics for one audience.
    pub fn diagnostics_for(&self, audience: Audience) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.audience == audience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{ConnectionId, Identity};

    #[test]
    fn record_and_merge() {
        let mut a = DeliveryReport { attempted: 2, ..DeliveryReport::default() };
        a.record(Audience::Spectator, Outcome::Delivered);
        a.record(Audience::Spectator, Outcome::Absorbed);

        let mut b = DeliveryReport { attempted: 1, sinks: 2, ..DeliveryReport::default() };
        b.record(
            Audience::Lobby,
            Outcome::Reported(DeliveryError::RegistryInconsistency {
                identity: Identity::from("carol"),
                detail: "broken".into(),
            }),
        );

        a.merge(b);
        assert_eq!(a.attempted, 3);
        assert_eq!(a.delivered, 1);
        assert_eq!(a.absorbed, 1);
        assert_eq!(a.sinks, 2);
        assert_eq!(a.reported(), 1);
        assert_eq!(a.diagnostics_for(Audience::Lobby).count(), 1);
        assert_eq!(a.diagnostics_for(Audience::Principal).count(), 0);
    }

    #[test]
    fn reset_never_becomes_a_diagnostic() {
        let mut report = DeliveryReport::default();
        let err = DeliveryError::PeerReset { connection: ConnectionId::from("c1") };
        let outcome = delivery::settle(Audience::Principal, &Identity::from("alice"), None, err);
        report.record(Audience::Principal, outcome);
        assert_eq!(report.reported(), 0);
        assert_eq!(report.absorbed, 1);
    }
}

//! Fan-out metric names and recorders.
//!
//! Counters go through the `metrics` facade; installing an exporter is the
//! embedding binary's job.

use herald_core::DeliveryErrorKind;
use metrics::counter;

use crate::fanout::Audience;

/// Send attempts (counter, labels: audience).
pub const FANOUT_SENDS_TOTAL: &str = "fanout_sends_total";
/// Successful sends (counter, labels: audience).
pub const FANOUT_DELIVERED_TOTAL: &str = "fanout_delivered_total";
/// Failures absorbed silently (counter, labels: audience, kind).
pub const FANOUT_ABSORBED_TOTAL: &str = "fanout_absorbed_total";
/// Failures reported to operators (counter, labels: audience, kind).
pub const FANOUT_REPORTED_TOTAL: &str = "fanout_reported_total";
/// Frames handed to streaming sinks (counter).
pub const FANOUT_SINK_ENQUEUED_TOTAL: &str = "fanout_sink_enqueued_total";

pub(crate) fn record_send(audience: Audience) {
    counter!(FANOUT_SENDS_TOTAL, "audience" => audience.as_str()).increment(1);
}

pub(crate) fn record_delivered(audience: Audience) {
    counter!(FANOUT_DELIVERED_TOTAL, "audience" => audience.as_str()).increment(1);
}

pub(crate) fn record_absorbed(audience: Audience, kind: DeliveryErrorKind) {
    counter!(FANOUT_ABSORBED_TOTAL, "audience" => audience.as_str(), "kind" => kind.as_str())
        .increment(1);
}

pub(crate) fn record_reported(audience: Audience, kind: DeliveryErrorKind) {
    counter!(FANOUT_REPORTED_TOTAL, "audience" => audience.as_str(), "kind" => kind.as_str())
        .increment(1);
}

pub(crate) fn record_sink_enqueued(count: usize) {
    counter!(FANOUT_SINK_ENQUEUED_TOTAL).increment(count as u64);
}

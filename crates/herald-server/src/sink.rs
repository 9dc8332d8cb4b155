//! Streaming sinks: queue-like subscribers fed with every round update.

use std::sync::Arc;

use herald_core::Frame;
use tokio::sync::mpsc;
use tracing::trace;

/// A queue that accepts encoded frames. Enqueue never fails at this boundary.
pub trait StreamingSink: Send + Sync {
    /// Hand a frame to the sink.
    fn enqueue(&self, frame: Frame);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn StreamingSink>;

/// Unbounded in-process queue, e.g. the feed behind a server-sent-events
/// subscriber.
pub struct QueueSink {
    tx: mpsc::UnboundedSender<Frame>,
}

impl QueueSink {
    /// Create a sink and the receiver its consumer drains.
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl StreamingSink for QueueSink {
    fn enqueue(&self, frame: Frame) {
        if self.tx.send(frame).is_err() {
            trace!("sink consumer gone, frame discarded");
        }
    }
}

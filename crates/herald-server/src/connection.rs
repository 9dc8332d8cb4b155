//! Live connection abstraction.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use herald_core::{ConnectionId, Frame, SendError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One live connection, able to accept an encoded frame.
///
/// Each connection fails independently of every other. Implementations bound
/// their own write latency; the fan-out layer applies no timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connection: Send + Sync {
    /// Connection identifier, for logs.
    fn id(&self) -> ConnectionId;

    /// Push one frame to the remote end.
    async fn send(&self, frame: Frame) -> Result<(), SendError>;
}

/// Shared handle to a connection, as stored in the registry.
pub type SharedConnection = Arc<dyn Connection>;

/// A connected socket fed through a bounded outbound queue.
///
/// The socket's write task owns the receiving half. `send` never waits: a
/// full queue is reported as backpressure and a dropped receiver (the write
/// task exited because the peer went away) as a peer reset.
pub struct ClientConnection {
    /// Unique connection ID.
    id: ConnectionId,
    /// Send channel to the socket's write task.
    tx: mpsc::Sender<Frame>,
    /// When this connection was established.
    connected_at: Instant,
    /// Count of frames dropped due to a full queue.
    dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Wrap an existing outbound channel.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Create a connection and the receiver its write task drains.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Arc::new(Self::new(ConnectionId::new(), tx)), rx)
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Whether the write task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[async_trait]
impl Connection for ClientConnection {
    fn id(&self) -> ConnectionId {
        self.id.clone()
    }

    async fn send(&self, frame: Frame) -> Result<(), SendError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(SendError::ResetByPeer),
            Err(TrySendError::Full(_)) => {
                let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
                Err(SendError::Backpressure {
                    capacity: self.tx.max_capacity(),
                })
            }
        }
    }
}

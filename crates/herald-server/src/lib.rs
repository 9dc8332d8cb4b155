//! # herald-server
//!
//! Best-effort fan-out of lobby events and game-round updates.
//!
//! - Connection abstraction over a bounded outbound queue
//! - Concurrent connection registry (lobby and session-scoped connections)
//! - Lobby fan-out to every connection, scoped fan-out to one session's
//!   spectators, principals and streaming sinks
//! - Per-audience failure policy: resets absorbed, integrity problems logged
//! - Counters through the `metrics` facade
//!
//! Transports and sinks stay behind the [`Connection`] and [`StreamingSink`]
//! traits; this crate never opens a socket.

#![deny(unsafe_code)]

pub mod broadcaster;
pub mod connection;
pub mod fanout;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod sink;

pub use broadcaster::Broadcaster;
pub use connection::{ClientConnection, Connection, SharedConnection};
pub use fanout::{Audience, DeliveryReport, Diagnostic, Disposition, LobbyFanout, ScopedFanout};
pub use registry::{ConnectionRegistry, UserConnections};
pub use session::{GameRoom, GameSession, Participant, RoundScope, Side};
pub use sink::{QueueSink, SharedSink, StreamingSink};

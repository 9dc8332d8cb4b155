//! # herald-core
//!
//! Foundation types shared by the Herald crates:
//!
//! - **Branded IDs**: [`Identity`], [`SessionId`], [`ConnectionId`]
//! - **Payloads**: [`Payload`] (structured message) and [`Frame`] (encoded once,
//!   shared by every recipient)
//! - **Errors**: [`SendError`] from the transport and the [`DeliveryError`]
//!   taxonomy used to decide what is absorbed and what is reported
//! - **Logging**: subscriber bootstrap and log capture for tests

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod payload;

pub use errors::{DeliveryError, DeliveryErrorKind, SendError, Unresolvable};
pub use ids::{ConnectionId, Identity, SessionId};
pub use payload::{Frame, Payload, PayloadError};

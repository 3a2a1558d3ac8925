//! Application layer for rocketcar-relay.
//!
//! The application layer decides *what* happens when a peer connects, sends
//! an event, or goes away.  It delegates *how* bytes move to the
//! infrastructure layer.
//!
//! # Responsibilities
//!
//! - The connection lifecycle state machine ([`ConnectionHandler`])
//! - Turning client events into registry, pairing, and relay calls
//! - Choosing which peers are notified, and with what
//!
//! # What does NOT belong here?
//!
//! - Sockets, WebSocket framing, or JSON text (that is infrastructure)
//! - Tokio task spawning and channels (also infrastructure)

pub mod clock;
pub mod lifecycle;

pub use clock::{Clock, SystemClock};
pub use lifecycle::{ConnectionHandler, ConnectionState, PeerEvent};

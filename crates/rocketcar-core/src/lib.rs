//! # rocketcar-core
//!
//! Shared library for the RocketCar relay containing the JSON event protocol,
//! the session registry, the pairing rules, and the message relay.
//!
//! This crate has zero dependencies on sockets, async runtimes, or clocks.
//! Everything in it is a plain function over owned data, which is what lets the
//! relay server run it inside a single-threaded event loop.
//!
//! # Architecture overview (for beginners)
//!
//! RocketCar is a two-screen game: a "desktop" browser tab draws the race track
//! and a phone ("mobile controller") steers the car.  Both connect to the relay
//! server, which pairs them one-to-one and forwards messages between them:
//!
//! ```text
//!  controller ──control──►  relay  ──control-input──►  desktop
//!  controller ◄─game-state─ relay ◄─game-state-update─ desktop
//! ```
//!
//! This crate is the shared foundation.  It defines:
//!
//! - **`protocol`** – What travels over the wire.  Every message is a JSON
//!   object `{"event": "...", "data": ...}` decoded into a typed Rust enum.
//!
//! - **`domain`** – The pairing core: the [`PeerRegistry`] that owns all
//!   sessions, the [`PairingManager`] that links exactly one controller to one
//!   desktop, and the [`MessageRelay`] that forwards messages across a link.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `rocketcar_core::PeerRegistry` instead of `rocketcar_core::domain::registry::PeerRegistry`.
pub use domain::error::ErrorKind;
pub use domain::pairing::{PairingAck, PairingError, PairingManager};
pub use domain::registry::{PeerRegistry, RegistryError};
pub use domain::relay::{Delivery, MessageRelay, RelayError};
pub use domain::session::{ConnectionId, ControllerSession, DesktopSession};
pub use protocol::codec::{decode_client_event, encode_server_event, ProtocolError};
pub use protocol::messages::{ClientEvent, ControlAction, GameState, ServerEvent};

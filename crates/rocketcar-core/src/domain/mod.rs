//! Domain entities for the RocketCar relay.
//!
//! This module contains the pairing core with no infrastructure dependencies:
//! no sockets, no async, no clock.  Timestamps are passed in by the caller.
//!
//! # Components (leaf to root)
//!
//! - [`session`]  – `DesktopSession`, `ControllerSession`, `ConnectionId`.
//! - [`registry`] – `PeerRegistry`, the only owner of sessions.
//! - [`pairing`]  – `PairingManager`, the one-to-one pairing rules.
//! - [`relay`]    – `MessageRelay`, point-to-point forwarding across a pair.
//! - [`error`]    – `ErrorKind`, the taxonomy every error type maps into.

pub mod error;
pub mod pairing;
pub mod registry;
pub mod relay;
pub mod session;

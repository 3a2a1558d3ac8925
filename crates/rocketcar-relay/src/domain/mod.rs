//! Domain layer for rocketcar-relay.
//!
//! Server-specific plain types with no I/O.  The pairing core itself (sessions,
//! registry, pairing, relay) lives in `rocketcar-core`; this layer only adds
//! what the server process needs on top of it.

pub mod config;

pub use config::{InvalidConfig, RelayConfig};

//! Infrastructure layer for rocketcar-relay.
//!
//! The infrastructure layer handles all I/O: the WebSocket listener, the
//! per-connection socket pumps, the hub task that feeds the handler, and
//! reading the optional config file.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and performing the WebSocket upgrade
//! - Turning text frames into client events and server events into frames
//! - Keepalive pings and idle-timeout detection
//! - Serialising all registry access through one hub task
//! - Handling the graceful shutdown signal
//!
//! # What does NOT belong here?
//!
//! - Pairing and relay rules (that is `rocketcar-core` plus the application
//!   layer)
//! - Merging CLI flags with defaults (that is done in `main.rs`)

pub mod config_file;
pub mod hub;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use config_file::{ConfigError, ConfigFile};
pub use ws_server::{run_server, RelayServer};

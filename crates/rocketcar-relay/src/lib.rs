//! rocketcar-relay library crate.
//!
//! This crate provides the WebSocket server that pairs a RocketCar desktop
//! game with a phone acting as its controller, then relays steering input in
//! one direction and game snapshots in the other.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Desktop browser tab          Phone browser
//!  (JSON over WebSocket)       (JSON over WebSocket)
//!            ↘                   ↙
//! [rocketcar-relay]
//!   ├── domain/           RelayConfig
//!   ├── application/      ConnectionHandler state machine, Clock
//!   └── infrastructure/
//!         ├── ws_server/  Accept loop + per-connection socket pump
//!         ├── hub/        Single task owning every session
//!         └── config_file/ Optional TOML settings
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain` and `rocketcar-core` only.  It sees
//!   decoded events and returns deliveries; it never touches a socket.
//! - `infrastructure` depends on all other layers plus `tokio` and
//!   `tokio-tungstenite`.
//!
//! # For beginners: why this structure?
//!
//! All the interesting decisions (who may pair with whom, who hears about a
//! disconnect) live in plain synchronous code that tests can drive event by
//! event.  The async code only moves bytes.

/// Domain layer: plain configuration types (no I/O).
pub mod domain;

/// Application layer: the connection lifecycle state machine.
pub mod application;

/// Infrastructure layer: WebSocket server, hub task, config file.
pub mod infrastructure;

//! Session entities: one per registered desktop or controller connection.
//!
//! # Why ids instead of references? (for beginners)
//!
//! A paired desktop and controller point at each other.  Storing a Rust
//! reference (or an `Rc`) in both directions would create an ownership cycle.
//! Instead each side stores the *id* of its counterpart, and every lookup goes
//! through the [`PeerRegistry`](crate::PeerRegistry), which owns both maps.
//!
//! The pairing fields can only be written from inside this crate
//! (`pub(crate)` setters used by the pairing module), so outside code can read
//! a pairing but never create a half-linked one.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::messages::GameState;

// ── ConnectionId ──────────────────────────────────────────────────────────────

/// Opaque identifier of one transport connection.
///
/// The transport assigns it at accept time and it doubles as the session id
/// of whatever the connection registers as.  On the wire it is a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generates a fresh random id (UUID v4, hyphenated).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── DesktopSession ────────────────────────────────────────────────────────────

/// A registered desktop (the game host that renders the track).
///
/// Deliberately not `Clone`: the registry is the only owner of sessions.
#[derive(Debug, PartialEq)]
pub struct DesktopSession {
    id: ConnectionId,
    paired_controller_id: Option<ConnectionId>,
    last_game_state: GameState,
}

impl DesktopSession {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            paired_controller_id: None,
            last_game_state: GameState::default(),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The controller currently paired with this desktop, if any.
    pub fn paired_controller_id(&self) -> Option<&ConnectionId> {
        self.paired_controller_id.as_ref()
    }

    pub fn is_paired(&self) -> bool {
        self.paired_controller_id.is_some()
    }

    /// The most recent snapshot relayed for this desktop.
    pub fn last_game_state(&self) -> &GameState {
        &self.last_game_state
    }

    pub(crate) fn set_paired_controller(&mut self, controller_id: Option<ConnectionId>) {
        self.paired_controller_id = controller_id;
    }

    pub(crate) fn set_last_game_state(&mut self, state: GameState) {
        self.last_game_state = state;
    }
}

// ── ControllerSession ─────────────────────────────────────────────────────────

/// A registered mobile controller.
#[derive(Debug, PartialEq)]
pub struct ControllerSession {
    id: ConnectionId,
    paired_desktop_id: Option<ConnectionId>,
}

impl ControllerSession {
    pub(crate) fn new(id: ConnectionId) -> Self {
        Self {
            id,
            paired_desktop_id: None,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// The desktop this controller currently drives, if any.
    pub fn paired_desktop_id(&self) -> Option<&ConnectionId> {
        self.paired_desktop_id.as_ref()
    }

    pub fn is_paired(&self) -> bool {
        self.paired_desktop_id.is_some()
    }

    pub(crate) fn set_paired_desktop(&mut self, desktop_id: Option<ConnectionId>) {
        self.paired_desktop_id = desktop_id;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

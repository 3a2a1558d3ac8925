//! Event types for the desktop/controller WebSocket protocol.
//!
//! Every WebSocket text frame carries exactly one JSON object with an
//! `"event"` field naming the event and an optional `"data"` field holding its
//! payload:
//!
//! ```json
//! {"event":"register-desktop"}
//! {"event":"connect-to-desktop","data":"0b7d4c1e-5d55-4a39-9a0e-5f1f3b0c9d12"}
//! {"event":"control","data":{"action":"accelerate"}}
//! ```
//!
//! Serde's adjacently tagged representation (`tag = "event", content = "data"`)
//! handles this automatically.
//!
//! # Why separate inbound and outbound event types?
//!
//! Peers *send* requests (register, pair, control, state updates) and the
//! server *sends* notifications (registered, paired, control-input, ...).
//! Two distinct enums make it a compile-time error to emit a request event to
//! a peer, or to accept a notification event from one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::session::ConnectionId;

// ── Peer → Server events ──────────────────────────────────────────────────────

/// All events a desktop or controller can send to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// The sender is a desktop game host and wants to be discoverable.
    RegisterDesktop,

    /// The sender is a mobile controller and wants the list of free desktops.
    RegisterMobile,

    /// A controller asks to be paired with the named desktop.
    ///
    /// The payload is the bare desktop id string, not an object.
    ConnectToDesktop(ConnectionId),

    /// A controller input.
    ///
    /// `action` stays a raw string here; it is validated against
    /// [`ControlAction`] by the relay so an unknown action is a dropped
    /// relay error rather than an undecodable frame.
    Control { action: String },

    /// A desktop pushes its latest game snapshot.
    GameStateUpdate(GameState),

    /// Latency check.  Answered with [`ServerEvent::Pong`] in any state.
    Ping,
}

impl ClientEvent {
    /// Wire name of the event, used in log lines instead of the full payload.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterDesktop => "register-desktop",
            Self::RegisterMobile => "register-mobile",
            Self::ConnectToDesktop(_) => "connect-to-desktop",
            Self::Control { .. } => "control",
            Self::GameStateUpdate(_) => "game-state-update",
            Self::Ping => "ping",
        }
    }
}

/// Every event name a peer may send.  Used by the codec to tell an unknown
/// event apart from a known event with a malformed payload.
pub const CLIENT_EVENT_NAMES: [&str; 6] = [
    "register-desktop",
    "register-mobile",
    "connect-to-desktop",
    "control",
    "game-state-update",
    "ping",
];

// ── Server → Peer events ──────────────────────────────────────────────────────

/// All events the relay sends to a desktop or controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Registration succeeded; `id` is the sender's own connection id.
    Registered {
        #[serde(rename = "type")]
        kind: PeerKind,
        id: ConnectionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Private reply to `register-mobile`: desktops that can still be paired.
    AvailableDesktops(Vec<DesktopSummary>),

    /// Broadcast to every controller when a new desktop registers.
    DesktopAvailable {
        #[serde(rename = "desktopId")]
        desktop_id: ConnectionId,
    },

    /// Sent to the desktop once a controller has been paired with it.
    ControllerConnected {
        #[serde(rename = "controllerId")]
        controller_id: ConnectionId,
        message: String,
    },

    /// Sent to the controller once its pairing request succeeded.
    ConnectedToDesktop {
        #[serde(rename = "desktopId")]
        desktop_id: ConnectionId,
        message: String,
    },

    /// Sent to the controller when its pairing request was refused.
    ConnectionFailed { message: String },

    /// A validated control action forwarded to the paired desktop.
    ///
    /// `timestamp` is stamped by the server (milliseconds since the Unix epoch).
    ControlInput { action: ControlAction, timestamp: u64 },

    /// A desktop snapshot forwarded verbatim to the paired controller.
    GameState(GameState),

    /// Reply to `ping`, carrying the server time in milliseconds.
    Pong { timestamp: u64 },

    /// Sent to a controller whose desktop went away.
    DesktopDisconnected { message: String },

    /// Sent to a desktop whose controller went away.
    ControllerDisconnected { message: String },
}

impl ServerEvent {
    /// Wire name of the event, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::AvailableDesktops(_) => "available-desktops",
            Self::DesktopAvailable { .. } => "desktop-available",
            Self::ControllerConnected { .. } => "controller-connected",
            Self::ConnectedToDesktop { .. } => "connected-to-desktop",
            Self::ConnectionFailed { .. } => "connection-failed",
            Self::ControlInput { .. } => "control-input",
            Self::GameState(_) => "game-state",
            Self::Pong { .. } => "pong",
            Self::DesktopDisconnected { .. } => "desktop-disconnected",
            Self::ControllerDisconnected { .. } => "controller-disconnected",
        }
    }
}

/// Role reported in [`ServerEvent::Registered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerKind {
    Desktop,
    Mobile,
}

/// One entry of [`ServerEvent::AvailableDesktops`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSummary {
    pub id: ConnectionId,
}

// ── Control actions ───────────────────────────────────────────────────────────

/// The closed set of inputs a controller may send.
///
/// Every press action has a matching `-release` action sent when the button
/// is let go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlAction {
    Left,
    Right,
    Accelerate,
    LeftRelease,
    RightRelease,
    AccelerateRelease,
}

impl ControlAction {
    /// All recognised actions, in wire order.
    pub const ALL: [ControlAction; 6] = [
        ControlAction::Left,
        ControlAction::Right,
        ControlAction::Accelerate,
        ControlAction::LeftRelease,
        ControlAction::RightRelease,
        ControlAction::AccelerateRelease,
    ];

    /// The wire spelling of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Accelerate => "accelerate",
            Self::LeftRelease => "left-release",
            Self::RightRelease => "right-release",
            Self::AccelerateRelease => "accelerate-release",
        }
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ControlAction::from_str`] for a string outside the action set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown control action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for ControlAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControlAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

// ── Game state snapshot ───────────────────────────────────────────────────────

/// A desktop's game snapshot (score, speed, car position, ...).
///
/// The relay treats the snapshot as opaque JSON: whatever the desktop sends is
/// stored and forwarded byte-for-byte equivalent.  The typed accessors exist
/// only for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState(Value);

impl GameState {
    /// Wraps an arbitrary JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The numeric `score` field, if present.
    pub fn score(&self) -> Option<f64> {
        self.0.get("score").and_then(Value::as_f64)
    }

    /// The numeric `speed` field, if present.
    pub fn speed(&self) -> Option<f64> {
        self.0.get("speed").and_then(Value::as_f64)
    }
}

impl Default for GameState {
    /// The zeroed snapshot a desktop starts with before its first update.
    fn default() -> Self {
        Self(serde_json::json!({
            "carX": 0,
            "carY": 0,
            "speed": 0,
            "score": 0,
        }))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

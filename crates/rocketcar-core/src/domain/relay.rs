//! MessageRelay: forwards control inputs and game snapshots across a pairing.
//!
//! The relay never performs I/O.  A successful relay returns the
//! [`Delivery`] it produced (recipient + event) and the caller, the relay hub,
//! puts it on the recipient's outbox.  Deliveries are strictly point-to-point:
//! a control input reaches only the paired desktop, a snapshot only the paired
//! controller.
//!
//! ```text
//! relay_control(C, "left", t)  ──►  Delivery { recipient: D, event: control-input {left, t} }
//! relay_state(D, snapshot)     ──►  Delivery { recipient: C, event: game-state snapshot }
//! ```
//!
//! The relay reads pairing links but never writes them.  Its only mutation is
//! storing the desktop's latest snapshot.

use thiserror::Error;
use tracing::trace;

use crate::domain::error::ErrorKind;
use crate::domain::registry::PeerRegistry;
use crate::domain::session::ConnectionId;
use crate::protocol::messages::{ControlAction, GameState, ServerEvent};

/// One outbound event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: ConnectionId,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(recipient: ConnectionId, event: ServerEvent) -> Self {
        Self { recipient, event }
    }
}

/// Error type for relay operations.
#[derive(Debug, Error, PartialEq)]
pub enum RelayError {
    /// The sender is not a registered controller.
    #[error("controller {0} not found")]
    ControllerNotFound(ConnectionId),

    /// The sender (or the paired counterpart) is not a registered desktop.
    #[error("desktop {0} not found")]
    DesktopNotFound(ConnectionId),

    /// The controller has no desktop to send to.
    #[error("controller {0} is not paired")]
    NotPaired(ConnectionId),

    /// The action string is outside the recognised set.
    #[error("invalid control action '{0}'")]
    InvalidAction(String),
}

impl RelayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ControllerNotFound(_) | Self::DesktopNotFound(_) | Self::NotPaired(_) => {
                ErrorKind::NotFound
            }
            Self::InvalidAction(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Relay operations over a borrowed [`PeerRegistry`].
pub struct MessageRelay<'r> {
    registry: &'r mut PeerRegistry,
}

impl<'r> MessageRelay<'r> {
    pub fn new(registry: &'r mut PeerRegistry) -> Self {
        Self { registry }
    }

    /// Validates a controller input and addresses it to the paired desktop.
    ///
    /// `timestamp_ms` is the server receive time (milliseconds since the Unix
    /// epoch) and is copied into the `control-input` event.
    ///
    /// # Errors
    ///
    /// - [`RelayError::ControllerNotFound`] if the sender is not a controller.
    /// - [`RelayError::NotPaired`] if the controller has no desktop.
    /// - [`RelayError::InvalidAction`] if `action` is not a [`ControlAction`].
    /// - [`RelayError::DesktopNotFound`] if the paired desktop vanished.
    pub fn relay_control(
        &self,
        controller_id: &ConnectionId,
        action: &str,
        timestamp_ms: u64,
    ) -> Result<Delivery, RelayError> {
        let controller = self
            .registry
            .controller(controller_id)
            .ok_or_else(|| RelayError::ControllerNotFound(controller_id.clone()))?;

        let desktop_id = controller
            .paired_desktop_id()
            .ok_or_else(|| RelayError::NotPaired(controller_id.clone()))?;

        let action: ControlAction = action
            .parse()
            .map_err(|_| RelayError::InvalidAction(action.to_string()))?;

        if self.registry.desktop(desktop_id).is_none() {
            return Err(RelayError::DesktopNotFound(desktop_id.clone()));
        }

        trace!(controller = %controller_id, desktop = %desktop_id, %action, "control relayed");
        Ok(Delivery::new(
            desktop_id.clone(),
            ServerEvent::ControlInput {
                action,
                timestamp: timestamp_ms,
            },
        ))
    }

    /// Stores a desktop snapshot and addresses it to the paired controller.
    ///
    /// An unpaired desktop is a silent no-op: `Ok(None)`, nothing stored,
    /// nothing delivered.  Snapshots are best-effort telemetry.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DesktopNotFound`] if the sender is not a desktop.
    pub fn relay_state(
        &mut self,
        desktop_id: &ConnectionId,
        state: GameState,
    ) -> Result<Option<Delivery>, RelayError> {
        let desktop = self
            .registry
            .desktop(desktop_id)
            .ok_or_else(|| RelayError::DesktopNotFound(desktop_id.clone()))?;

        let Some(controller_id) = desktop.paired_controller_id().cloned() else {
            return Ok(None);
        };

        self.registry.record_game_state(desktop_id, state.clone());
        trace!(desktop = %desktop_id, controller = %controller_id, "game state relayed");
        Ok(Some(Delivery::new(controller_id, ServerEvent::GameState(state))))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

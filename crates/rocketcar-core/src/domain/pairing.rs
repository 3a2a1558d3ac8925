//! PairingManager: links exactly one controller to exactly one desktop.
//!
//! # Pairing lifecycle
//!
//! ```text
//!              pair(D, C)                      unpair(D) / unpair_by_controller(C)
//! D: None  ───────────────►  D: Some(C)  ─────────────────────────────────►  D: None
//! C: None                    C: Some(D)                                       C: None
//! ```
//!
//! Both fields change inside one `&mut PeerRegistry` borrow, so no reader can
//! ever see one side linked and the other not.
//!
//! # Re-pairing policy
//!
//! A desktop that already has a controller refuses a second one
//! ([`PairingError::DesktopAlreadyPaired`]).  Symmetrically, a controller that
//! already drives a desktop cannot pair with another one
//! ([`PairingError::ControllerAlreadyPaired`]); it has to be released first,
//! which happens when its desktop disconnects.

use thiserror::Error;
use tracing::info;

use crate::domain::error::ErrorKind;
use crate::domain::registry::PeerRegistry;
use crate::domain::relay::Delivery;
use crate::domain::session::ConnectionId;
use crate::protocol::messages::ServerEvent;

/// Shown on the desktop when a controller pairs with it.
pub const CONTROLLER_CONNECTED_MESSAGE: &str = "Mobile controller connected!";
/// Shown on the controller when its pairing request succeeds.
pub const CONNECTED_TO_DESKTOP_MESSAGE: &str = "Connected to the game!";

/// Error type for pairing requests.
#[derive(Debug, Error, PartialEq)]
pub enum PairingError {
    #[error("desktop {0} not found")]
    DesktopNotFound(ConnectionId),

    #[error("controller {0} not found")]
    ControllerNotFound(ConnectionId),

    #[error("desktop {desktop} is already paired with controller {controller}")]
    DesktopAlreadyPaired {
        desktop: ConnectionId,
        controller: ConnectionId,
    },

    #[error("controller {controller} is already paired with desktop {desktop}")]
    ControllerAlreadyPaired {
        controller: ConnectionId,
        desktop: ConnectionId,
    },
}

impl PairingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DesktopNotFound(_) | Self::ControllerNotFound(_) => ErrorKind::NotFound,
            Self::DesktopAlreadyPaired { .. } | Self::ControllerAlreadyPaired { .. } => {
                ErrorKind::AlreadyPaired
            }
        }
    }

    /// Human-readable reason sent to the requester in `connection-failed`.
    ///
    /// Does not include peer ids.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DesktopNotFound(_) => "Connection impossible. Desktop not available.",
            Self::ControllerNotFound(_) => {
                "Connection impossible. Register as a controller first."
            }
            Self::DesktopAlreadyPaired { .. } => {
                "Connection impossible. This desktop already has a controller."
            }
            Self::ControllerAlreadyPaired { .. } => {
                "Connection impossible. This controller is already connected to a desktop."
            }
        }
    }
}

/// Proof of a successful pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingAck {
    pub desktop_id: ConnectionId,
    pub controller_id: ConnectionId,
}

impl PairingAck {
    /// The two notifications a successful pairing emits: `controller-connected`
    /// for the desktop, then `connected-to-desktop` for the controller.
    pub fn deliveries(&self) -> [Delivery; 2] {
        [
            Delivery::new(
                self.desktop_id.clone(),
                ServerEvent::ControllerConnected {
                    controller_id: self.controller_id.clone(),
                    message: CONTROLLER_CONNECTED_MESSAGE.to_string(),
                },
            ),
            Delivery::new(
                self.controller_id.clone(),
                ServerEvent::ConnectedToDesktop {
                    desktop_id: self.desktop_id.clone(),
                    message: CONNECTED_TO_DESKTOP_MESSAGE.to_string(),
                },
            ),
        ]
    }
}

/// Pairing operations over a borrowed [`PeerRegistry`].
///
/// The manager is a short-lived view: build one, call an operation, drop it.
///
/// ```rust
/// use rocketcar_core::{ConnectionId, PairingManager, PeerRegistry};
///
/// let mut registry = PeerRegistry::new();
/// registry.register_desktop(ConnectionId::from("d1")).unwrap();
/// registry.register_controller(ConnectionId::from("c1")).unwrap();
///
/// let ack = PairingManager::new(&mut registry)
///     .pair(&ConnectionId::from("d1"), &ConnectionId::from("c1"))
///     .unwrap();
/// assert_eq!(ack.controller_id.as_str(), "c1");
/// assert!(registry.is_consistent());
/// ```
pub struct PairingManager<'r> {
    registry: &'r mut PeerRegistry,
}

impl<'r> PairingManager<'r> {
    pub fn new(registry: &'r mut PeerRegistry) -> Self {
        Self { registry }
    }

    /// Links `controller_id` to `desktop_id`.
    ///
    /// Every precondition is checked before anything is written, so a failed
    /// request leaves both sessions exactly as they were.
    ///
    /// # Errors
    ///
    /// - [`PairingError::DesktopNotFound`] / [`PairingError::ControllerNotFound`]
    ///   if either session is missing (desktop checked first).
    /// - [`PairingError::DesktopAlreadyPaired`] if the desktop has a controller.
    /// - [`PairingError::ControllerAlreadyPaired`] if the controller has a desktop.
    pub fn pair(
        &mut self,
        desktop_id: &ConnectionId,
        controller_id: &ConnectionId,
    ) -> Result<PairingAck, PairingError> {
        let desktop = self
            .registry
            .desktop(desktop_id)
            .ok_or_else(|| PairingError::DesktopNotFound(desktop_id.clone()))?;
        let controller = self
            .registry
            .controller(controller_id)
            .ok_or_else(|| PairingError::ControllerNotFound(controller_id.clone()))?;

        if let Some(current) = desktop.paired_controller_id() {
            return Err(PairingError::DesktopAlreadyPaired {
                desktop: desktop_id.clone(),
                controller: current.clone(),
            });
        }
        if let Some(current) = controller.paired_desktop_id() {
            return Err(PairingError::ControllerAlreadyPaired {
                controller: controller_id.clone(),
                desktop: current.clone(),
            });
        }

        self.link(desktop_id, Some(controller_id.clone()));
        self.link_back(controller_id, Some(desktop_id.clone()));

        info!(desktop = %desktop_id, controller = %controller_id, "paired");
        Ok(PairingAck {
            desktop_id: desktop_id.clone(),
            controller_id: controller_id.clone(),
        })
    }

    /// Clears the desktop's pairing (both sides).
    ///
    /// Returns the former controller id so the caller can notify it, or
    /// `None` if the desktop was unpaired or does not exist.
    pub fn unpair(&mut self, desktop_id: &ConnectionId) -> Option<ConnectionId> {
        let controller_id = self
            .registry
            .desktop(desktop_id)?
            .paired_controller_id()?
            .clone();

        self.link(desktop_id, None);
        self.link_back(&controller_id, None);

        info!(desktop = %desktop_id, controller = %controller_id, "unpaired by desktop");
        Some(controller_id)
    }

    /// Clears the controller's pairing (both sides).
    ///
    /// Returns the former desktop id, or `None` if the controller was unpaired
    /// or does not exist.
    pub fn unpair_by_controller(&mut self, controller_id: &ConnectionId) -> Option<ConnectionId> {
        let desktop_id = self
            .registry
            .controller(controller_id)?
            .paired_desktop_id()?
            .clone();

        self.link_back(controller_id, None);
        self.link(&desktop_id, None);

        info!(desktop = %desktop_id, controller = %controller_id, "unpaired by controller");
        Some(desktop_id)
    }

    fn link(&mut self, desktop_id: &ConnectionId, controller_id: Option<ConnectionId>) {
        if let Some(desktop) = self.registry.desktop_mut(desktop_id) {
            desktop.set_paired_controller(controller_id);
        }
    }

    fn link_back(&mut self, controller_id: &ConnectionId, desktop_id: Option<ConnectionId>) {
        if let Some(controller) = self.registry.controller_mut(controller_id) {
            controller.set_paired_desktop(desktop_id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! PeerRegistry: the single owner of every desktop and controller session.
//!
//! The registry holds two disjoint maps keyed by [`ConnectionId`]:
//!
//! ```text
//! desktops:    ConnectionId ──► DesktopSession    { paired_controller_id, last_game_state }
//! controllers: ConnectionId ──► ControllerSession { paired_desktop_id }
//! ```
//!
//! Other components never hold sessions; they look them up by id through the
//! registry.  Pairing links are written only by
//! [`PairingManager`](crate::PairingManager).
//!
//! # HashMap choice
//!
//! `HashMap` gives O(1) lookup by id.  Iteration order is unspecified, which
//! is fine: the list of unpaired desktops is documented as unordered.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::domain::error::ErrorKind;
use crate::domain::session::{ConnectionId, ControllerSession, DesktopSession};
use crate::protocol::messages::GameState;

/// Error type for registry operations.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// The id is already registered, as a desktop or as a controller.
    #[error("session {0} is already registered")]
    DuplicateId(ConnectionId),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateId(_) => ErrorKind::DuplicateRegistration,
        }
    }
}

/// In-memory registry of all registered peers.
///
/// Owned by exactly one task (the relay hub), so it needs no internal locking.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    desktops: HashMap<ConnectionId, DesktopSession>,
    controllers: HashMap<ConnectionId, ControllerSession>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// Inserts a new unpaired desktop with a zeroed game state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if `id` is already registered in
    /// either collection.
    pub fn register_desktop(&mut self, id: ConnectionId) -> Result<&DesktopSession, RegistryError> {
        self.ensure_unused(&id)?;
        debug!(desktop = %id, "desktop session created");
        Ok(self
            .desktops
            .entry(id.clone())
            .or_insert_with(|| DesktopSession::new(id)))
    }

    /// Inserts a new unpaired controller.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateId`] if `id` is already registered in
    /// either collection.
    pub fn register_controller(
        &mut self,
        id: ConnectionId,
    ) -> Result<&ControllerSession, RegistryError> {
        self.ensure_unused(&id)?;
        debug!(controller = %id, "controller session created");
        Ok(self
            .controllers
            .entry(id.clone())
            .or_insert_with(|| ControllerSession::new(id)))
    }

    fn ensure_unused(&self, id: &ConnectionId) -> Result<(), RegistryError> {
        if self.desktops.contains_key(id) || self.controllers.contains_key(id) {
            return Err(RegistryError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    pub fn desktop(&self, id: &ConnectionId) -> Option<&DesktopSession> {
        self.desktops.get(id)
    }

    pub fn controller(&self, id: &ConnectionId) -> Option<&ControllerSession> {
        self.controllers.get(id)
    }

    pub(crate) fn desktop_mut(&mut self, id: &ConnectionId) -> Option<&mut DesktopSession> {
        self.desktops.get_mut(id)
    }

    pub(crate) fn controller_mut(&mut self, id: &ConnectionId) -> Option<&mut ControllerSession> {
        self.controllers.get_mut(id)
    }

    /// Ids of every desktop that can still accept a controller.
    pub fn list_unpaired_desktops(&self) -> Vec<ConnectionId> {
        self.desktops
            .values()
            .filter(|desktop| !desktop.is_paired())
            .map(|desktop| desktop.id().clone())
            .collect()
    }

    /// Ids of every registered controller, paired or not.
    pub fn controller_ids(&self) -> Vec<ConnectionId> {
        self.controllers.keys().cloned().collect()
    }

    pub fn desktop_count(&self) -> usize {
        self.desktops.len()
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Number of live desktop/controller pairs.
    pub fn pair_count(&self) -> usize {
        self.desktops.values().filter(|d| d.is_paired()).count()
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Stores the latest snapshot for a desktop.  Returns `false` if the
    /// desktop is not registered.
    pub(crate) fn record_game_state(&mut self, id: &ConnectionId, state: GameState) -> bool {
        match self.desktops.get_mut(id) {
            Some(desktop) => {
                desktop.set_last_game_state(state);
                true
            }
            None => false,
        }
    }

    /// Removes a desktop session.  No-op if absent.
    ///
    /// If the desktop is still paired, the controller's link is cleared too so
    /// the registry never holds a dangling pairing.  Callers that need to
    /// notify the controller call [`PairingManager::unpair`](crate::PairingManager::unpair)
    /// first.
    pub fn remove_desktop(&mut self, id: &ConnectionId) -> Option<DesktopSession> {
        let removed = self.desktops.remove(id)?;
        if let Some(controller_id) = removed.paired_controller_id() {
            if let Some(controller) = self.controllers.get_mut(controller_id) {
                controller.set_paired_desktop(None);
            }
        }
        debug!(desktop = %id, "desktop session removed");
        Some(removed)
    }

    /// Removes a controller session.  No-op if absent.
    ///
    /// Clears the desktop's link if the controller was still paired.
    pub fn remove_controller(&mut self, id: &ConnectionId) -> Option<ControllerSession> {
        let removed = self.controllers.remove(id)?;
        if let Some(desktop_id) = removed.paired_desktop_id() {
            if let Some(desktop) = self.desktops.get_mut(desktop_id) {
                desktop.set_paired_controller(None);
            }
        }
        debug!(controller = %id, "controller session removed");
        Some(removed)
    }

    // ── Invariant check ───────────────────────────────────────────────────────

    /// Returns `true` if every pairing link has a matching back-link.
    ///
    /// A desktop pointing at controller C requires C to exist and point back,
    /// and vice versa.  Combined with the maps being keyed by id, this makes
    /// the pairing a partial bijection.
    pub fn is_consistent(&self) -> bool {
        let desktops_ok = self.desktops.values().all(|desktop| {
            desktop.paired_controller_id().map_or(true, |cid| {
                self.controllers
                    .get(cid)
                    .and_then(ControllerSession::paired_desktop_id)
                    == Some(desktop.id())
            })
        });
        let controllers_ok = self.controllers.values().all(|controller| {
            controller.paired_desktop_id().map_or(true, |did| {
                self.desktops
                    .get(did)
                    .and_then(DesktopSession::paired_controller_id)
                    == Some(controller.id())
            })
        });
        desktops_ok && controllers_ok
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

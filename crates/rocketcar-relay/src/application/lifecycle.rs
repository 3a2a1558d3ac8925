//! ConnectionHandler: the per-connection state machine of the relay.
//!
//! The handler owns the [`PeerRegistry`] and turns every transport event into
//! a list of [`Delivery`]s.  It never touches a socket: the hub executes the
//! deliveries.  Because one hub task owns the handler and feeds it one event
//! at a time, no two handler steps ever overlap and the registry needs no
//! lock.
//!
//! # Connection lifecycle
//!
//! ```text
//!                 register-desktop            connect-to-desktop (from a controller)
//! Unregistered ─────────────────────► RegisteredDesktop { paired: false } ──► { paired: true }
//!      │          register-mobile
//!      └──────────────────────────► RegisteredController { paired: false } ─► { paired: true }
//!
//! any state ── disconnect ──► Closed   (pairing unwound, counterpart notified)
//! ```
//!
//! A registered connection that registers again (with either role) is first
//! unwound exactly as if it had disconnected, then registered afresh.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use rocketcar_core::protocol::messages::{DesktopSummary, PeerKind};
use rocketcar_core::{
    ClientEvent, ConnectionId, Delivery, ErrorKind, GameState, MessageRelay, PairingManager,
    PeerRegistry, ServerEvent,
};

use crate::application::clock::Clock;

/// Sent back to a desktop with its `registered` reply.
pub const DESKTOP_WAITING_MESSAGE: &str = "Waiting for a mobile controller...";
/// Sent to a controller whose desktop went away.
pub const DESKTOP_DISCONNECTED_MESSAGE: &str = "The game was disconnected.";
/// Sent to a desktop whose controller went away.
pub const CONTROLLER_DISCONNECTED_MESSAGE: &str = "Mobile controller disconnected.";

// ── Events ────────────────────────────────────────────────────────────────────

/// Everything the transport can report about a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A new transport connection was accepted.
    Connected(ConnectionId),
    /// A decoded event arrived on a connection.
    Message {
        from: ConnectionId,
        event: ClientEvent,
    },
    /// The transport connection closed (for any reason).
    Disconnected(ConnectionId),
}

/// Where a connection currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Unregistered,
    RegisteredDesktop { paired: bool },
    RegisteredController { paired: bool },
    /// Not (or no longer) connected.
    Closed,
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// Reacts to connection events and drives the registry, pairing manager, and
/// relay.
pub struct ConnectionHandler<C: Clock> {
    registry: PeerRegistry,
    connections: HashSet<ConnectionId>,
    clock: C,
}

impl<C: Clock> ConnectionHandler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            registry: PeerRegistry::new(),
            connections: HashSet::new(),
            clock,
        }
    }

    /// Read-only view of the sessions, for diagnostics and tests.
    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Number of open transport connections, registered or not.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn state_of(&self, id: &ConnectionId) -> ConnectionState {
        if !self.connections.contains(id) {
            return ConnectionState::Closed;
        }
        if let Some(desktop) = self.registry.desktop(id) {
            return ConnectionState::RegisteredDesktop {
                paired: desktop.is_paired(),
            };
        }
        if let Some(controller) = self.registry.controller(id) {
            return ConnectionState::RegisteredController {
                paired: controller.is_paired(),
            };
        }
        ConnectionState::Unregistered
    }

    /// Processes one event and returns the deliveries it produced, in the
    /// order they must be sent.
    pub fn handle(&mut self, event: PeerEvent) -> Vec<Delivery> {
        let mut out = Vec::new();
        match event {
            PeerEvent::Connected(id) => self.on_connect(id),
            PeerEvent::Message { from, event } => self.on_message(&from, event, &mut out),
            PeerEvent::Disconnected(id) => self.on_disconnect(&id, &mut out),
        }
        debug_assert!(self.registry.is_consistent(), "pairing invariant broken");
        out
    }

    // ── Transport events ──────────────────────────────────────────────────────

    fn on_connect(&mut self, id: ConnectionId) {
        if !self.connections.insert(id.clone()) {
            warn!(conn = %id, "connection id reported twice; ignoring");
            return;
        }
        debug!(conn = %id, "connection opened");
    }

    fn on_disconnect(&mut self, id: &ConnectionId, out: &mut Vec<Delivery>) {
        if !self.connections.remove(id) {
            debug!(conn = %id, "disconnect for unknown connection");
            return;
        }
        self.unwind(id, out);
        info!(
            conn = %id,
            desktops = self.registry.desktop_count(),
            controllers = self.registry.controller_count(),
            "connection closed"
        );
    }

    fn on_message(&mut self, from: &ConnectionId, event: ClientEvent, out: &mut Vec<Delivery>) {
        if !self.connections.contains(from) {
            warn!(conn = %from, event = event.name(), "event from unknown connection dropped");
            return;
        }
        match event {
            ClientEvent::RegisterDesktop => self.register_desktop(from, out),
            ClientEvent::RegisterMobile => self.register_controller(from, out),
            ClientEvent::ConnectToDesktop(desktop_id) => {
                self.connect_to_desktop(from, &desktop_id, out)
            }
            ClientEvent::Control { action } => self.control(from, &action, out),
            ClientEvent::GameStateUpdate(state) => self.game_state_update(from, state, out),
            ClientEvent::Ping => out.push(Delivery::new(
                from.clone(),
                ServerEvent::Pong {
                    timestamp: self.clock.now_millis(),
                },
            )),
        }
    }

    // ── Registration ──────────────────────────────────────────────────────────

    fn register_desktop(&mut self, id: &ConnectionId, out: &mut Vec<Delivery>) {
        self.unwind(id, out);
        if let Err(e) = self.registry.register_desktop(id.clone()) {
            warn!(conn = %id, kind = %e.kind(), "desktop registration failed: {e}");
            return;
        }
        info!(desktop = %id, "desktop registered");

        out.push(Delivery::new(
            id.clone(),
            ServerEvent::Registered {
                kind: PeerKind::Desktop,
                id: id.clone(),
                message: Some(DESKTOP_WAITING_MESSAGE.to_string()),
            },
        ));

        // Discovery is the one broadcast: every controller hears about it and
        // the unpaired ones may act on it.
        for controller_id in self.registry.controller_ids() {
            out.push(Delivery::new(
                controller_id,
                ServerEvent::DesktopAvailable {
                    desktop_id: id.clone(),
                },
            ));
        }
    }

    fn register_controller(&mut self, id: &ConnectionId, out: &mut Vec<Delivery>) {
        self.unwind(id, out);
        if let Err(e) = self.registry.register_controller(id.clone()) {
            warn!(conn = %id, kind = %e.kind(), "controller registration failed: {e}");
            return;
        }
        info!(controller = %id, "controller registered");

        out.push(Delivery::new(
            id.clone(),
            ServerEvent::Registered {
                kind: PeerKind::Mobile,
                id: id.clone(),
                message: None,
            },
        ));

        let available = self
            .registry
            .list_unpaired_desktops()
            .into_iter()
            .map(|id| DesktopSummary { id })
            .collect();
        out.push(Delivery::new(
            id.clone(),
            ServerEvent::AvailableDesktops(available),
        ));
    }

    // ── Pairing ───────────────────────────────────────────────────────────────

    fn connect_to_desktop(
        &mut self,
        controller_id: &ConnectionId,
        desktop_id: &ConnectionId,
        out: &mut Vec<Delivery>,
    ) {
        match PairingManager::new(&mut self.registry).pair(desktop_id, controller_id) {
            Ok(ack) => out.extend(ack.deliveries()),
            Err(e) => {
                match e.kind() {
                    ErrorKind::AlreadyPaired => {
                        info!(controller = %controller_id, desktop = %desktop_id, "pairing refused: {e}")
                    }
                    _ => {
                        debug!(controller = %controller_id, desktop = %desktop_id, "pairing failed: {e}")
                    }
                }
                out.push(Delivery::new(
                    controller_id.clone(),
                    ServerEvent::ConnectionFailed {
                        message: e.user_message().to_string(),
                    },
                ));
            }
        }
    }

    /// Tears down whatever session `id` holds, notifying its counterpart.
    ///
    /// No-op for an unregistered connection.
    fn unwind(&mut self, id: &ConnectionId, out: &mut Vec<Delivery>) {
        if self.registry.desktop(id).is_some() {
            if let Some(controller_id) = PairingManager::new(&mut self.registry).unpair(id) {
                out.push(Delivery::new(
                    controller_id,
                    ServerEvent::DesktopDisconnected {
                        message: DESKTOP_DISCONNECTED_MESSAGE.to_string(),
                    },
                ));
            }
            self.registry.remove_desktop(id);
        } else if self.registry.controller(id).is_some() {
            if let Some(desktop_id) =
                PairingManager::new(&mut self.registry).unpair_by_controller(id)
            {
                out.push(Delivery::new(
                    desktop_id,
                    ServerEvent::ControllerDisconnected {
                        message: CONTROLLER_DISCONNECTED_MESSAGE.to_string(),
                    },
                ));
            }
            self.registry.remove_controller(id);
        }
    }

    // ── Relay ─────────────────────────────────────────────────────────────────

    fn control(&mut self, controller_id: &ConnectionId, action: &str, out: &mut Vec<Delivery>) {
        let now = self.clock.now_millis();
        match MessageRelay::new(&mut self.registry).relay_control(controller_id, action, now) {
            Ok(delivery) => out.push(delivery),
            Err(e) if e.kind() == ErrorKind::InvalidInput => {
                warn!(controller = %controller_id, "control dropped: {e}")
            }
            Err(e) => debug!(controller = %controller_id, "control dropped: {e}"),
        }
    }

    fn game_state_update(
        &mut self,
        desktop_id: &ConnectionId,
        state: GameState,
        out: &mut Vec<Delivery>,
    ) {
        match MessageRelay::new(&mut self.registry).relay_state(desktop_id, state) {
            Ok(Some(delivery)) => out.push(delivery),
            Ok(None) => {}
            Err(e) => debug!(conn = %desktop_id, "game state dropped: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::clock::MockClock;
    use rocketcar_core::ControlAction;
    use serde_json::json;

    const NOW: u64 = 1_700_000_000_123;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    fn handler() -> ConnectionHandler<MockClock> {
        let mut clock = MockClock::new();
        clock.expect_now_millis().return_const(NOW);
        ConnectionHandler::new(clock)
    }

    fn connect(h: &mut ConnectionHandler<MockClock>, conn: &str) {
        let out = h.handle(PeerEvent::Connected(id(conn)));
        assert!(out.is_empty());
    }

    fn send(h: &mut ConnectionHandler<MockClock>, conn: &str, event: ClientEvent) -> Vec<Delivery> {
        h.handle(PeerEvent::Message {
            from: id(conn),
            event,
        })
    }

    fn disconnect(h: &mut ConnectionHandler<MockClock>, conn: &str) -> Vec<Delivery> {
        h.handle(PeerEvent::Disconnected(id(conn)))
    }

    fn desktop(h: &mut ConnectionHandler<MockClock>, conn: &str) {
        connect(h, conn);
        send(h, conn, ClientEvent::RegisterDesktop);
    }

    fn controller(h: &mut ConnectionHandler<MockClock>, conn: &str) {
        connect(h, conn);
        send(h, conn, ClientEvent::RegisterMobile);
    }

    fn pair(h: &mut ConnectionHandler<MockClock>, desktop_id: &str, controller_id: &str) {
        let out = send(h, controller_id, ClientEvent::ConnectToDesktop(id(desktop_id)));
        assert_eq!(out.len(), 2, "pairing must notify both sides: {out:?}");
    }

    fn to<'a>(out: &'a [Delivery], conn: &str) -> Vec<&'a ServerEvent> {
        out.iter()
            .filter(|d| d.recipient == id(conn))
            .map(|d| &d.event)
            .collect()
    }

    // ── Registration ──────────────────────────────────────────────────────────

    #[test]
    fn test_new_connection_is_unregistered() {
        let mut h = handler();
        connect(&mut h, "x");
        assert_eq!(h.state_of(&id("x")), ConnectionState::Unregistered);
        assert_eq!(h.connection_count(), 1);
    }

    #[test]
    fn test_register_desktop_replies_and_broadcasts_to_every_controller() {
        // Arrange: one paired and one unpaired controller already present
        let mut h = handler();
        desktop(&mut h, "d0");
        controller(&mut h, "c1");
        controller(&mut h, "c2");
        pair(&mut h, "d0", "c1");
        connect(&mut h, "d1");

        // Act
        let out = send(&mut h, "d1", ClientEvent::RegisterDesktop);

        // Assert: registered reply first, then one discovery per controller
        assert_eq!(
            out[0],
            Delivery::new(
                id("d1"),
                ServerEvent::Registered {
                    kind: PeerKind::Desktop,
                    id: id("d1"),
                    message: Some(DESKTOP_WAITING_MESSAGE.to_string()),
                }
            )
        );
        let announced = ServerEvent::DesktopAvailable {
            desktop_id: id("d1"),
        };
        assert_eq!(to(&out, "c1"), vec![&announced]);
        assert_eq!(to(&out, "c2"), vec![&announced]);
        assert!(to(&out, "d0").is_empty());
        assert_eq!(
            h.state_of(&id("d1")),
            ConnectionState::RegisteredDesktop { paired: false }
        );
    }

    #[test]
    fn test_register_controller_lists_unpaired_desktops() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        desktop(&mut h, "d2");
        connect(&mut h, "c1");

        // Act
        let out = send(&mut h, "c1", ClientEvent::RegisterMobile);

        // Assert
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|d| d.recipient == id("c1")));
        assert!(matches!(
            out[0].event,
            ServerEvent::Registered { kind: PeerKind::Mobile, .. }
        ));
        match &out[1].event {
            ServerEvent::AvailableDesktops(list) => {
                let mut ids: Vec<_> = list.iter().map(|s| s.id.clone()).collect();
                ids.sort();
                assert_eq!(ids, vec![id("d1"), id("d2")]);
            }
            other => panic!("expected AvailableDesktops, got {other:?}"),
        }
    }

    #[test]
    fn test_available_desktops_excludes_paired_desktop() {
        let mut h = handler();
        desktop(&mut h, "d1");
        desktop(&mut h, "d2");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");
        connect(&mut h, "c2");

        let out = send(&mut h, "c2", ClientEvent::RegisterMobile);

        assert_eq!(
            out[1].event,
            ServerEvent::AvailableDesktops(vec![DesktopSummary { id: id("d2") }])
        );
    }

    // ── Pairing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_pairing_notifies_both_endpoints() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");

        // Act
        let out = send(&mut h, "c1", ClientEvent::ConnectToDesktop(id("d1")));

        // Assert
        assert!(matches!(
            to(&out, "d1")[..],
            [ServerEvent::ControllerConnected { controller_id, .. }] if *controller_id == id("c1")
        ));
        assert!(matches!(
            to(&out, "c1")[..],
            [ServerEvent::ConnectedToDesktop { desktop_id, .. }] if *desktop_id == id("d1")
        ));
        assert_eq!(
            h.state_of(&id("d1")),
            ConnectionState::RegisteredDesktop { paired: true }
        );
        assert_eq!(
            h.state_of(&id("c1")),
            ConnectionState::RegisteredController { paired: true }
        );
    }

    #[test]
    fn test_pairing_with_taken_desktop_fails_for_requester_only() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        controller(&mut h, "c2");
        pair(&mut h, "d1", "c1");

        // Act
        let out = send(&mut h, "c2", ClientEvent::ConnectToDesktop(id("d1")));

        // Assert
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].recipient, id("c2"));
        assert!(matches!(out[0].event, ServerEvent::ConnectionFailed { .. }));
        assert_eq!(
            h.state_of(&id("c2")),
            ConnectionState::RegisteredController { paired: false }
        );
        assert_eq!(
            h.registry().desktop(&id("d1")).unwrap().paired_controller_id(),
            Some(&id("c1"))
        );
    }

    #[test]
    fn test_paired_controller_cannot_switch_desktops() {
        let mut h = handler();
        desktop(&mut h, "d1");
        desktop(&mut h, "d2");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        let out = send(&mut h, "c1", ClientEvent::ConnectToDesktop(id("d2")));

        assert!(matches!(
            to(&out, "c1")[..],
            [ServerEvent::ConnectionFailed { .. }]
        ));
        assert!(to(&out, "d1").is_empty());
        assert!(!h.registry().desktop(&id("d2")).unwrap().is_paired());
    }

    #[test]
    fn test_pairing_request_for_unknown_desktop_fails() {
        let mut h = handler();
        controller(&mut h, "c1");

        let out = send(&mut h, "c1", ClientEvent::ConnectToDesktop(id("nope")));

        assert_eq!(
            out,
            vec![Delivery::new(
                id("c1"),
                ServerEvent::ConnectionFailed {
                    message: "Connection impossible. Desktop not available.".to_string()
                }
            )]
        );
    }

    #[test]
    fn test_pairing_request_from_unregistered_connection_fails() {
        let mut h = handler();
        desktop(&mut h, "d1");
        connect(&mut h, "x");

        let out = send(&mut h, "x", ClientEvent::ConnectToDesktop(id("d1")));

        assert!(matches!(
            to(&out, "x")[..],
            [ServerEvent::ConnectionFailed { .. }]
        ));
        assert!(!h.registry().desktop(&id("d1")).unwrap().is_paired());
    }

    // ── Relay ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_control_is_stamped_and_sent_to_paired_desktop_once() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        desktop(&mut h, "d2");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        // Act
        let out = send(
            &mut h,
            "c1",
            ClientEvent::Control {
                action: "accelerate".to_string(),
            },
        );

        // Assert
        assert_eq!(
            out,
            vec![Delivery::new(
                id("d1"),
                ServerEvent::ControlInput {
                    action: ControlAction::Accelerate,
                    timestamp: NOW,
                }
            )]
        );
    }

    #[test]
    fn test_unknown_action_is_dropped() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        let out = send(
            &mut h,
            "c1",
            ClientEvent::Control {
                action: "self-destruct".to_string(),
            },
        );

        assert!(out.is_empty());
        assert_eq!(
            h.state_of(&id("c1")),
            ConnectionState::RegisteredController { paired: true }
        );
    }

    #[test]
    fn test_control_from_unpaired_controller_is_dropped() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");

        let out = send(
            &mut h,
            "c1",
            ClientEvent::Control {
                action: "left".to_string(),
            },
        );

        assert!(out.is_empty());
    }

    #[test]
    fn test_game_state_is_forwarded_to_paired_controller_once() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        controller(&mut h, "c2");
        pair(&mut h, "d1", "c1");
        let state = GameState::new(json!({"score": 10, "speed": 5}));

        let out = send(&mut h, "d1", ClientEvent::GameStateUpdate(state.clone()));

        assert_eq!(
            out,
            vec![Delivery::new(id("c1"), ServerEvent::GameState(state))]
        );
    }

    #[test]
    fn test_game_state_from_unpaired_desktop_is_silent() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");

        let out = send(
            &mut h,
            "d1",
            ClientEvent::GameStateUpdate(GameState::new(json!({"score": 1}))),
        );

        assert!(out.is_empty());
    }

    #[test]
    fn test_ping_answers_in_any_state_without_mutation() {
        let mut h = handler();
        connect(&mut h, "x");

        let out = send(&mut h, "x", ClientEvent::Ping);

        assert_eq!(
            out,
            vec![Delivery::new(id("x"), ServerEvent::Pong { timestamp: NOW })]
        );
        assert_eq!(h.state_of(&id("x")), ConnectionState::Unregistered);
    }

    // ── Disconnect ────────────────────────────────────────────────────────────

    #[test]
    fn test_paired_desktop_disconnect_notifies_controller_once() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        // Act
        let out = disconnect(&mut h, "d1");

        // Assert
        assert_eq!(
            out,
            vec![Delivery::new(
                id("c1"),
                ServerEvent::DesktopDisconnected {
                    message: DESKTOP_DISCONNECTED_MESSAGE.to_string()
                }
            )]
        );
        assert_eq!(
            h.state_of(&id("c1")),
            ConnectionState::RegisteredController { paired: false }
        );
        assert_eq!(h.state_of(&id("d1")), ConnectionState::Closed);
        assert!(h.registry().desktop(&id("d1")).is_none());
    }

    #[test]
    fn test_paired_controller_disconnect_notifies_desktop_once() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        let out = disconnect(&mut h, "c1");

        assert_eq!(
            out,
            vec![Delivery::new(
                id("d1"),
                ServerEvent::ControllerDisconnected {
                    message: CONTROLLER_DISCONNECTED_MESSAGE.to_string()
                }
            )]
        );
        assert_eq!(
            h.state_of(&id("d1")),
            ConnectionState::RegisteredDesktop { paired: false }
        );
        // The desktop is discoverable again.
        assert_eq!(h.registry().list_unpaired_desktops(), vec![id("d1")]);
    }

    #[test]
    fn test_unpaired_and_unregistered_disconnects_are_silent() {
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        connect(&mut h, "x");

        assert!(disconnect(&mut h, "d1").is_empty());
        assert!(disconnect(&mut h, "c1").is_empty());
        assert!(disconnect(&mut h, "x").is_empty());
        assert!(disconnect(&mut h, "x").is_empty());
        assert_eq!(h.connection_count(), 0);
        assert_eq!(h.registry().desktop_count(), 0);
        assert_eq!(h.registry().controller_count(), 0);
    }

    #[test]
    fn test_event_after_disconnect_is_dropped() {
        let mut h = handler();
        desktop(&mut h, "d1");
        disconnect(&mut h, "d1");

        let out = send(&mut h, "d1", ClientEvent::RegisterDesktop);

        assert!(out.is_empty());
        assert!(h.registry().desktop(&id("d1")).is_none());
    }

    // ── Re-registration ───────────────────────────────────────────────────────

    #[test]
    fn test_reregistering_paired_desktop_creates_fresh_session() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        // Act
        let out = send(&mut h, "d1", ClientEvent::RegisterDesktop);

        // Assert: old pairing unwound first, then the fresh session announced
        let c1_events = to(&out, "c1");
        assert_eq!(c1_events.len(), 2);
        assert!(matches!(c1_events[0], ServerEvent::DesktopDisconnected { .. }));
        assert!(matches!(c1_events[1], ServerEvent::DesktopAvailable { .. }));
        assert_eq!(
            h.state_of(&id("d1")),
            ConnectionState::RegisteredDesktop { paired: false }
        );
        assert!(h.registry().is_consistent());
    }

    #[test]
    fn test_reregistering_paired_controller_notifies_desktop_once() {
        // Arrange
        let mut h = handler();
        desktop(&mut h, "d1");
        controller(&mut h, "c1");
        pair(&mut h, "d1", "c1");

        // Act
        let out = send(&mut h, "c1", ClientEvent::RegisterMobile);

        // Assert: exactly one notice to the desktop, and the controller sees
        // the freed desktop in its fresh list
        assert_eq!(
            to(&out, "d1"),
            vec![&ServerEvent::ControllerDisconnected {
                message: CONTROLLER_DISCONNECTED_MESSAGE.to_string()
            }]
        );
        let c1_events = to(&out, "c1");
        assert_eq!(c1_events.len(), 2);
        assert!(matches!(
            c1_events[0],
            ServerEvent::Registered { kind: PeerKind::Mobile, .. }
        ));
        assert_eq!(
            c1_events[1],
            &ServerEvent::AvailableDesktops(vec![DesktopSummary { id: id("d1") }])
        );
        assert_eq!(
            h.state_of(&id("c1")),
            ConnectionState::RegisteredController { paired: false }
        );
        assert_eq!(
            h.state_of(&id("d1")),
            ConnectionState::RegisteredDesktop { paired: false }
        );
        assert!(h.registry().is_consistent());
    }

    #[test]
    fn test_desktop_reregistering_as_controller_switches_role() {
        let mut h = handler();
        desktop(&mut h, "x");

        send(&mut h, "x", ClientEvent::RegisterMobile);

        assert_eq!(
            h.state_of(&id("x")),
            ConnectionState::RegisteredController { paired: false }
        );
        assert!(h.registry().desktop(&id("x")).is_none());
    }
}

//! The relay hub: one task that owns every session and routes every delivery.
//!
//! # How the pieces talk to each other (for beginners)
//!
//! ```text
//!  connection task A ──HubCommand──┐                      ┌──► outbox A ──► writer A ──► socket A
//!  connection task B ──HubCommand──┼──► hub (this file) ──┼──► outbox B ──► writer B ──► socket B
//!  connection task C ──HubCommand──┘   ConnectionHandler  └──► outbox C ──► writer C ──► socket C
//! ```
//!
//! Every connection task forwards what it reads to the hub over one shared
//! bounded channel.  The hub processes commands strictly one at a time, so
//! the registry inside the [`ConnectionHandler`] is never touched by two
//! tasks at once and needs no `Mutex`.
//!
//! Outbound events go to each connection's own bounded outbox with
//! `try_send`.  The hub never awaits a slow peer: when an outbox is full the
//! event is dropped with a warning, and when the outbox is closed (the
//! connection is going away) the event is dropped silently.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rocketcar_core::{ClientEvent, ConnectionId, Delivery, ServerEvent};

use crate::application::{Clock, ConnectionHandler, PeerEvent};

/// A message from a connection task to the hub.
#[derive(Debug)]
pub enum HubCommand {
    /// A WebSocket handshake completed.  `outbox` is where the hub puts events
    /// for this connection.
    Connect {
        id: ConnectionId,
        outbox: mpsc::Sender<ServerEvent>,
    },
    /// A decoded client event.
    Inbound { id: ConnectionId, event: ClientEvent },
    /// The connection closed, timed out, or failed.
    Disconnect { id: ConnectionId },
}

/// The hub's state: the handler plus one outbox per open connection.
pub struct Hub<C: Clock> {
    handler: ConnectionHandler<C>,
    outboxes: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
}

impl<C: Clock> Hub<C> {
    pub fn new(handler: ConnectionHandler<C>) -> Self {
        Self {
            handler,
            outboxes: HashMap::new(),
        }
    }

    pub fn handler(&self) -> &ConnectionHandler<C> {
        &self.handler
    }

    /// Applies one command and routes the resulting deliveries.
    pub fn apply(&mut self, command: HubCommand) {
        match command {
            HubCommand::Connect { id, outbox } => {
                self.outboxes.insert(id.clone(), outbox);
                let deliveries = self.handler.handle(PeerEvent::Connected(id));
                self.route(deliveries);
            }
            HubCommand::Inbound { id, event } => {
                debug!(conn = %id, event = event.name(), "inbound");
                let deliveries = self.handler.handle(PeerEvent::Message { from: id, event });
                self.route(deliveries);
            }
            HubCommand::Disconnect { id } => {
                // Notifications go to the counterpart, never to the leaver, so
                // the leaver's outbox can be dropped first.
                self.outboxes.remove(&id);
                let deliveries = self.handler.handle(PeerEvent::Disconnected(id));
                self.route(deliveries);
            }
        }
    }

    /// Processes commands until every sender is dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<HubCommand>) {
        info!("relay hub started");
        while let Some(command) = commands.recv().await {
            self.apply(command);
        }
        info!(
            open = self.handler.connection_count(),
            "relay hub stopped"
        );
    }

    fn route(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.deliver(delivery);
        }
    }

    /// Non-blocking send to one outbox.  Returns `false` if the event was
    /// dropped.
    fn deliver(&self, delivery: Delivery) -> bool {
        let Delivery { recipient, event } = delivery;
        let Some(outbox) = self.outboxes.get(&recipient) else {
            debug!(conn = %recipient, event = event.name(), "recipient gone; delivery dropped");
            return false;
        };
        let name = event.name();
        match outbox.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn = %recipient, event = name, "outbox full; delivery dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(conn = %recipient, event = name, "outbox closed; delivery dropped");
                false
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Fan-out seam between the hub and the transport.
//!
//! `Publisher` is the minimal delivery interface the core needs. The
//! in-process implementation encodes each event once and pushes the frame
//! onto per-connection channels; a cross-process relay can implement the
//! same contract and stand in without the hub noticing.

use crate::registry::ConnectionRegistry;
use crate::rooms::RoomDirectory;
use collab_kit_protocol::{ConnectionId, RoomName, ServerEvent};
use std::sync::Arc;

/// Delivery interface for server events. Every method is fire-and-forget:
/// a recipient that is slow or already gone only loses its own events.
pub trait Publisher: Send + Sync {
    /// Deliver to a single connection.
    fn send(&self, conn: ConnectionId, event: &ServerEvent);

    /// Deliver to every member of a room, optionally excluding one.
    fn broadcast_to_room(
        &self,
        room: &RoomName,
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    );

    /// Deliver to every live connection.
    fn broadcast_all(&self, event: &ServerEvent);
}

/// In-process fan-out over the connection registry and room directory.
pub struct LocalPublisher {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
}

impl LocalPublisher {
    pub fn new(registry: Arc<ConnectionRegistry>, rooms: Arc<RoomDirectory>) -> Self {
        Self { registry, rooms }
    }
}

fn encode(event: &ServerEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(error) => {
            tracing::warn!(%error, "failed to encode server event");
            None
        }
    }
}

impl Publisher for LocalPublisher {
    fn send(&self, conn: ConnectionId, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        if let Some(entry) = self.registry.get(conn) {
            entry.send_frame(frame);
        }
    }

    fn broadcast_to_room(
        &self,
        room: &RoomName,
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) {
        let Some(target) = self.rooms.get(room) else { return };
        let Some(frame) = encode(event) else { return };

        for conn in target.member_ids() {
            if Some(conn) == exclude {
                continue;
            }
            if let Some(entry) = self.registry.get(conn) {
                entry.send_frame(frame.clone());
            }
        }
    }

    fn broadcast_all(&self, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        for entry in self.registry.all() {
            entry.send_frame(frame.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_kit_protocol::Identity;
    use tokio::sync::mpsc;

    fn setup() -> (Arc<ConnectionRegistry>, Arc<RoomDirectory>, LocalPublisher) {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(None));
        let publisher = LocalPublisher::new(Arc::clone(&registry), Arc::clone(&rooms));
        (registry, rooms, publisher)
    }

    fn connect(
        registry: &ConnectionRegistry,
        name: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(
            Identity {
                user_id: None,
                display_name: name.to_string(),
            },
            tx,
        );
        (id, rx)
    }

    #[test]
    fn room_broadcast_reaches_members_and_honors_exclude() {
        let (registry, rooms, publisher) = setup();
        let (ana, mut ana_rx) = connect(&registry, "ana");
        let (bo, mut bo_rx) = connect(&registry, "bo");
        let (out, mut out_rx) = connect(&registry, "dehors");

        let name = RoomName("spree".into());
        rooms.join(&name, ana, "ana");
        rooms.join(&name, bo, "bo");

        publisher.broadcast_to_room(
            &name,
            &ServerEvent::Typing {
                user: "ana".into(),
                is_typing: true,
            },
            Some(ana),
        );

        assert!(ana_rx.try_recv().is_err());
        assert!(bo_rx.try_recv().is_ok());
        assert!(out_rx.try_recv().is_err());
        let _ = out;
    }

    #[test]
    fn broadcast_to_missing_room_is_a_no_op() {
        let (_registry, _rooms, publisher) = setup();
        publisher.broadcast_to_room(
            &RoomName("nulle-part".into()),
            &ServerEvent::RoomsList { rooms: vec![] },
            None,
        );
    }

    #[test]
    fn dead_recipient_does_not_stop_the_fan_out() {
        let (registry, rooms, publisher) = setup();
        let (ana, ana_rx) = connect(&registry, "ana");
        let (bo, mut bo_rx) = connect(&registry, "bo");

        let name = RoomName("spree".into());
        rooms.join(&name, ana, "ana");
        rooms.join(&name, bo, "bo");
        drop(ana_rx);

        publisher.broadcast_to_room(
            &name,
            &ServerEvent::RoomsList { rooms: vec![] },
            None,
        );
        assert!(bo_rx.try_recv().is_ok());
    }
}

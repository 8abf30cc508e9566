//! Presence fan-out: member rosters and join/leave notifications.

use crate::now_millis;
use crate::publish::Publisher;
use collab_kit_protocol::{ConnectionId, Notification, NotificationKind, RoomName, ServerEvent};
use std::sync::Arc;

/// Emits the two presence signals on every membership change: the full
/// member list to all room members, and a notification to the members the
/// change is news to.
pub struct PresenceBroadcaster {
    publisher: Arc<dyn Publisher>,
}

impl PresenceBroadcaster {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Announce a membership change. `members` is the roster as of the
    /// change; the actor is excluded from the notification but not from the
    /// roster push. Both emissions are best-effort and independent.
    pub fn announce(
        &self,
        room: &RoomName,
        kind: NotificationKind,
        actor: &str,
        actor_conn: ConnectionId,
        members: Vec<String>,
    ) {
        self.publisher.broadcast_to_room(
            room,
            &ServerEvent::RoomUsers {
                room: room.clone(),
                users: members,
            },
            None,
        );

        self.publisher.broadcast_to_room(
            room,
            &ServerEvent::Notification(notification(kind, actor)),
            Some(actor_conn),
        );
    }
}

/// Build the French notification line for a membership change.
pub fn notification(kind: NotificationKind, actor: &str) -> Notification {
    let message = match kind {
        NotificationKind::Join => format!("{actor} a rejoint le salon."),
        NotificationKind::Leave => format!("{actor} a quitté le salon."),
        NotificationKind::Update => format!("{actor} a mis à jour l'espace."),
    };
    Notification {
        kind,
        actor: actor.to_string(),
        message,
        timestamp: now_millis(),
    }
}

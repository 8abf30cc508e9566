//! Typed command dispatch: the single entry point binding the connection
//! registry, room directory, presence broadcaster and workspace state.
//!
//! Every inbound transport event becomes one `ClientCommand` handled here.
//! Room-scoped work runs under that room's lock and a connection's
//! membership moves are serialized by its room slot, locked slot first.
//! Nothing in this module awaits, so no lock is held across a suspension
//! point.

use crate::error::HubError;
use crate::now_millis;
use crate::presence::PresenceBroadcaster;
use crate::publish::Publisher;
use crate::registry::{ConnectionEntry, ConnectionRegistry};
use crate::rooms::RoomDirectory;
use crate::stats::ServerStats;
use crate::workspace::StrokeInput;
use collab_kit_protocol::{
    ClientCommand, ConnectionId, Identity, NotificationKind, RoomName, RoomSummary, ServerEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The command hub. One per server; cheap to share behind an `Arc`.
pub struct Hub {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
    publisher: Arc<dyn Publisher>,
    presence: PresenceBroadcaster,
    stats: Arc<ServerStats>,
}

impl Hub {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomDirectory>,
        publisher: Arc<dyn Publisher>,
        stats: Arc<ServerStats>,
    ) -> Self {
        let presence = PresenceBroadcaster::new(Arc::clone(&publisher));
        Self {
            registry,
            rooms,
            publisher,
            presence,
            stats,
        }
    }

    /// Register a session. The new connection immediately receives the
    /// current room listing.
    pub fn connect(
        &self,
        identity: Identity,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let conn = self.registry.register(identity.clone(), sender);
        tracing::info!(%conn, user = %identity.display_name, "connection registered");
        self.send_rooms_list_to(conn);
        conn
    }

    /// Tear down a session: leave its room with the usual departure
    /// emissions, then forget the connection.
    pub fn disconnect(&self, conn: ConnectionId) {
        let Some(entry) = self.registry.unregister(conn) else {
            return;
        };

        let mut slot = entry.room_slot();
        let left = slot.take();
        if let Some(room_name) = &left {
            self.leave_room(conn, &entry.identity.display_name, room_name);
        }
        drop(slot);

        if left.is_some() {
            self.push_rooms_list();
        }
        tracing::info!(%conn, user = %entry.identity.display_name, "connection closed");
    }

    /// Dispatch one client command. Structural rejections are answered with
    /// an error event; empty payloads are dropped without a reply.
    pub fn handle(&self, conn: ConnectionId, command: ClientCommand) {
        let Some(entry) = self.registry.get(conn) else {
            return;
        };

        let result = match command {
            ClientCommand::ListRooms => {
                self.send_rooms_list_to(conn);
                Ok(())
            }
            ClientCommand::CreateRoom { room } => self.create_room(&room),
            ClientCommand::Join { room } => self.join(conn, &entry, &room),
            ClientCommand::Leave => self.leave(conn, &entry),
            ClientCommand::Chat { message } => self.chat(&entry, &message),
            ClientCommand::Typing { is_typing } => self.typing(conn, &entry, is_typing),
            ClientCommand::TextUpdate { content, cursor } => {
                self.text_update(&entry, content, cursor)
            }
            ClientCommand::Stroke {
                id,
                points,
                color,
                size,
                tool,
            } => self.stroke(
                conn,
                &entry,
                StrokeInput {
                    id,
                    points,
                    color,
                    size,
                    tool,
                },
            ),
            ClientCommand::ClearCanvas => self.clear_canvas(&entry),
        };

        if let Err(error) = result {
            match error {
                // Defensive drop: the sender hears nothing back.
                HubError::EmptyPayload => {
                    tracing::debug!(%conn, "empty payload dropped");
                }
                _ => {
                    tracing::debug!(%conn, %error, "command rejected");
                    self.publisher.send(
                        conn,
                        &ServerEvent::Error {
                            code: error.code(),
                            message: error.client_message().to_string(),
                        },
                    );
                }
            }
        }
    }

    // ========================================================================
    // Room membership
    // ========================================================================

    fn create_room(&self, raw: &str) -> Result<(), HubError> {
        let name = self.rooms.create(raw)?;
        tracing::info!(room = %name, "room created");
        self.push_rooms_list();
        Ok(())
    }

    fn join(&self, conn: ConnectionId, entry: &ConnectionEntry, raw: &str) -> Result<(), HubError> {
        let name = self.rooms.resolve_join_name(raw)?;
        let mut slot = entry.room_slot();

        if slot.as_ref() == Some(&name) {
            // Re-join of the current room: hand back a fresh snapshot,
            // touch no membership.
            if let Some(room) = self.rooms.get(&name) {
                self.publisher.send(
                    conn,
                    &ServerEvent::RoomJoined {
                        room: name,
                        snapshot: room.snapshot(),
                    },
                );
            }
            return Ok(());
        }

        if let Some(old) = slot.take() {
            self.leave_room(conn, &entry.identity.display_name, &old);
        }

        let outcome = self.rooms.join(&name, conn, &entry.identity.display_name);
        *slot = Some(name.clone());
        drop(slot);

        tracing::info!(%conn, room = %name, user = %entry.identity.display_name, "joined room");
        self.publisher.send(
            conn,
            &ServerEvent::RoomJoined {
                room: name.clone(),
                snapshot: outcome.snapshot,
            },
        );
        self.presence.announce(
            &name,
            NotificationKind::Join,
            &entry.identity.display_name,
            conn,
            outcome.member_names,
        );
        self.push_rooms_list();
        Ok(())
    }

    fn leave(&self, conn: ConnectionId, entry: &ConnectionEntry) -> Result<(), HubError> {
        let mut slot = entry.room_slot();
        let room_name = slot.take().ok_or(HubError::NotInRoom)?;
        self.leave_room(conn, &entry.identity.display_name, &room_name);
        drop(slot);

        self.publisher
            .send(conn, &ServerEvent::RoomLeft { room: room_name });
        self.push_rooms_list();
        Ok(())
    }

    /// Departure mechanics shared by explicit leave, room switch and
    /// disconnect. The caller owns the connection's room slot.
    fn leave_room(&self, conn: ConnectionId, display_name: &str, room_name: &RoomName) {
        let Some(room) = self.rooms.get(room_name) else {
            return;
        };
        match self.rooms.leave(&room, conn) {
            Some(remaining) => {
                self.presence.announce(
                    room_name,
                    NotificationKind::Leave,
                    display_name,
                    conn,
                    remaining,
                );
            }
            None => {
                tracing::info!(room = %room_name, "room deleted, last member left");
            }
        }
    }

    // ========================================================================
    // Room messaging
    // ========================================================================

    fn chat(&self, entry: &ConnectionEntry, message: &str) -> Result<(), HubError> {
        let room = entry.current_room().ok_or(HubError::NotInRoom)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(HubError::EmptyPayload);
        }

        self.stats.record_event();
        self.publisher.broadcast_to_room(
            &room,
            &ServerEvent::Chat {
                username: entry.identity.display_name.clone(),
                room: room.clone(),
                message: message.to_string(),
                timestamp: now_millis(),
            },
            None,
        );
        Ok(())
    }

    fn typing(
        &self,
        conn: ConnectionId,
        entry: &ConnectionEntry,
        is_typing: bool,
    ) -> Result<(), HubError> {
        let room = entry.current_room().ok_or(HubError::NotInRoom)?;
        self.publisher.broadcast_to_room(
            &room,
            &ServerEvent::Typing {
                user: entry.identity.display_name.clone(),
                is_typing,
            },
            Some(conn),
        );
        Ok(())
    }

    // ========================================================================
    // Workspace mutations
    // ========================================================================

    fn text_update(
        &self,
        entry: &ConnectionEntry,
        content: String,
        cursor: Option<serde_json::Value>,
    ) -> Result<(), HubError> {
        let room_name = entry.current_room().ok_or(HubError::NotInRoom)?;
        let room = self.rooms.get(&room_name).ok_or(HubError::NotInRoom)?;

        let version = room.state().workspace.apply_text(content.clone());
        self.stats.record_event();

        self.publisher.broadcast_to_room(
            &room_name,
            &ServerEvent::TextUpdated {
                content,
                version,
                author: entry.identity.display_name.clone(),
                cursor,
                timestamp: now_millis(),
            },
            None,
        );
        Ok(())
    }

    fn stroke(
        &self,
        conn: ConnectionId,
        entry: &ConnectionEntry,
        input: StrokeInput,
    ) -> Result<(), HubError> {
        let room_name = entry.current_room().ok_or(HubError::NotInRoom)?;
        let room = self.rooms.get(&room_name).ok_or(HubError::NotInRoom)?;

        let stroke =
            room.state()
                .workspace
                .apply_stroke(input, &entry.identity.display_name, now_millis())?;
        self.stats.record_event();

        // The author already has the stroke locally.
        self.publisher.broadcast_to_room(
            &room_name,
            &ServerEvent::StrokeAdded { stroke },
            Some(conn),
        );
        Ok(())
    }

    fn clear_canvas(&self, entry: &ConnectionEntry) -> Result<(), HubError> {
        let room_name = entry.current_room().ok_or(HubError::NotInRoom)?;
        let room = self.rooms.get(&room_name).ok_or(HubError::NotInRoom)?;

        let stroke_version = room.state().workspace.clear_strokes();
        self.stats.record_event();

        self.publisher.broadcast_to_room(
            &room_name,
            &ServerEvent::CanvasCleared {
                author: entry.identity.display_name.clone(),
                stroke_version,
                timestamp: now_millis(),
            },
            None,
        );
        Ok(())
    }

    // ========================================================================
    // Listings and monitoring
    // ========================================================================

    fn send_rooms_list_to(&self, conn: ConnectionId) {
        self.publisher.send(
            conn,
            &ServerEvent::RoomsList {
                rooms: self.rooms.list(),
            },
        );
    }

    /// Room set or occupancy changed: push the fresh listing to everyone.
    fn push_rooms_list(&self) {
        self.publisher.broadcast_all(&ServerEvent::RoomsList {
            rooms: self.rooms.list(),
        });
    }

    /// Pre-create rooms at startup. Names already taken are left alone.
    pub fn seed_rooms(&self, names: &[String]) {
        for raw in names {
            match self.rooms.create(raw) {
                Ok(name) => tracing::info!(room = %name, "seed room created"),
                Err(error) => tracing::debug!(room = %raw, %error, "seed room skipped"),
            }
        }
    }

    /// Directory snapshot for the discovery endpoints.
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        self.rooms.list()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}

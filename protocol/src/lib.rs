use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-unique identifier for a live connection.
/// Assigned by the server when a transport session registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Normalized room name. The server owns normalization; values of this type
/// are already lowercased, charset-restricted and length-capped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(pub String);

impl RoomName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated identity attached to a connection.
/// Produced by the auth handler and embedded in the JWT ticket; the core
/// trusts it as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account id, when the auth handler has one.
    pub user_id: Option<String>,
    /// Name shown to other room members.
    pub display_name: String,
}

/// A single point of a stroke, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A drawn stroke as stored in a room's workspace and fanned out to members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: String,
    pub points: Vec<Point>,
    pub color: String,
    pub size: f64,
    pub tool: String,
    pub author: String,
    /// Unix milliseconds at which the server accepted the stroke.
    pub timestamp: u64,
}

/// Full workspace state of a room, sent to a joiner for bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub text: String,
    pub text_version: u64,
    pub strokes: Vec<Stroke>,
    pub stroke_version: u64,
}

/// Room metadata for discovery listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: RoomName,
    pub members: usize,
}

/// What a presence notification announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Join,
    Leave,
    Update,
}

/// Human-readable presence notification delivered to room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Display name of the member the notification is about.
    pub actor: String,
    pub message: String,
    pub timestamp: u64,
}

/// Stable machine-readable codes carried on `ServerEvent::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRoomName,
    RoomAlreadyExists,
    NotInRoom,
    EmptyPayload,
}

/// Commands a client sends over its WebSocket session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Request the current room listing.
    ListRooms,
    /// Explicitly create a room without joining it.
    CreateRoom { room: String },
    /// Join a room, leaving the current one first.
    Join { room: String },
    /// Leave the current room.
    Leave,
    /// Send a chat line to the current room.
    Chat { message: String },
    /// Relay a typing indicator to the other members.
    Typing { is_typing: bool },
    /// Replace the shared text buffer (last writer wins).
    TextUpdate {
        content: String,
        #[serde(default)]
        cursor: Option<serde_json::Value>,
    },
    /// Append a stroke to the shared canvas. Omitted style fields get
    /// server-side defaults.
    Stroke {
        #[serde(default)]
        id: Option<String>,
        points: Vec<Point>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        size: Option<f64>,
        #[serde(default)]
        tool: Option<String>,
    },
    /// Clear the shared canvas.
    ClearCanvas,
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Current room listing, pushed to everyone whenever it changed.
    RoomsList { rooms: Vec<RoomSummary> },
    /// Sent to the joiner with the room's workspace for bootstrap.
    RoomJoined {
        room: RoomName,
        snapshot: WorkspaceSnapshot,
    },
    /// Sent to a member after it left a room.
    RoomLeft { room: RoomName },
    /// Full member list of a room, pushed on every membership change.
    RoomUsers { room: RoomName, users: Vec<String> },
    /// Presence notification about another member.
    Notification(Notification),
    /// Chat line fanned out to the whole room, sender included.
    Chat {
        username: String,
        room: RoomName,
        message: String,
        timestamp: u64,
    },
    /// Typing indicator relayed from another member.
    Typing { user: String, is_typing: bool },
    /// Shared text buffer changed.
    TextUpdated {
        content: String,
        version: u64,
        author: String,
        cursor: Option<serde_json::Value>,
        timestamp: u64,
    },
    /// A stroke was accepted, with defaults filled in.
    StrokeAdded { stroke: Stroke },
    /// The canvas was cleared.
    CanvasCleared {
        author: String,
        stroke_version: u64,
        timestamp: u64,
    },
    /// A command was rejected.
    Error { code: ErrorCode, message: String },
}

/// Claims embedded in the JWT ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketClaims {
    /// Expiration timestamp (Unix seconds).
    pub exp: u64,
    /// Identity established by the auth handler.
    pub identity: Identity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_command_fills_omitted_style_fields_with_none() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"stroke","points":[{"x":1.0,"y":2.0}]}"#).unwrap();
        match cmd {
            ClientCommand::Stroke {
                id,
                points,
                color,
                size,
                tool,
            } => {
                assert_eq!(id, None);
                assert_eq!(points.len(), 1);
                assert_eq!(color, None);
                assert_eq!(size, None);
                assert_eq!(tool, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn text_update_with_non_string_content_is_rejected_at_parse() {
        let result =
            serde_json::from_str::<ClientCommand>(r#"{"type":"text_update","content":42}"#);
        assert!(result.is_err());
    }

    #[test]
    fn error_codes_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ServerEvent::Error {
            code: ErrorCode::RoomAlreadyExists,
            message: "Ce salon existe déjà.".into(),
        })
        .unwrap();
        assert!(json.contains(r#""code":"room_already_exists""#));
        assert!(json.contains(r#""type":"error""#));
    }

    #[test]
    fn notification_event_inlines_its_fields() {
        let json = serde_json::to_string(&ServerEvent::Notification(Notification {
            kind: NotificationKind::Join,
            actor: "ana".into(),
            message: "ana a rejoint le salon.".into(),
            timestamp: 7,
        }))
        .unwrap();
        assert!(json.contains(r#""type":"notification""#));
        assert!(json.contains(r#""kind":"join""#));
    }
}

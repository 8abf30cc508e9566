use collab_kit_protocol::ErrorCode;
use thiserror::Error;

/// Rejection of a client command. The first three variants are sent back to
/// the offending client as an `error` event; `EmptyPayload` commands are
/// dropped without a reply.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubError {
    #[error("room name is empty after normalization")]
    InvalidRoomName,

    #[error("room already exists")]
    RoomAlreadyExists,

    #[error("connection is not in a room")]
    NotInRoom,

    #[error("payload is empty")]
    EmptyPayload,
}

impl HubError {
    /// Stable machine-readable code carried on the wire.
    pub fn code(&self) -> ErrorCode {
        match self {
            HubError::InvalidRoomName => ErrorCode::InvalidRoomName,
            HubError::RoomAlreadyExists => ErrorCode::RoomAlreadyExists,
            HubError::NotInRoom => ErrorCode::NotInRoom,
            HubError::EmptyPayload => ErrorCode::EmptyPayload,
        }
    }

    /// End-user message shown by clients.
    pub fn client_message(&self) -> &'static str {
        match self {
            HubError::InvalidRoomName => "Veuillez saisir un nom de salon.",
            HubError::RoomAlreadyExists => "Ce salon existe déjà.",
            HubError::NotInRoom => "Vous n'êtes dans aucun salon.",
            HubError::EmptyPayload => "Le contenu est vide.",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

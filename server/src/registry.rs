//! Live connection tracking.
//!
//! Every transport session registers here after its ticket is validated and
//! unregisters when the socket goes away. The entry owns the session's
//! outbound frame channel and its current-room slot.

use collab_kit_protocol::{ConnectionId, Identity, RoomName};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// One registered connection.
pub struct ConnectionEntry {
    /// Identity established by the auth handler; trusted as-is.
    pub identity: Identity,
    /// Outbound frames (JSON-encoded events). Unbounded, so fan-out never
    /// blocks on a slow session.
    sender: mpsc::UnboundedSender<String>,
    /// Room the connection is currently in. Locked for the whole of a
    /// join/leave sequence; acquired before any room lock, never after.
    room: Mutex<Option<RoomName>>,
}

impl ConnectionEntry {
    /// Queue an encoded frame. Returns `false` when the session is gone;
    /// callers treat that as a skipped delivery, not a failure.
    pub fn send_frame(&self, frame: String) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Room the connection is in right now, if any.
    pub fn current_room(&self) -> Option<RoomName> {
        self.room_slot().clone()
    }

    pub(crate) fn room_slot(&self) -> MutexGuard<'_, Option<RoomName>> {
        self.room.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of live connections.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ConnectionEntry>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a session and allocate its connection id.
    pub fn register(
        &self,
        identity: Identity,
        sender: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let entry = Arc::new(ConnectionEntry {
            identity,
            sender,
            room: Mutex::new(None),
        });
        self.connections.insert(id, entry);
        id
    }

    /// Drop a connection from the registry. The returned entry stays valid
    /// for the caller's room cleanup.
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.remove(&id).map(|(_, entry)| entry)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<ConnectionEntry>> {
        self.connections.get(&id).map(|e| Arc::clone(e.value()))
    }

    /// Snapshot of every live entry, for whole-server fan-out.
    pub fn all(&self) -> Vec<Arc<ConnectionEntry>> {
        self.connections
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

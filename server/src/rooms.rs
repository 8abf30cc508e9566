//! Room directory: name-normalized rooms with create-on-first-join and
//! delete-on-last-leave lifecycle.
//!
//! Each room carries its member list and workspace behind a single mutex,
//! so membership changes and workspace edits serialize per room while
//! distinct rooms proceed in parallel. Critical sections are sync and never
//! held across an await.

use crate::error::HubError;
use crate::workspace::Workspace;
use collab_kit_protocol::{ConnectionId, RoomName, RoomSummary, WorkspaceSnapshot};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Longest room name kept after normalization.
pub const MAX_ROOM_NAME_LEN: usize = 40;

/// Normalize a raw, client-supplied room name: trim, collapse whitespace
/// runs, lowercase, map everything outside `[a-z0-9-]` to `-`, cap at
/// [`MAX_ROOM_NAME_LEN`]. Returns `None` when nothing is left.
pub fn normalize_room_name(raw: &str) -> Option<RoomName> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut name = String::with_capacity(collapsed.len().min(MAX_ROOM_NAME_LEN));
    for c in collapsed.to_lowercase().chars() {
        name.push(match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '-',
        });
        if name.len() == MAX_ROOM_NAME_LEN {
            break;
        }
    }
    if name.is_empty() {
        None
    } else {
        Some(RoomName(name))
    }
}

/// A room member, in join order.
#[derive(Debug, Clone)]
pub struct Member {
    pub conn: ConnectionId,
    pub display_name: String,
}

/// Mutable state of one room. Membership and workspace share the lock.
pub(crate) struct RoomState {
    pub members: Vec<Member>,
    pub workspace: Workspace,
    /// Set under the lock right before the room leaves the map. A joiner
    /// that raced the removal sees it and retries on a fresh room.
    pub closed: bool,
}

/// One live room. Shared between the directory and in-flight operations.
pub struct Room {
    pub name: RoomName,
    state: Mutex<RoomState>,
}

impl Room {
    fn new(name: RoomName) -> Self {
        Self {
            name,
            state: Mutex::new(RoomState {
                members: Vec::new(),
                workspace: Workspace::new(),
                closed: false,
            }),
        }
    }

    /// Lock the room. A poisoned lock keeps serving the last state; the
    /// data is ephemeral either way.
    pub(crate) fn state(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Member connection ids, for fan-out.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.state().members.iter().map(|m| m.conn).collect()
    }

    /// Member display names, in join order.
    pub fn member_names(&self) -> Vec<String> {
        self.state()
            .members
            .iter()
            .map(|m| m.display_name.clone())
            .collect()
    }

    pub fn member_count(&self) -> usize {
        self.state().members.len()
    }

    /// Workspace copy for bootstrap.
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.state().workspace.snapshot()
    }
}

/// What a join produced: the room, its workspace for bootstrap, and the
/// member names after the join.
pub struct JoinOutcome {
    pub room: Arc<Room>,
    pub snapshot: WorkspaceSnapshot,
    pub member_names: Vec<String>,
}

/// Directory of live rooms.
pub struct RoomDirectory {
    rooms: DashMap<RoomName, Arc<Room>>,
    /// Room a join lands in when its name normalizes to nothing.
    fallback: Option<RoomName>,
}

impl RoomDirectory {
    /// `fallback_room` is consulted when a join's name normalizes to
    /// nothing; pass `None` to reject such joins instead.
    pub fn new(fallback_room: Option<&str>) -> Self {
        Self {
            rooms: DashMap::new(),
            fallback: fallback_room.and_then(normalize_room_name),
        }
    }

    /// Resolve a raw name for a join, applying the fallback.
    pub fn resolve_join_name(&self, raw: &str) -> Result<RoomName, HubError> {
        normalize_room_name(raw)
            .or_else(|| self.fallback.clone())
            .ok_or(HubError::InvalidRoomName)
    }

    /// Explicitly create a room without joining it. Never falls back.
    pub fn create(&self, raw: &str) -> Result<RoomName, HubError> {
        let name = normalize_room_name(raw).ok_or(HubError::InvalidRoomName)?;
        match self.rooms.entry(name.clone()) {
            Entry::Occupied(_) => Err(HubError::RoomAlreadyExists),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Room::new(name.clone())));
                Ok(name)
            }
        }
    }

    /// Add a member to `name`, creating the room on first join.
    pub fn join(&self, name: &RoomName, conn: ConnectionId, display_name: &str) -> JoinOutcome {
        loop {
            let room = Arc::clone(
                &self
                    .rooms
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(Room::new(name.clone()))),
            );

            let mut state = room.state();
            if state.closed {
                drop(state);
                // Raced a delete-on-empty; drop the corpse and retry.
                self.rooms.remove_if(name, |_, r| Arc::ptr_eq(r, &room));
                continue;
            }

            state.members.push(Member {
                conn,
                display_name: display_name.to_string(),
            });
            let snapshot = state.workspace.snapshot();
            let member_names = state
                .members
                .iter()
                .map(|m| m.display_name.clone())
                .collect();
            drop(state);

            return JoinOutcome {
                room,
                snapshot,
                member_names,
            };
        }
    }

    /// Remove a member. The last leave deletes the room atomically with the
    /// removal. Returns the remaining member names, `None` when the room
    /// was deleted.
    pub fn leave(&self, room: &Arc<Room>, conn: ConnectionId) -> Option<Vec<String>> {
        let mut state = room.state();
        state.members.retain(|m| m.conn != conn);

        if state.members.is_empty() {
            state.closed = true;
            drop(state);
            self.rooms.remove_if(&room.name, |_, r| Arc::ptr_eq(r, room));
            None
        } else {
            let remaining = state
                .members
                .iter()
                .map(|m| m.display_name.clone())
                .collect();
            Some(remaining)
        }
    }

    pub fn get(&self, name: &RoomName) -> Option<Arc<Room>> {
        self.rooms.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Stable snapshot of the directory, sorted by name. Rooms created
    /// explicitly and not yet joined show up with zero members.
    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .iter()
            .filter_map(|entry| {
                let state = entry.value().state();
                if state.closed {
                    return None;
                }
                Some(RoomSummary {
                    name: entry.key().clone(),
                    members: state.members.len(),
                })
            })
            .collect();
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        rooms
    }
}

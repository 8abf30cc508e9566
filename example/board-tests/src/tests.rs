//! Integration tests driving the real hub through simulated sessions.

use crate::harness::{BoardTestHarness, SessionHandle};
use collab_kit_protocol::{
    ClientCommand, ErrorCode, Notification, NotificationKind, Point, ServerEvent,
};

// ============================================================================
// Helper functions
// ============================================================================

fn join(session: &SessionHandle, room: &str) {
    session.send(ClientCommand::Join {
        room: room.to_string(),
    });
}

fn notifications(events: &[ServerEvent]) -> Vec<&Notification> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::Notification(n) => Some(n),
            _ => None,
        })
        .collect()
}

fn rosters(events: &[ServerEvent]) -> Vec<Vec<String>> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::RoomUsers { users, .. } => Some(users.clone()),
            _ => None,
        })
        .collect()
}

fn names(users: &[&str]) -> Vec<String> {
    users.iter().map(|u| u.to_string()).collect()
}

// ============================================================================
// Joining and presence
// ============================================================================

#[test]
fn test_join_delivers_snapshot_then_presence() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    ana.drain();

    join(&ana, "design");
    let events = ana.drain();

    match &events[0] {
        ServerEvent::RoomJoined { room, snapshot } => {
            assert_eq!(room.as_str(), "design");
            assert_eq!(snapshot.text, "");
            assert_eq!(snapshot.text_version, 0);
            assert!(snapshot.strokes.is_empty());
            assert_eq!(snapshot.stroke_version, 0);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }
    assert_eq!(rosters(&events), vec![names(&["Ana"])]);
    // Nobody is notified about their own arrival.
    assert!(notifications(&events).is_empty());
}

#[test]
fn test_second_join_notifies_existing_members_in_french() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    join(&ana, "design");
    ana.drain();

    let mut bruno = harness.connect_user("Bruno");
    bruno.drain();
    join(&bruno, "design");

    let ana_events = ana.drain();
    assert_eq!(rosters(&ana_events), vec![names(&["Ana", "Bruno"])]);
    let notes = notifications(&ana_events);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Join);
    assert_eq!(notes[0].actor, "Bruno");
    assert_eq!(notes[0].message, "Bruno a rejoint le salon.");

    let bruno_events = bruno.drain();
    assert!(matches!(bruno_events[0], ServerEvent::RoomJoined { .. }));
    assert!(notifications(&bruno_events).is_empty());
}

#[test]
fn test_leave_updates_roster_and_listing() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "design");
    join(&bruno, "design");
    ana.drain();
    bruno.drain();

    bruno.send(ClientCommand::Leave);

    let bruno_events = bruno.drain();
    assert!(matches!(
        bruno_events[0],
        ServerEvent::RoomLeft { ref room } if room.as_str() == "design"
    ));

    let ana_events = ana.drain();
    assert_eq!(rosters(&ana_events), vec![names(&["Ana"])]);
    let notes = notifications(&ana_events);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Leave);
    assert_eq!(notes[0].message, "Bruno a quitté le salon.");

    let listing = harness.hub().list_rooms();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].members, 1);
}

#[test]
fn test_switching_rooms_moves_membership() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "design");
    join(&bruno, "design");
    ana.drain();
    bruno.drain();

    join(&bruno, "dev");

    let ana_events = ana.drain();
    assert_eq!(rosters(&ana_events), vec![names(&["Ana"])]);
    assert_eq!(notifications(&ana_events)[0].kind, NotificationKind::Leave);

    let bruno_events = bruno.drain();
    assert!(matches!(
        bruno_events[0],
        ServerEvent::RoomJoined { ref room, .. } if room.as_str() == "dev"
    ));

    // Listing is name-ordered with one member on each side.
    let listing = harness.hub().list_rooms();
    let summary: Vec<(String, usize)> = listing
        .iter()
        .map(|r| (r.name.as_str().to_string(), r.members))
        .collect();
    assert_eq!(
        summary,
        vec![("design".to_string(), 1), ("dev".to_string(), 1)]
    );
}

#[test]
fn test_last_disconnect_deletes_the_room() {
    let harness = BoardTestHarness::new();
    let ana = harness.connect_user("Ana");
    let bruno = harness.connect_user("Bruno");
    join(&ana, "design");
    join(&bruno, "design");

    bruno.disconnect();
    ana.disconnect();

    assert!(harness.hub().list_rooms().is_empty());
    assert_eq!(harness.hub().connection_count(), 0);
}

#[test]
fn test_disconnect_notifies_remaining_members() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let bruno = harness.connect_user("Bruno");
    join(&ana, "design");
    join(&bruno, "design");
    ana.drain();

    bruno.disconnect();

    let ana_events = ana.drain();
    assert_eq!(rosters(&ana_events), vec![names(&["Ana"])]);
    let notes = notifications(&ana_events);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Leave);
    assert_eq!(notes[0].actor, "Bruno");
}

// ============================================================================
// Workspace collaboration
// ============================================================================

#[test]
fn test_text_updates_reach_the_whole_room() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "atelier");
    join(&bruno, "atelier");
    ana.drain();
    bruno.drain();

    bruno.send(ClientCommand::TextUpdate {
        content: "Bonjour tout le monde".to_string(),
        cursor: None,
    });

    for session in [&mut ana, &mut bruno] {
        let events = session.drain();
        match &events[0] {
            ServerEvent::TextUpdated {
                content,
                version,
                author,
                ..
            } => {
                assert_eq!(content, "Bonjour tout le monde");
                assert_eq!(*version, 1);
                assert_eq!(author, "Bruno");
            }
            other => panic!("Expected TextUpdated, got {:?}", other),
        }
    }
}

#[test]
fn test_strokes_fan_out_to_others_only() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "atelier");
    join(&bruno, "atelier");
    ana.drain();
    bruno.drain();

    bruno.send(ClientCommand::Stroke {
        id: None,
        points: vec![Point { x: 10.0, y: 20.0 }, Point { x: 30.0, y: 40.0 }],
        color: None,
        size: None,
        tool: None,
    });

    let ana_events = ana.drain();
    match &ana_events[0] {
        ServerEvent::StrokeAdded { stroke } => {
            assert_eq!(stroke.id, "stroke-1");
            assert_eq!(stroke.points.len(), 2);
            assert_eq!(stroke.color, "#111827");
            assert_eq!(stroke.size, 2.0);
            assert_eq!(stroke.tool, "pen");
            assert_eq!(stroke.author, "Bruno");
        }
        other => panic!("Expected StrokeAdded, got {:?}", other),
    }

    // The author already has the stroke locally.
    assert!(bruno.drain().is_empty());
}

#[test]
fn test_empty_strokes_are_dropped_silently() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "atelier");
    join(&bruno, "atelier");
    ana.drain();
    bruno.drain();

    bruno.send(ClientCommand::Stroke {
        id: None,
        points: Vec::new(),
        color: None,
        size: None,
        tool: None,
    });

    assert!(ana.drain().is_empty());
    assert!(bruno.drain().is_empty());
}

#[test]
fn test_clear_canvas_reaches_everyone() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "atelier");
    join(&bruno, "atelier");

    bruno.send(ClientCommand::Stroke {
        id: None,
        points: vec![Point { x: 1.0, y: 1.0 }],
        color: None,
        size: None,
        tool: None,
    });
    ana.drain();
    bruno.drain();

    bruno.send(ClientCommand::ClearCanvas);

    for session in [&mut ana, &mut bruno] {
        let events = session.drain();
        match &events[0] {
            ServerEvent::CanvasCleared {
                author,
                stroke_version,
                ..
            } => {
                assert_eq!(author, "Bruno");
                assert_eq!(*stroke_version, 2);
            }
            other => panic!("Expected CanvasCleared, got {:?}", other),
        }
    }
}

#[test]
fn test_late_joiner_receives_accumulated_state() {
    let harness = BoardTestHarness::new();
    let ana = harness.connect_user("Ana");
    join(&ana, "atelier");
    ana.send(ClientCommand::TextUpdate {
        content: "esquisse".to_string(),
        cursor: None,
    });
    ana.send(ClientCommand::Stroke {
        id: Some("trace-7".to_string()),
        points: vec![Point { x: 5.0, y: 5.0 }],
        color: Some("#ff0000".to_string()),
        size: Some(4.0),
        tool: Some("marker".to_string()),
    });

    let mut bruno = harness.connect_user("Bruno");
    bruno.drain();
    join(&bruno, "atelier");

    let events = bruno.drain();
    match &events[0] {
        ServerEvent::RoomJoined { snapshot, .. } => {
            assert_eq!(snapshot.text, "esquisse");
            assert_eq!(snapshot.text_version, 1);
            assert_eq!(snapshot.strokes.len(), 1);
            assert_eq!(snapshot.strokes[0].id, "trace-7");
            assert_eq!(snapshot.strokes[0].color, "#ff0000");
            assert_eq!(snapshot.stroke_version, 1);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }
}

// ============================================================================
// Chat and typing relay
// ============================================================================

#[test]
fn test_chat_reaches_everyone_and_typing_skips_the_sender() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    join(&ana, "design");
    join(&bruno, "design");
    ana.drain();
    bruno.drain();

    ana.send(ClientCommand::Chat {
        message: "  Salut !  ".to_string(),
    });
    bruno.send(ClientCommand::Typing { is_typing: true });

    let ana_events = ana.drain();
    assert!(ana_events.iter().any(|e| matches!(
        e,
        ServerEvent::Chat { username, room, message, .. }
            if username == "Ana" && room.as_str() == "design" && message == "Salut !"
    )));
    assert!(ana_events.iter().any(|e| matches!(
        e,
        ServerEvent::Typing { user, is_typing } if user == "Bruno" && *is_typing
    )));

    let bruno_events = bruno.drain();
    assert!(bruno_events.iter().any(|e| matches!(
        e,
        ServerEvent::Chat { username, .. } if username == "Ana"
    )));
    // Typing indicators are not echoed back.
    assert!(!bruno_events
        .iter()
        .any(|e| matches!(e, ServerEvent::Typing { .. })));
}

// ============================================================================
// Room directory
// ============================================================================

#[test]
fn test_duplicate_create_is_rejected_after_normalization() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    ana.drain();

    ana.send(ClientCommand::CreateRoom {
        room: "General".to_string(),
    });
    let events = ana.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::RoomsList { rooms } if rooms.len() == 1 && rooms[0].name.as_str() == "general"
    )));

    ana.send(ClientCommand::CreateRoom {
        room: "  GENERAL  ".to_string(),
    });
    let events = ana.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::RoomAlreadyExists, message }
            if message == "Ce salon existe déjà."
    )));
}

#[test]
fn test_rooms_list_is_pushed_to_every_connection() {
    let harness = BoardTestHarness::new();
    let mut ana = harness.connect_user("Ana");
    let mut bruno = harness.connect_user("Bruno");
    ana.drain();
    bruno.drain();

    ana.send(ClientCommand::CreateRoom {
        room: "veille".to_string(),
    });

    for session in [&mut ana, &mut bruno] {
        let events = session.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::RoomsList { rooms }
                if rooms.len() == 1 && rooms[0].name.as_str() == "veille" && rooms[0].members == 0
        )));
    }
}

#[test]
fn test_unusable_join_name_without_fallback_is_rejected() {
    let harness = BoardTestHarness::with_fallback(None);
    let mut ana = harness.connect_user("Ana");
    ana.drain();

    join(&ana, "      ");
    let events = ana.drain();
    assert!(events.iter().any(|e| matches!(
        e,
        ServerEvent::Error { code: ErrorCode::InvalidRoomName, message }
            if message == "Veuillez saisir un nom de salon."
    )));
}

//! Test harness for hub sessions.
//!
//! Sessions talk to the hub exactly as the WebSocket layer does, minus
//! the socket: commands dispatch synchronously and outbound frames are
//! decoded back into server events.

use collab_kit_protocol::{ClientCommand, ConnectionId, Identity, ServerEvent};
use collab_kit_server::hub::Hub;
use collab_kit_server::publish::LocalPublisher;
use collab_kit_server::registry::ConnectionRegistry;
use collab_kit_server::rooms::RoomDirectory;
use collab_kit_server::stats::ServerStats;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Test harness owning one hub instance.
pub struct BoardTestHarness {
    hub: Arc<Hub>,
}

impl BoardTestHarness {
    pub fn new() -> Self {
        Self::with_fallback(Some("general"))
    }

    pub fn with_fallback(fallback_room: Option<&str>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(fallback_room));
        let publisher = Arc::new(LocalPublisher::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
        ));
        let hub = Arc::new(Hub::new(
            registry,
            rooms,
            publisher,
            Arc::new(ServerStats::new()),
        ));
        Self { hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Connect a new user and return their session handle.
    pub fn connect_user(&self, display_name: &str) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = self.hub.connect(
            Identity {
                user_id: None,
                display_name: display_name.to_string(),
            },
            tx,
        );
        SessionHandle {
            conn,
            hub: Arc::clone(&self.hub),
            from_server: rx,
        }
    }
}

impl Default for BoardTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// One simulated client session.
pub struct SessionHandle {
    pub conn: ConnectionId,
    hub: Arc<Hub>,
    from_server: mpsc::UnboundedReceiver<String>,
}

impl SessionHandle {
    /// Send a command to the hub, as the socket layer would.
    pub fn send(&self, command: ClientCommand) {
        self.hub.handle(self.conn, command);
    }

    /// Receive one event (non-blocking).
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        let frame = self.from_server.try_recv().ok()?;
        serde_json::from_str(&frame).ok()
    }

    /// Drain all pending events.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }

    /// Close the session, as a dropped socket would.
    pub fn disconnect(&self) {
        self.hub.disconnect(self.conn);
    }
}

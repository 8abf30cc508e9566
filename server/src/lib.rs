pub mod builder;
pub mod error;
pub mod hub;
pub mod presence;
pub mod publish;
pub mod registry;
pub mod rest;
pub mod rooms;
pub mod stats;
pub mod ticket;
pub mod workspace;
pub mod ws;

use crate::hub::Hub;
use crate::publish::{LocalPublisher, Publisher};
use crate::registry::ConnectionRegistry;
use crate::rest::AppState;
use crate::rooms::RoomDirectory;
use crate::stats::{ServerStats, ROLL_INTERVAL};
use crate::ticket::TicketManager;
use crate::ws::WsState;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use collab_kit_protocol::Identity;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub use builder::ServerBuilder;
pub use error::{HubError, ServerError};

/// Type alias for auth handler boxed future.
pub type AuthFuture = Pin<Box<dyn Future<Output = Result<Identity, String>> + Send>>;

/// The main server struct; construct through [`ServerBuilder`].
pub struct Server {
    config: ServerConfig,
    auth_handler: Arc<dyn Fn(AuthRequest) -> AuthFuture + Send + Sync>,
    jwt_secret: Vec<u8>,
}

/// Configuration for the server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind HTTP server.
    pub http_addr: String,
    /// JWT ticket expiry in seconds.
    pub ticket_expiry_secs: u64,
    /// Room that joins with unusable names fall back to. None rejects them.
    pub fallback_room: Option<String>,
    /// Rooms created at startup.
    pub seed_rooms: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            ticket_expiry_secs: 3600, // 1 hour
            fallback_room: Some("general".to_string()),
            seed_rooms: Vec::new(),
        }
    }
}

/// Request data passed to the auth handler.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Headers from the HTTP request (for API keys, OAuth tokens, etc.)
    pub headers: std::collections::HashMap<String, String>,
    /// Optional body data.
    pub body: Option<Vec<u8>>,
}

/// Wall-clock milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Wall-clock seconds since the Unix epoch.
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Run the server.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on HTTP {}", self.config.http_addr);

        // Create shared state
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new(self.config.fallback_room.as_deref()));
        let publisher: Arc<dyn Publisher> =
            Arc::new(LocalPublisher::new(Arc::clone(&registry), Arc::clone(&rooms)));
        let stats = Arc::new(ServerStats::new());
        let hub = Arc::new(Hub::new(registry, rooms, publisher, stats));
        let ticket_manager = Arc::new(TicketManager::new(
            &self.jwt_secret,
            self.config.ticket_expiry_secs,
        ));

        hub.seed_rooms(&self.config.seed_rooms);

        // REST state
        let app_state = web::Data::new(AppState {
            hub: Arc::clone(&hub),
            ticket_manager: Arc::clone(&ticket_manager),
            auth_handler: Arc::clone(&self.auth_handler),
        });

        // WebSocket state
        let ws_state = web::Data::new(WsState {
            hub: Arc::clone(&hub),
            ticket_manager: Arc::clone(&ticket_manager),
        });

        // Roll the event-rate window and log a status line every minute
        let status_hub = Arc::clone(&hub);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(ROLL_INTERVAL).await;
                let events = status_hub.stats().roll_window();
                tracing::info!(
                    connections = status_hub.connection_count(),
                    rooms = status_hub.list_rooms().len(),
                    events_per_minute = events,
                    "status"
                );
            }
        });

        // Start HTTP server
        let http_addr = self.config.http_addr.clone();
        let http_server = HttpServer::new(move || {
            let cors = Cors::permissive(); // Allow all origins for dev
            App::new()
                .wrap(cors)
                .app_data(app_state.clone())
                .app_data(ws_state.clone())
                .route("/ticket", web::post().to(rest::issue_ticket))
                .route("/rooms", web::get().to(rest::list_rooms))
                .route("/status", web::get().to(rest::status))
                .route("/healthz", web::get().to(rest::healthz))
                .route("/ws", web::get().to(ws::session_ws))
        })
        .bind(&http_addr)?
        .run();

        http_server
            .await
            .map_err(|e| ServerError::Http(e.to_string()))?;

        Ok(())
    }
}

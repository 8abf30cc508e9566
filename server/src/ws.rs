//! WebSocket session handling.
//!
//! Each connection runs as one actix actor. Inbound text frames are
//! decoded into client commands and dispatched to the hub; outbound
//! frames arrive pre-encoded over the session's channel and are
//! forwarded to the socket.

use crate::hub::Hub;
use crate::ticket::TicketManager;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use collab_kit_protocol::{ClientCommand, ConnectionId, Identity};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state for WebSocket handlers.
pub struct WsState {
    pub hub: Arc<Hub>,
    pub ticket_manager: Arc<TicketManager>,
}

/// WebSocket actor for one client session.
pub struct SessionActor {
    hub: Arc<Hub>,
    identity: Identity,
    /// Hub connection id (set once the session registers).
    conn: Option<ConnectionId>,
    last_heartbeat: Instant,
}

/// Message type for forwarding hub frames to the WebSocket.
#[derive(Message)]
#[rtype(result = "()")]
pub struct OutboundFrame(pub String);

impl SessionActor {
    pub fn new(hub: Arc<Hub>, identity: Identity) -> Self {
        Self {
            hub,
            identity,
            conn: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                tracing::debug!(conn = ?act.conn, "websocket client heartbeat timeout");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for SessionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.heartbeat(ctx);

        // Register with the hub; frames pushed to the sender land on the
        // socket through the forwarding task below.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = self.hub.connect(self.identity.clone(), tx);
        self.conn = Some(conn);

        let addr = ctx.address();
        actix::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if addr.try_send(OutboundFrame(frame)).is_err() {
                    break;
                }
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(conn) = self.conn.take() {
            self.hub.disconnect(conn);
        }
    }
}

impl Handler<OutboundFrame> for SessionActor {
    type Result = ();

    fn handle(&mut self, msg: OutboundFrame, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SessionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                let Some(conn) = self.conn else {
                    return;
                };
                match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(command) => self.hub.handle(conn, command),
                    Err(error) => {
                        tracing::debug!(%conn, %error, "unparseable frame dropped");
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::debug!(conn = ?self.conn, "binary frame ignored");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(conn = ?self.conn, "websocket close: {:?}", reason);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// HTTP handler to upgrade to a WebSocket session.
pub async fn session_ws(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    state: web::Data<WsState>,
) -> Result<HttpResponse, actix_web::Error> {
    // Validate ticket
    let identity: Identity = state
        .ticket_manager
        .validate(&query.ticket)
        .map_err(|_| actix_web::error::ErrorUnauthorized("Invalid ticket"))?;

    tracing::info!(user = %identity.display_name, "websocket session opening");

    let actor = SessionActor::new(Arc::clone(&state.hub), identity);
    ws::start(actor, &req, stream)
}

#[derive(serde::Deserialize)]
pub struct WsQuery {
    pub ticket: String,
}

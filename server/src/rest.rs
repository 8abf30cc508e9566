//! REST handlers for actix-web: ticket issuance plus the read-only
//! discovery and monitoring endpoints.

use crate::hub::Hub;
use crate::ticket::TicketManager;
use crate::{AuthFuture, AuthRequest};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state for REST handlers.
pub struct AppState {
    pub hub: Arc<Hub>,
    pub ticket_manager: Arc<TicketManager>,
    pub auth_handler: Arc<dyn Fn(AuthRequest) -> AuthFuture + Send + Sync>,
}

#[derive(Serialize)]
pub struct TicketResponse {
    pub ticket: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub active_connections: usize,
    pub events_per_minute: u64,
    pub rooms: Vec<RoomStatus>,
}

#[derive(Serialize)]
pub struct RoomStatus {
    pub name: String,
    pub users: usize,
}

/// POST /ticket - Exchange credentials for a signed connection ticket.
pub async fn issue_ticket(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    // Extract headers
    let headers = req
        .headers()
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_string(), v.to_string()))
        })
        .collect();

    let auth_request = AuthRequest {
        headers,
        body: if body.is_empty() {
            None
        } else {
            Some(body.to_vec())
        },
    };

    // Call user's auth handler
    let identity = match (state.auth_handler)(auth_request).await {
        Ok(identity) => identity,
        Err(reason) => {
            return HttpResponse::Unauthorized().json(ErrorResponse { error: reason });
        }
    };

    // Issue ticket
    match state.ticket_manager.issue(identity) {
        Ok(ticket) => HttpResponse::Ok().json(TicketResponse { ticket }),
        Err(e) => HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        }),
    }
}

/// GET /rooms - List all rooms with their occupancy.
pub async fn list_rooms(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.hub.list_rooms())
}

/// GET /status - Coarse load counters for monitoring.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let rooms = state
        .hub
        .list_rooms()
        .into_iter()
        .map(|room| RoomStatus {
            name: room.name.0,
            users: room.members,
        })
        .collect();
    HttpResponse::Ok().json(StatusResponse {
        active_connections: state.hub.connection_count(),
        events_per_minute: state.hub.stats().events_per_minute(),
        rooms,
    })
}

/// GET /healthz - Liveness probe.
pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "timestamp": crate::now_millis(),
    }))
}

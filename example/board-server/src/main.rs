//! Collaborative board server built on collab-kit.
//!
//! Run with: cargo run --bin board-server

use collab_kit_protocol::Identity;
use collab_kit_server::{AuthRequest, Server, ServerError};
use serde::Deserialize;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let addr = std::env::var("BOARD_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let secret =
        std::env::var("BOARD_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".to_string());
    let seed_rooms: Vec<String> = std::env::var("BOARD_SEED_ROOMS")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| vec!["general".to_string()]);

    println!("Starting board server...");
    println!("  HTTP: http://{addr}");
    println!("  WS:   ws://{addr}/ws?ticket=...");
    println!();
    println!("Endpoints:");
    println!("  POST /ticket   - Get auth ticket (body: {{\"display_name\": \"name\"}})");
    println!("  GET  /rooms    - List rooms");
    println!("  GET  /status   - Connection and event counters");
    println!("  GET  /healthz  - Liveness probe");
    println!();

    let server = Server::builder()
        .http_addr(addr)
        .jwt_secret(secret.into_bytes())
        .seed_rooms(seed_rooms)
        .auth_handler(|req: AuthRequest| async move {
            let body = req.body.ok_or_else(|| "Missing body".to_string())?;

            #[derive(Deserialize)]
            struct AuthBody {
                display_name: String,
            }

            let auth: AuthBody = serde_json::from_slice(&body)
                .map_err(|e| format!("Invalid JSON: {}", e))?;

            let display_name = auth.display_name.trim().to_string();
            if display_name.is_empty() {
                return Err("Display name cannot be empty".to_string());
            }
            if display_name.len() > 32 {
                return Err("Display name too long (max 32 chars)".to_string());
            }

            tracing::info!(user = %display_name, "ticket issued");
            Ok(Identity {
                user_id: None,
                display_name,
            })
        })
        .build()
        .map_err(|e| ServerError::Config(e.to_string()))?;

    server.run().await?;

    Ok(())
}

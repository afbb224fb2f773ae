use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tracing::{error, info, warn};
use turgo_types::{ClientMessage, GameError};
use warp::ws::{Message, WebSocket};

use crate::session_registry::SessionRegistry;

pub mod connection;
pub mod handlers;
pub mod rate_limiter;


pub use connection::{ConnectionId, ConnectionManager};
use handlers::MessageHandler;
pub use rate_limiter::RateLimiter;

// How long a closing socket gets to flush what is already queued for it
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn handle_connection(
    websocket: WebSocket,
    connection_manager: Arc<ConnectionManager>,
    registry: Arc<SessionRegistry>,
    rate_limiter: RateLimiter,
) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let (mut ws_sender, mut ws_receiver) = websocket.split();

    // Create connection and get receiver for outgoing messages
    let message_receiver = connection_manager.create_connection(connection_id).await;

    let message_handler =
        MessageHandler::new(connection_id, connection_manager.clone(), registry.clone());

    // Handle incoming messages
    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter = rate_limiter.fresh();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) => {
                        if let Err(e) =
                            handle_message(msg, &mut rate_limiter, &message_handler, connection_id)
                                .await
                        {
                            error!("Error handling message for {}: {}", connection_id, e);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    // Handle outgoing messages
    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }

        let _ = ws_sender.close().await;
    };
    tokio::pin!(outgoing_handler);

    // Run both handlers concurrently
    tokio::select! {
        _ = incoming_handler => {
            // Dropping the sender lets the outgoing loop drain and finish
            message_handler.handle_disconnect().await;
            connection_manager.remove_connection(connection_id).await;
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut outgoing_handler).await.is_err() {
                warn!("Timed out flushing messages to {}", connection_id);
            }
        },
        _ = &mut outgoing_handler => {
            message_handler.handle_disconnect().await;
            connection_manager.remove_connection(connection_id).await;
        },
    }

    info!("Connection {} disconnected", connection_id);
}

async fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) -> Result<(), String> {
    if !rate_limiter.check_rate_limit().await {
        warn!("Rate limit exceeded for connection {}", connection_id);
        message_handler.send_error(GameError::RateLimited).await?;
        return Err("Rate limit exceeded".to_string());
    }

    if msg.is_close() {
        return Err("Client closed the connection".to_string());
    }

    // Only handle text messages
    if !msg.is_text() {
        return Ok(());
    }

    let text = msg.to_str().map_err(|_| "Invalid text message")?;

    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid JSON from {}: {}", connection_id, e);
            return message_handler.send_error(GameError::InvalidState).await;
        }
    };

    message_handler
        .handle_message(client_message)
        .await
        .map_err(|e| format!("Message handling error: {}", e))
}

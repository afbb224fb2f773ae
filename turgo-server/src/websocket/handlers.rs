use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, error, info, warn};
use turgo_types::{ClientMessage, GameError, ServerMessage, TeamId};

use crate::session_registry::{SessionCommand, SessionRegistry};
use crate::websocket::connection::{ConnectionId, ConnectionManager};

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    registry: Arc<SessionRegistry>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            registry,
        }
    }

    fn team_id(&self) -> TeamId {
        self.connection_id.team_id()
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        // Update connection activity
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match AssertUnwindSafe(self.route(message)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Panic while handling message from {}", self.connection_id);
                self.send_error(GameError::Internal).await
            }
        }
    }

    async fn route(&self, message: ClientMessage) -> Result<(), String> {
        let result = match message {
            ClientMessage::CreateGame { team_name } => self.handle_create_game(team_name).await,
            ClientMessage::JoinGame {
                game_code,
                team_name,
            } => self.handle_join_game(game_code, team_name).await,
            ClientMessage::StartGame => self.dispatch(SessionCommand::Start).await,
            ClientMessage::MakeGuess { guess } => {
                debug!("Team {} guessed {:?}", self.connection_id, guess);
                self.dispatch(SessionCommand::Guess(guess)).await
            }
            ClientMessage::PressBuzzer => self.dispatch(SessionCommand::PressBuzzer).await,
            ClientMessage::PassWord => self.dispatch(SessionCommand::PassWord).await,
            ClientMessage::LeaveGame => return self.handle_leave_game().await,
            // Heartbeat just updates activity (already done in handle_message)
            ClientMessage::Heartbeat => Ok(()),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Rejected message from {}: {}", self.connection_id, e);
                self.send_error(e).await
            }
        }
    }

    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);

        if self.registry.session_for_team(self.team_id()).is_none() {
            return;
        }
        if let Err(e) = self.registry.leave_current(self.team_id()).await {
            error!(
                "Failed to remove {} from its game on disconnect: {}",
                self.connection_id, e
            );
        }
    }

    async fn handle_create_game(&self, team_name: String) -> Result<(), GameError> {
        self.registry.create(self.team_id(), &team_name).await?;
        Ok(())
    }

    async fn handle_join_game(&self, game_code: String, team_name: String) -> Result<(), GameError> {
        self.registry
            .join(&game_code, self.team_id(), &team_name)
            .await?;
        Ok(())
    }

    async fn dispatch(&self, command: SessionCommand) -> Result<(), GameError> {
        let code = self
            .registry
            .session_for_team(self.team_id())
            .ok_or(GameError::InvalidState)?;
        self.registry.dispatch(&code, self.team_id(), command).await?;
        Ok(())
    }

    async fn handle_leave_game(&self) -> Result<(), String> {
        match self.registry.leave_current(self.team_id()).await {
            Ok(code) => {
                info!("Team {} left game {}", self.connection_id, code);
                self.send_message(ServerMessage::GameLeft).await
            }
            Err(e) => self.send_error(e).await,
        }
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    pub async fn send_error(&self, error: GameError) -> Result<(), String> {
        self.send_message(ServerMessage::error(error)).await
    }
}

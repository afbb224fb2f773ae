use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{GameError, GuessOutcome, SessionSnapshot, TeamId};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    CreateGame { team_name: String },
    JoinGame { game_code: String, team_name: String },
    StartGame,
    MakeGuess { guess: String },
    PressBuzzer,
    PassWord,
    LeaveGame,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    GameCreated {
        game_code: String,
        team_id: TeamId,
        team_name: String,
    },
    GameJoined {
        game_code: String,
        team_id: TeamId,
        team_name: String,
    },
    GameStarted,
    GameUpdate { state: SessionSnapshot },
    GuessResult { outcome: GuessOutcome },
    BuzzerAccepted,
    GameLeft,
    Error { error: GameError, message: String },
}

impl ServerMessage {
    pub fn error(error: GameError) -> Self {
        let message = error.to_string();
        ServerMessage::Error { error, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"JoinGame":{"game_code":"ab12cd","team_name":"Owls"}}"#)
                .unwrap();
        match msg {
            ClientMessage::JoinGame {
                game_code,
                team_name,
            } => {
                assert_eq!(game_code, "ab12cd");
                assert_eq!(team_name, "Owls");
            }
            other => panic!("Unexpected message: {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(r#""PressBuzzer""#).unwrap();
        assert!(matches!(msg, ClientMessage::PressBuzzer));
    }

    #[test]
    fn test_error_message_carries_text() {
        match ServerMessage::error(GameError::SessionFull) {
            ServerMessage::Error { error, message } => {
                assert_eq!(error, GameError::SessionFull);
                assert_eq!(message, "Game is full");
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }
}

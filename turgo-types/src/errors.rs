use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Recoverable failures reported back to the team that triggered them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
pub enum GameError {
    #[error("Game {code} not found")]
    SessionNotFound { code: String },
    #[error("Game is full")]
    SessionFull,
    #[error("Game has already started")]
    AlreadyStarted,
    #[error("It is not your turn")]
    NotYourTurn,
    #[error("Action not allowed in the current game state")]
    InvalidState,
    #[error("Buzzer press rejected")]
    BuzzerRejected,
    #[error("At least 3 teams are needed to start")]
    InsufficientTeams,
    #[error("No content available for length {length}")]
    ContentUnavailable { length: usize },
    #[error("Too many messages, slow down")]
    RateLimited,
    #[error("Internal server error")]
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GameError::SessionNotFound {
            code: "ABC123".to_string(),
        };
        assert_eq!(err.to_string(), "Game ABC123 not found");
        assert_eq!(
            GameError::InsufficientTeams.to_string(),
            "At least 3 teams are needed to start"
        );
    }

    #[test]
    fn test_error_wire_format() {
        let json = serde_json::to_string(&GameError::NotYourTurn).unwrap();
        assert_eq!(json, "\"NotYourTurn\"");

        let json = serde_json::to_string(&GameError::ContentUnavailable { length: 12 }).unwrap();
        assert_eq!(json, r#"{"ContentUnavailable":{"length":12}}"#);
    }
}

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{TeamId, TeamView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SessionStatus {
    Waiting,  // Lobby, teams can still join
    Playing,  // A word is on the board
    Puzzle,   // A puzzle is on the board and the reveal countdown may be running
    Finished, // Terminal
}

/// Word currently on the board. The word itself is withheld until it is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordView {
    pub length: usize,
    pub meaning: String,
    pub solution: Option<String>,
}

/// Puzzle currently on the board. Only the revealed prefix of the answer is exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PuzzleView {
    pub clue: String,
    pub answer_length: usize,
    pub revealed_letters: String,
    pub solution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GuessLogEntry {
    pub team_name: String,
    pub guess: String,
    pub was_correct: bool,
}

/// Full projection of a session that is broadcast to every member after each change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSnapshot {
    pub code: String,
    pub teams: Vec<TeamView>,
    pub stage: u8,
    pub round: usize,
    pub status: SessionStatus,
    pub current_word: Option<WordView>,
    pub current_puzzle: Option<PuzzleView>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub attempts_remaining: u32,
    pub guess_log: Vec<GuessLogEntry>,
    pub revealed_letter_count: usize,
    pub active_team_id: Option<TeamId>,
    pub can_start: bool,
    pub winner_id: Option<TeamId>,
    pub created_at: String, // ISO 8601 string
}

impl SessionSnapshot {
    pub fn team(&self, team_id: TeamId) -> Option<&TeamView> {
        self.teams.iter().find(|team| team.id == team_id)
    }

    pub fn active_team(&self) -> Option<&TeamView> {
        self.active_team_id.and_then(|id| self.team(id))
    }

    pub fn remaining_teams(&self) -> usize {
        self.teams.iter().filter(|team| !team.is_eliminated).count()
    }
}

/// Result of a guess, sent only to the team that made it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum GuessOutcome {
    Correct { points: i32, answer: String },
    Incorrect { attempts_remaining: u32 },
    AttemptsExhausted { answer: String },
    PuzzleMissed,
}

impl GuessOutcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, GuessOutcome::Correct { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ServerStats {
    pub total_games: usize,
    pub total_players: usize,
    pub active_games: usize,
}

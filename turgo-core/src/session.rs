use std::collections::HashSet;

use tracing::{debug, error, info};
use turgo_types::{
    GameError, GuessLogEntry, GuessOutcome, PuzzleView, SessionSnapshot, SessionStatus, TeamId,
    TeamView, WordView,
};

use crate::content::{ContentProvider, Puzzle, Word};
use crate::rules::{GameRules, StageConfig, StageItem};
use crate::scoring::ScoringEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub score: i32,
    pub is_eliminated: bool,
}

#[derive(Debug, Clone)]
enum ActiveItem {
    Word(Word),
    Puzzle(Puzzle),
}

impl ActiveItem {
    fn answer(&self) -> &str {
        match self {
            ActiveItem::Word(word) => &word.text,
            ActiveItem::Puzzle(puzzle) => &puzzle.answer,
        }
    }
}

/// What `advance_round` put on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundAdvance {
    WordLoaded { generation: u64 },
    PuzzleLoaded { generation: u64 },
    GameFinished { winner: Option<TeamId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Letters revealed so far; the countdown keeps running
    Revealed(usize),
    /// Final tick; the countdown is over
    Expired(usize),
    /// The puzzle this tick was scheduled for is gone or already resolved
    Stale,
}

/// One match: its teams, the stage script position and the item on the board.
///
/// All methods are synchronous and expect the caller to hold exclusive access
/// for the duration of each call. Every loaded item bumps `item_generation`, so
/// scheduled work can tell whether it still refers to the current item.
#[derive(Debug)]
pub struct GameSession {
    code: String,
    rules: GameRules,
    teams: Vec<Team>,
    status: SessionStatus,
    stage: u8,
    round: usize,
    current_item: Option<ActiveItem>,
    item_resolved: bool,
    attempts: u32,
    guess_log: Vec<GuessLogEntry>,
    buzzer_set: HashSet<TeamId>,
    buzzer_holder: Option<TeamId>,
    revealed_letter_count: usize,
    countdown_ticks: Option<u32>,
    turn_index: usize,
    active_team: Option<TeamId>,
    item_generation: u64,
    winner: Option<TeamId>,
    created_at: String,
}

impl GameSession {
    pub fn new(code: impl Into<String>) -> Self {
        Self::with_rules(code, GameRules::default())
    }

    pub fn with_rules(code: impl Into<String>, rules: GameRules) -> Self {
        Self {
            code: code.into(),
            rules,
            teams: Vec::new(),
            status: SessionStatus::Waiting,
            stage: 1,
            round: 0,
            current_item: None,
            item_resolved: false,
            attempts: 0,
            guess_log: Vec::new(),
            buzzer_set: HashSet::new(),
            buzzer_holder: None,
            revealed_letter_count: 0,
            countdown_ticks: None,
            turn_index: 0,
            active_team: None,
            item_generation: 0,
            winner: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn stage(&self) -> u8 {
        self.stage
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, team_id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|team| team.id == team_id)
    }

    pub fn has_team(&self, team_id: TeamId) -> bool {
        self.team(team_id).is_some()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn active_team(&self) -> Option<TeamId> {
        self.active_team
    }

    pub fn buzzer_holder(&self) -> Option<TeamId> {
        self.buzzer_holder
    }

    pub fn winner(&self) -> Option<TeamId> {
        self.winner
    }

    pub fn revealed_letter_count(&self) -> usize {
        self.revealed_letter_count
    }

    pub fn item_generation(&self) -> u64 {
        self.item_generation
    }

    pub fn is_item_resolved(&self) -> bool {
        self.item_resolved
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, SessionStatus::Playing | SessionStatus::Puzzle)
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown_ticks.is_some()
    }

    pub fn current_word(&self) -> Option<&Word> {
        match &self.current_item {
            Some(ActiveItem::Word(word)) => Some(word),
            _ => None,
        }
    }

    pub fn current_puzzle(&self) -> Option<&Puzzle> {
        match &self.current_item {
            Some(ActiveItem::Puzzle(puzzle)) => Some(puzzle),
            _ => None,
        }
    }

    /// Answer of the item on the board. Never part of a snapshot until resolved.
    pub fn current_answer(&self) -> Option<&str> {
        self.current_item.as_ref().map(ActiveItem::answer)
    }

    fn stage_config(&self) -> Option<&StageConfig> {
        self.rules.stage(self.stage)
    }

    fn non_eliminated_ids(&self) -> Vec<TeamId> {
        self.teams
            .iter()
            .filter(|team| !team.is_eliminated)
            .map(|team| team.id)
            .collect()
    }

    pub fn add_team(&mut self, team_id: TeamId, name: impl Into<String>) -> bool {
        if self.teams.len() >= self.rules.max_teams || self.has_team(team_id) {
            return false;
        }

        self.teams.push(Team {
            id: team_id,
            name: name.into(),
            score: 0,
            is_eliminated: false,
        });
        true
    }

    /// Remove a team. Turn order skips it from now on; if it held the turn the
    /// next team in order takes over, or on a puzzle the buzzer opens.
    pub fn remove_team(&mut self, team_id: TeamId) -> bool {
        let Some(position) = self.teams.iter().position(|team| team.id == team_id) else {
            return false;
        };
        self.teams.remove(position);
        self.buzzer_set.remove(&team_id);
        if self.buzzer_holder == Some(team_id) {
            self.buzzer_holder = None;
        }

        if !self.is_in_progress() {
            return true;
        }

        if self.non_eliminated_ids().is_empty() {
            self.end_game();
            return true;
        }

        if self.active_team == Some(team_id) {
            self.attempts = 0;
            // Only a puzzle reopens the buzzer; words hand the turn on in order
            if self.is_buzzer_open() && self.has_buzzer_candidate() {
                self.active_team = None;
            } else {
                self.activate_turn();
            }
        } else {
            self.sync_turn_index();
        }

        true
    }

    pub fn check_start(&self) -> Result<(), GameError> {
        if self.status != SessionStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if self.teams.len() < self.rules.min_teams {
            return Err(GameError::InsufficientTeams);
        }
        Ok(())
    }

    pub fn can_start(&self) -> bool {
        self.check_start().is_ok()
    }

    /// Leave the lobby. The first item is loaded separately with `advance_round`.
    pub fn start(&mut self) -> bool {
        if !self.can_start() {
            return false;
        }

        self.status = SessionStatus::Playing;
        self.stage = 1;
        self.round = 0;
        self.turn_index = 0;
        self.attempts = 0;
        self.activate_turn();

        info!("Game {} started with {} teams", self.code, self.teams.len());
        true
    }

    /// Back to the lobby when the first item could not be loaded.
    pub fn abort_start(&mut self) -> bool {
        if self.status != SessionStatus::Playing || self.current_item.is_some() {
            return false;
        }

        self.status = SessionStatus::Waiting;
        self.stage = 1;
        self.round = 0;
        self.turn_index = 0;
        self.attempts = 0;
        self.active_team = None;

        info!("Game {} returned to the lobby", self.code);
        true
    }

    /// Load the next item of the stage script, moving through stage boundaries
    /// and ending the game once the final stage is exhausted.
    pub fn advance_round(
        &mut self,
        content: &dyn ContentProvider,
    ) -> Result<RoundAdvance, GameError> {
        loop {
            if !self.is_in_progress() {
                return match self.status {
                    SessionStatus::Finished => Ok(RoundAdvance::GameFinished {
                        winner: self.winner,
                    }),
                    _ => Err(GameError::InvalidState),
                };
            }

            let Some(next) = self.stage_config().map(|stage| stage.item(self.round)) else {
                self.end_game();
                continue;
            };

            match next {
                Some(StageItem::Word(length)) => {
                    let word = content.random_word(length).ok_or_else(|| {
                        error!("No {}-letter word available for game {}", length, self.code);
                        GameError::ContentUnavailable { length }
                    })?;
                    self.load_item(ActiveItem::Word(word));
                    if self.active_team.is_none() {
                        self.activate_turn();
                    }
                    return Ok(RoundAdvance::WordLoaded {
                        generation: self.item_generation,
                    });
                }
                Some(StageItem::Puzzle(length)) => {
                    let puzzle = content.random_puzzle(length).ok_or_else(|| {
                        error!("No {}-letter puzzle available for game {}", length, self.code);
                        GameError::ContentUnavailable { length }
                    })?;
                    self.load_item(ActiveItem::Puzzle(puzzle));
                    return Ok(RoundAdvance::PuzzleLoaded {
                        generation: self.item_generation,
                    });
                }
                None if self.rules.is_final_stage(self.stage) => {
                    self.end_game();
                }
                None => self.advance_stage(),
            }
        }
    }

    fn load_item(&mut self, item: ActiveItem) {
        let is_puzzle = matches!(item, ActiveItem::Puzzle(_));
        self.status = if is_puzzle {
            SessionStatus::Puzzle
        } else {
            SessionStatus::Playing
        };
        self.countdown_ticks = is_puzzle.then_some(0);
        self.current_item = Some(item);
        self.item_resolved = false;
        self.attempts = 0;
        self.guess_log.clear();
        self.buzzer_set.clear();
        self.buzzer_holder = None;
        self.revealed_letter_count = 0;
        self.round += 1;
        self.item_generation += 1;
    }

    pub fn submit_guess(
        &mut self,
        team_id: TeamId,
        guess: &str,
    ) -> Result<GuessOutcome, GameError> {
        let team_name = self
            .team(team_id)
            .map(|team| team.name.clone())
            .ok_or(GameError::InvalidState)?;

        if !self.is_in_progress() || self.item_resolved {
            return Err(GameError::InvalidState);
        }
        let Some(item) = self.current_item.clone() else {
            return Err(GameError::InvalidState);
        };
        if self.active_team != Some(team_id) {
            return Err(GameError::NotYourTurn);
        }

        let guess = ScoringEngine::normalize_guess(guess);
        let stage = self.stage_config().cloned().ok_or(GameError::Internal)?;
        let correct = ScoringEngine::is_match(&guess, item.answer());

        self.guess_log.push(GuessLogEntry {
            team_name,
            guess,
            was_correct: correct,
        });

        let outcome = match (&item, correct) {
            (ActiveItem::Word(word), true) => {
                let points = ScoringEngine::word_points(&stage, self.attempts);
                self.award(team_id, points);
                self.item_resolved = true;
                self.advance_turn();
                GuessOutcome::Correct {
                    points,
                    answer: word.text.clone(),
                }
            }
            (ActiveItem::Word(word), false) => {
                self.attempts += 1;
                if self.attempts >= self.rules.max_attempts {
                    self.advance_turn();
                    GuessOutcome::AttemptsExhausted {
                        answer: word.text.clone(),
                    }
                } else {
                    GuessOutcome::Incorrect {
                        attempts_remaining: self.rules.max_attempts - self.attempts,
                    }
                }
            }
            (ActiveItem::Puzzle(puzzle), true) => {
                let points = ScoringEngine::puzzle_points(
                    &stage,
                    self.revealed_letter_count,
                    self.rules.reveal_penalty,
                );
                self.award(team_id, points);
                self.item_resolved = true;
                self.countdown_ticks = None;
                GuessOutcome::Correct {
                    points,
                    answer: puzzle.answer.clone(),
                }
            }
            (ActiveItem::Puzzle(_), false) => {
                // A miss hands the turn on and reopens the buzzer for teams that have not pressed
                self.buzzer_holder = None;
                self.advance_turn();
                GuessOutcome::PuzzleMissed
            }
        };

        Ok(outcome)
    }

    fn award(&mut self, team_id: TeamId, points: i32) {
        if let Some(team) = self.teams.iter_mut().find(|team| team.id == team_id) {
            team.score += points;
            info!(
                "Team {} scored {} in game {} (total {})",
                team.name, points, self.code, team.score
            );
        }
    }

    /// An unresolved puzzle that nobody holds the buzzer for.
    pub fn is_buzzer_open(&self) -> bool {
        !self.item_resolved
            && self.status == SessionStatus::Puzzle
            && self.buzzer_holder.is_none()
    }

    fn has_buzzer_candidate(&self) -> bool {
        self.teams
            .iter()
            .any(|team| !team.is_eliminated && !self.buzzer_set.contains(&team.id))
    }

    /// Check-and-set for the buzzer. The first eligible press claims the turn.
    pub fn press_buzzer(&mut self, team_id: TeamId) -> Result<(), GameError> {
        let team = self.team(team_id).ok_or(GameError::BuzzerRejected)?;
        if team.is_eliminated || self.buzzer_set.contains(&team_id) || !self.is_buzzer_open() {
            return Err(GameError::BuzzerRejected);
        }

        self.buzzer_set.insert(team_id);
        self.buzzer_holder = Some(team_id);
        self.active_team = Some(team_id);
        self.attempts = 0;
        self.sync_turn_index();
        Ok(())
    }

    /// Hand the turn to the next non-eliminated team after the current holder.
    pub fn advance_turn(&mut self) {
        self.attempts = 0;
        let ids = self.non_eliminated_ids();
        if ids.is_empty() {
            self.active_team = None;
            return;
        }

        let next = match self
            .active_team
            .and_then(|active| ids.iter().position(|id| *id == active))
        {
            Some(position) => position + 1,
            // Nobody holds the turn, the index already points at the next team
            None => self.turn_index,
        };
        self.turn_index = next % ids.len();
        self.active_team = Some(ids[self.turn_index]);
    }

    fn activate_turn(&mut self) {
        let ids = self.non_eliminated_ids();
        if ids.is_empty() {
            self.active_team = None;
            return;
        }
        self.turn_index %= ids.len();
        self.active_team = Some(ids[self.turn_index]);
    }

    fn sync_turn_index(&mut self) {
        let ids = self.non_eliminated_ids();
        if ids.is_empty() {
            return;
        }
        match self
            .active_team
            .and_then(|active| ids.iter().position(|id| *id == active))
        {
            Some(position) => self.turn_index = position,
            None => self.turn_index %= ids.len(),
        }
    }

    /// Close the current stage, eliminating on the configured boundaries, and
    /// open the next one. Leaving the final stage ends the game.
    pub fn advance_stage(&mut self) {
        if self.stage_config().is_some_and(|stage| stage.eliminates_on_exit) {
            self.eliminate_lowest_team();
        }

        if self.stage >= self.rules.final_stage() {
            self.end_game();
            return;
        }

        self.stage += 1;
        self.round = 0;
        self.turn_index = 0;
        self.attempts = 0;
        self.current_item = None;
        self.item_resolved = false;
        self.countdown_ticks = None;
        self.buzzer_set.clear();
        self.buzzer_holder = None;
        self.status = SessionStatus::Playing;
        self.activate_turn();

        info!("Game {} advanced to stage {}", self.code, self.stage);
    }

    /// Lowest score goes, first-encountered on ties, as long as more than two remain.
    fn eliminate_lowest_team(&mut self) -> Option<TeamId> {
        let remaining: Vec<usize> = (0..self.teams.len())
            .filter(|index| !self.teams[*index].is_eliminated)
            .collect();
        if remaining.len() <= 2 {
            return None;
        }

        let lowest = remaining.into_iter().reduce(|lowest, index| {
            if self.teams[index].score < self.teams[lowest].score {
                index
            } else {
                lowest
            }
        })?;

        let team = &mut self.teams[lowest];
        team.is_eliminated = true;
        info!(
            "Team {} eliminated from game {} with {} points",
            team.name, self.code, team.score
        );

        let team_id = team.id;
        if self.active_team == Some(team_id) {
            self.active_team = None;
        }
        Some(team_id)
    }

    pub fn end_game(&mut self) -> Option<TeamId> {
        self.status = SessionStatus::Finished;
        self.winner = self
            .teams
            .iter()
            .filter(|team| !team.is_eliminated)
            .reduce(|best, team| if team.score > best.score { team } else { best })
            .map(|team| team.id);
        self.countdown_ticks = None;
        self.active_team = None;
        self.buzzer_holder = None;
        self.item_generation += 1;

        match self.winner.and_then(|id| self.team(id)) {
            Some(team) => info!(
                "Game {} finished, winner {} with {} points",
                self.code, team.name, team.score
            ),
            None => info!("Game {} finished without a winner", self.code),
        }
        self.winner
    }

    /// Skip the current word. Only the team holding the turn may pass, and only in the final stage.
    pub fn pass_word(
        &mut self,
        team_id: TeamId,
        content: &dyn ContentProvider,
    ) -> Result<RoundAdvance, GameError> {
        if !self.has_team(team_id)
            || self.status != SessionStatus::Playing
            || !self.rules.is_final_stage(self.stage)
            || self.current_word().is_none()
            || self.item_resolved
        {
            return Err(GameError::InvalidState);
        }
        if self.active_team != Some(team_id) {
            return Err(GameError::NotYourTurn);
        }

        info!("Word passed in game {}", self.code);
        self.advance_round(content)
    }

    /// One countdown step for the puzzle loaded as `generation`.
    pub fn tick_countdown(&mut self, generation: u64) -> CountdownTick {
        if generation != self.item_generation {
            debug!("Stale countdown tick for game {}", self.code);
            return CountdownTick::Stale;
        }
        let answer_length = match &self.current_item {
            Some(ActiveItem::Puzzle(puzzle)) => puzzle.answer_length,
            _ => return CountdownTick::Stale,
        };
        let Some(ticks) = self.countdown_ticks.as_mut() else {
            return CountdownTick::Stale;
        };

        *ticks += 1;
        let ticks = *ticks;
        self.revealed_letter_count = (ticks as usize).min(answer_length);

        if ticks >= self.rules.countdown_max_ticks {
            self.countdown_ticks = None;
            CountdownTick::Expired(self.revealed_letter_count)
        } else {
            CountdownTick::Revealed(self.revealed_letter_count)
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current_word = self.current_word().map(|word| WordView {
            length: word.length(),
            meaning: word.meaning.clone(),
            solution: self.item_resolved.then(|| word.text.clone()),
        });
        let current_puzzle = self.current_puzzle().map(|puzzle| PuzzleView {
            clue: puzzle.clue.clone(),
            answer_length: puzzle.answer_length,
            revealed_letters: puzzle
                .answer
                .chars()
                .take(self.revealed_letter_count)
                .collect(),
            solution: self.item_resolved.then(|| puzzle.answer.clone()),
        });

        SessionSnapshot {
            code: self.code.clone(),
            teams: self
                .teams
                .iter()
                .map(|team| TeamView {
                    id: team.id,
                    name: team.name.clone(),
                    score: team.score,
                    is_active: self.active_team == Some(team.id),
                    is_eliminated: team.is_eliminated,
                })
                .collect(),
            stage: self.stage,
            round: self.round,
            status: self.status,
            current_word,
            current_puzzle,
            attempts: self.attempts,
            max_attempts: self.rules.max_attempts,
            attempts_remaining: self.rules.max_attempts.saturating_sub(self.attempts),
            guess_log: self.guess_log.clone(),
            revealed_letter_count: self.revealed_letter_count,
            active_team_id: self.active_team,
            can_start: self.can_start(),
            winner_id: self.winner,
            created_at: self.created_at.clone(),
        }
    }
}

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use turgo_core::{ContentProvider, CountdownTick, GameRules, GameSession, RoundAdvance};
use turgo_types::{
    GameError, GuessOutcome, ServerMessage, ServerStats, SessionSnapshot, SessionStatus, TeamId,
};

use crate::timers::{SessionTimers, SessionTimings};
use crate::websocket::ConnectionManager;

const CODE_LENGTH: usize = 6;
// Unambiguous characters only: no 0, O, 1 or I
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const MAX_TEAM_NAME_CHARS: usize = 24;

/// Events routed to a session on behalf of one of its teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Guess(String),
    PressBuzzer,
    PassWord,
}

/// What the triggering team is told after a command succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Started,
    Guess(GuessOutcome),
    BuzzerAccepted,
    Passed,
}

impl CommandReply {
    fn direct_message(&self) -> Option<ServerMessage> {
        match self {
            CommandReply::Guess(outcome) => Some(ServerMessage::GuessResult {
                outcome: outcome.clone(),
            }),
            CommandReply::BuzzerAccepted => Some(ServerMessage::BuzzerAccepted),
            CommandReply::Started | CommandReply::Passed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub code: String,
    pub team_id: TeamId,
    pub team_name: String,
}

struct SessionSlot {
    game: GameSession,
    timers: SessionTimers,
    /// Set once the session is removed from the registry
    closed: bool,
}

/// A live session. All access to the game goes through `state`.
struct SessionHandle {
    code: String,
    state: Mutex<SessionSlot>,
}

impl SessionHandle {
    fn new(game: GameSession) -> Self {
        Self {
            code: game.code().to_string(),
            state: Mutex::new(SessionSlot {
                game,
                timers: SessionTimers::default(),
                closed: false,
            }),
        }
    }
}

/// Everything scheduled tasks need, cheap to clone into them.
#[derive(Clone)]
struct Runtime {
    content: Arc<dyn ContentProvider>,
    connections: Arc<ConnectionManager>,
    timings: SessionTimings,
}

impl Runtime {
    /// Push the current snapshot to every team of the session.
    async fn broadcast(&self, game: &GameSession) {
        let snapshot = game.snapshot();
        let team_ids: Vec<TeamId> = snapshot.teams.iter().map(|team| team.id).collect();
        self.connections
            .send_to_teams(&team_ids, ServerMessage::GameUpdate { state: snapshot })
            .await;
    }

    async fn send_to_team(&self, team_id: TeamId, message: ServerMessage) {
        if let Err(e) = self
            .connections
            .send_to_connection(team_id.into(), message)
            .await
        {
            warn!("Failed to reply to team {}: {}", team_id, e);
        }
    }

    /// Start or stop timers for whatever `advance_round` just did.
    fn apply_advance(&self, handle: &Arc<SessionHandle>, slot: &mut SessionSlot, advance: RoundAdvance) {
        match advance {
            RoundAdvance::WordLoaded { .. } => slot.timers.cancel_countdown(),
            RoundAdvance::PuzzleLoaded { generation } => {
                let task = self.spawn_countdown(Arc::downgrade(handle), generation);
                slot.timers.start_countdown(task);
            }
            RoundAdvance::GameFinished { .. } => slot.timers.cancel_countdown(),
        }
    }

    fn spawn_countdown(&self, session: Weak<SessionHandle>, generation: u64) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            let period = runtime.timings.countdown_tick;
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

            loop {
                interval.tick().await;
                let Some(handle) = session.upgrade() else {
                    break;
                };
                let mut slot = handle.state.lock().await;
                if slot.closed {
                    break;
                }

                match slot.game.tick_countdown(generation) {
                    CountdownTick::Revealed(_) => runtime.broadcast(&slot.game).await,
                    CountdownTick::Expired(revealed) => {
                        slot.timers.release_countdown();
                        info!(
                            "Countdown expired in game {} with {} letters revealed",
                            handle.code, revealed
                        );
                        runtime.broadcast(&slot.game).await;
                        break;
                    }
                    CountdownTick::Stale => {
                        debug!("Countdown for game {} is stale, stopping", handle.code);
                        break;
                    }
                }
            }
        })
    }

    fn spawn_delayed_advance(&self, session: Weak<SessionHandle>, generation: u64) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(runtime.timings.round_advance_delay).await;

            let Some(handle) = session.upgrade() else {
                return;
            };
            let mut slot = handle.state.lock().await;
            if slot.closed
                || slot.game.item_generation() != generation
                || !slot.game.is_item_resolved()
            {
                debug!("Skipping stale round advance for game {}", handle.code);
                return;
            }
            slot.timers.release_advance();

            match slot.game.advance_round(runtime.content.as_ref()) {
                Ok(advance) => runtime.apply_advance(&handle, &mut slot, advance),
                Err(e) => {
                    // No way to continue without content, so the game ends here
                    error!("Failed to advance game {}, ending it: {}", handle.code, e);
                    slot.game.end_game();
                    slot.timers.cancel_all();
                }
            }
            runtime.broadcast(&slot.game).await;
        })
    }
}

/// Owns every live session, keyed by join code.
///
/// The map only hands out `Arc<SessionHandle>`s; each session is then mutated
/// under its own lock, and the snapshot is broadcast before that lock is
/// released so members see updates in the order they happened.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
    team_sessions: DashMap<TeamId, String>,
    rules: GameRules,
    runtime: Runtime,
}

impl SessionRegistry {
    pub fn new(
        connections: Arc<ConnectionManager>,
        content: Arc<dyn ContentProvider>,
        timings: SessionTimings,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            team_sessions: DashMap::new(),
            rules: GameRules::default(),
            runtime: Runtime {
                content,
                connections,
                timings,
            },
        }
    }

    /// Rules applied to sessions created from now on
    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    fn handle(&self, code: &str) -> Result<Arc<SessionHandle>, GameError> {
        self.sessions
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GameError::SessionNotFound {
                code: code.to_string(),
            })
    }

    fn ensure_unassigned(&self, team_id: TeamId) -> Result<(), GameError> {
        if self.team_sessions.contains_key(&team_id) {
            warn!("Team {} is already in a game", team_id);
            return Err(GameError::InvalidState);
        }
        Ok(())
    }

    /// Open a new session with the creating team as its first member.
    pub async fn create(&self, team_id: TeamId, team_name: &str) -> Result<Membership, GameError> {
        let team_name = normalize_team_name(team_name)?;
        self.ensure_unassigned(team_id)?;

        let handle = loop {
            let code = generate_code();
            match self.sessions.entry(code) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    let mut game = GameSession::with_rules(entry.key().clone(), self.rules.clone());
                    game.add_team(team_id, team_name.clone());
                    let handle = Arc::new(SessionHandle::new(game));
                    entry.insert(handle.clone());
                    break handle;
                }
            }
        };
        self.team_sessions.insert(team_id, handle.code.clone());
        info!("Game {} created by {}", handle.code, team_name);

        let membership = Membership {
            code: handle.code.clone(),
            team_id,
            team_name,
        };

        let slot = handle.state.lock().await;
        self.runtime
            .send_to_team(
                team_id,
                ServerMessage::GameCreated {
                    game_code: membership.code.clone(),
                    team_id,
                    team_name: membership.team_name.clone(),
                },
            )
            .await;
        self.runtime.broadcast(&slot.game).await;

        Ok(membership)
    }

    pub async fn join(&self, code: &str, team_id: TeamId, team_name: &str) -> Result<Membership, GameError> {
        let code = normalize_code(code);
        let team_name = normalize_team_name(team_name)?;
        self.ensure_unassigned(team_id)?;

        let handle = self.handle(&code)?;
        let mut slot = handle.state.lock().await;
        if slot.closed {
            return Err(GameError::SessionNotFound { code });
        }
        if slot.game.status() != SessionStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if !slot.game.add_team(team_id, team_name.clone()) {
            return Err(GameError::SessionFull);
        }
        self.team_sessions.insert(team_id, code.clone());
        info!("{} joined game {}", team_name, code);

        self.runtime
            .send_to_team(
                team_id,
                ServerMessage::GameJoined {
                    game_code: code.clone(),
                    team_id,
                    team_name: team_name.clone(),
                },
            )
            .await;
        self.runtime.broadcast(&slot.game).await;

        Ok(Membership {
            code,
            team_id,
            team_name,
        })
    }

    /// Run a command against the team's session. The direct reply and the
    /// refreshed snapshot are sent before the session lock is released.
    pub async fn dispatch(
        &self,
        code: &str,
        team_id: TeamId,
        command: SessionCommand,
    ) -> Result<CommandReply, GameError> {
        let handle = self.handle(&normalize_code(code))?;
        let mut slot = handle.state.lock().await;
        if slot.closed {
            return Err(GameError::SessionNotFound {
                code: handle.code.clone(),
            });
        }
        if !slot.game.has_team(team_id) {
            return Err(GameError::InvalidState);
        }

        let content = self.runtime.content.clone();
        let reply = match command {
            SessionCommand::Start => {
                slot.game.check_start()?;
                slot.game.start();
                match slot.game.advance_round(content.as_ref()) {
                    Ok(advance) => self.runtime.apply_advance(&handle, &mut slot, advance),
                    Err(e) => {
                        error!("Game {} could not load its first item: {}", handle.code, e);
                        slot.game.abort_start();
                        self.runtime.broadcast(&slot.game).await;
                        return Err(e);
                    }
                }
                CommandReply::Started
            }
            SessionCommand::Guess(guess) => {
                let outcome = slot.game.submit_guess(team_id, &guess)?;
                if outcome.is_correct() {
                    slot.timers.cancel_countdown();
                    let generation = slot.game.item_generation();
                    let task = self
                        .runtime
                        .spawn_delayed_advance(Arc::downgrade(&handle), generation);
                    slot.timers.schedule_advance(task);
                }
                CommandReply::Guess(outcome)
            }
            SessionCommand::PressBuzzer => {
                slot.game.press_buzzer(team_id)?;
                CommandReply::BuzzerAccepted
            }
            SessionCommand::PassWord => {
                let advance = slot.game.pass_word(team_id, content.as_ref())?;
                slot.timers.cancel_advance();
                self.runtime.apply_advance(&handle, &mut slot, advance);
                CommandReply::Passed
            }
        };

        if let Some(message) = reply.direct_message() {
            self.runtime.send_to_team(team_id, message).await;
        }
        self.runtime.broadcast(&slot.game).await;
        if reply == CommandReply::Started {
            let team_ids: Vec<TeamId> = slot.game.teams().iter().map(|team| team.id).collect();
            self.runtime
                .connections
                .send_to_teams(&team_ids, ServerMessage::GameStarted)
                .await;
        }

        Ok(reply)
    }

    /// Remove a team, closing the session once nobody is left.
    pub async fn leave(&self, code: &str, team_id: TeamId) -> Result<(), GameError> {
        let handle = self.handle(&normalize_code(code))?;
        let mut slot = handle.state.lock().await;
        if slot.closed || !slot.game.remove_team(team_id) {
            return Err(GameError::InvalidState);
        }
        self.team_sessions.remove(&team_id);
        info!("Team {} left game {}", team_id, handle.code);

        if slot.game.is_empty() {
            slot.closed = true;
            slot.timers.cancel_all();
            self.sessions.remove(&handle.code);
            info!("Game {} closed", handle.code);
            return Ok(());
        }

        if slot.game.status() == SessionStatus::Finished {
            slot.timers.cancel_all();
        }
        self.runtime.broadcast(&slot.game).await;
        Ok(())
    }

    /// Leave whatever session the team is in, returning its code.
    pub async fn leave_current(&self, team_id: TeamId) -> Result<String, GameError> {
        let code = self
            .session_for_team(team_id)
            .ok_or(GameError::InvalidState)?;
        self.leave(&code, team_id).await?;
        Ok(code)
    }

    pub fn session_for_team(&self, team_id: TeamId) -> Option<String> {
        self.team_sessions
            .get(&team_id)
            .map(|entry| entry.value().clone())
    }

    pub async fn snapshot(&self, code: &str) -> Result<SessionSnapshot, GameError> {
        let handle = self.handle(&normalize_code(code))?;
        let slot = handle.state.lock().await;
        Ok(slot.game.snapshot())
    }

    pub async fn stats(&self) -> ServerStats {
        let handles: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut active_games = 0;
        for handle in &handles {
            if handle.state.lock().await.game.status() == SessionStatus::Playing {
                active_games += 1;
            }
        }

        ServerStats {
            total_games: handles.len(),
            total_players: self.team_sessions.len(),
            active_games,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the session still has a countdown or a pending advance scheduled
    pub async fn has_pending_timers(&self, code: &str) -> Result<bool, GameError> {
        let handle = self.handle(&normalize_code(code))?;
        let slot = handle.state.lock().await;
        Ok(slot.timers.has_countdown() || slot.timers.has_pending_advance())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn normalize_team_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidState);
    }
    Ok(name.chars().take(MAX_TEAM_NAME_CHARS).collect())
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use turgo_core::WordBank;
    use uuid::Uuid;

    /// Running game with three teams and only four-letter words available
    async fn started_registry() -> (SessionRegistry, String, Vec<TeamId>) {
        let registry = SessionRegistry::new(
            Arc::new(ConnectionManager::new()),
            Arc::new(WordBank::from_lists("lamp|Gives light", "")),
            SessionTimings::default(),
        );
        let ids: Vec<TeamId> = (0..3).map(|_| Uuid::new_v4()).collect();
        let code = registry.create(ids[0], "Owls").await.unwrap().code;
        for (id, name) in ids[1..].iter().zip(["Foxes", "Bears"]) {
            registry.join(&code, *id, name).await.unwrap();
        }
        registry
            .dispatch(&code, ids[0], SessionCommand::Start)
            .await
            .unwrap();
        (registry, code, ids)
    }

    #[test]
    fn test_generated_codes() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|byte| CODE_ALPHABET.contains(&byte)));
        }
    }

    #[test]
    fn test_team_name_normalization() {
        assert_eq!(normalize_team_name("  Owls ").unwrap(), "Owls");
        assert_eq!(normalize_team_name("   "), Err(GameError::InvalidState));

        let long = "x".repeat(40);
        assert_eq!(normalize_team_name(&long).unwrap().chars().count(), MAX_TEAM_NAME_CHARS);
    }

    #[test]
    fn test_code_normalization() {
        assert_eq!(normalize_code(" ab12cd "), "AB12CD");
    }

    #[test]
    fn test_direct_replies() {
        assert!(CommandReply::Started.direct_message().is_none());
        assert!(CommandReply::Passed.direct_message().is_none());
        assert!(matches!(
            CommandReply::BuzzerAccepted.direct_message(),
            Some(ServerMessage::BuzzerAccepted)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_session_drops_its_timers() {
        let (registry, code, ids) = started_registry().await;
        registry
            .dispatch(&code, ids[0], SessionCommand::Guess("lamp".to_string()))
            .await
            .unwrap();

        let handle = registry.handle(&code).unwrap();
        assert!(handle.state.lock().await.timers.has_pending_advance());
        for id in &ids {
            registry.leave(&code, *id).await.unwrap();
        }

        {
            let slot = handle.state.lock().await;
            assert!(slot.closed);
            assert!(!slot.timers.has_pending_advance());
            assert!(!slot.timers.has_countdown());
        }

        // The aborted advance never touches the closed session
        tokio::time::sleep(registry.runtime.timings.round_advance_delay * 2).await;
        assert_eq!(handle.state.lock().await.game.round(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_advance_finishes_game() {
        let (registry, code, ids) = started_registry().await;
        let delay = registry.runtime.timings.round_advance_delay * 2;

        // Three words load fine, the stage puzzle has no content
        for id in &ids {
            registry
                .dispatch(&code, *id, SessionCommand::Guess("lamp".to_string()))
                .await
                .unwrap();
            tokio::time::sleep(delay).await;
        }

        let handle = registry.handle(&code).unwrap();
        let slot = handle.state.lock().await;
        assert_eq!(slot.game.status(), SessionStatus::Finished);
        assert_eq!(slot.game.winner(), Some(ids[0]));
        assert!(!slot.timers.has_pending_advance());
        assert!(!slot.timers.has_countdown());
    }
}

#![allow(dead_code)]

use turgo_core::{GameRules, GameSession, WordBank};
use turgo_types::TeamId;
use uuid::Uuid;

/// One entry per length so every lookup is deterministic
pub fn create_test_bank() -> WordBank {
    let words = "lamp|Gives light on a desk\n\
                 apple|Keeps the doctor away\n\
                 bridge|Lets you cross a river\n\
                 blanket|Keeps you warm in bed";
    let puzzles = "Largest land animal with a trunk|elephant\n\
                   Tower guiding ships with its beam|lighthouse\n\
                   Work of putting up new buildings|construction";
    WordBank::from_lists(words, puzzles)
}

/// Creates a waiting session with the named teams in join order
pub fn create_session_with_teams(names: &[&str]) -> (GameSession, Vec<TeamId>) {
    create_session_with_rules(names, GameRules::default())
}

pub fn create_session_with_rules(names: &[&str], rules: GameRules) -> (GameSession, Vec<TeamId>) {
    let mut session = GameSession::with_rules("TEST01", rules);
    let ids: Vec<TeamId> = names
        .iter()
        .map(|name| {
            let id = Uuid::new_v4();
            assert!(session.add_team(id, *name), "failed to add {name}");
            id
        })
        .collect();
    (session, ids)
}

/// Starts the session and loads the first item
pub fn start_session(session: &mut GameSession, bank: &WordBank) {
    assert!(session.start(), "session should be startable");
    session
        .advance_round(bank)
        .expect("first item should load");
}

/// Solves whatever is on the board with the team holding the turn, buzzing in if nobody does
pub fn solve_current(session: &mut GameSession) -> TeamId {
    let answer = session
        .current_answer()
        .expect("an item should be on the board")
        .to_string();
    let team = match session.active_team() {
        Some(team) => team,
        None => {
            let candidate = session
                .teams()
                .iter()
                .find(|team| !team.is_eliminated)
                .expect("a team should remain")
                .id;
            session.press_buzzer(candidate).expect("buzzer should be open");
            candidate
        }
    };
    let outcome = session.submit_guess(team, &answer).expect("guess should be accepted");
    assert!(outcome.is_correct());
    team
}

/// Solves items until the session reaches the start of `stage`
pub fn play_until_stage(session: &mut GameSession, bank: &WordBank, stage: u8) {
    while session.stage() < stage {
        solve_current(session);
        session.advance_round(bank).expect("next item should load");
    }
}

pub fn score_of(session: &GameSession, team: TeamId) -> i32 {
    session.team(team).map(|team| team.score).unwrap_or_default()
}

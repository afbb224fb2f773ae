use crate::rules::StageConfig;

pub struct ScoringEngine;

impl ScoringEngine {
    /// Points for solving a word after `prior_wrong_attempts` misses in the current turn.
    pub fn word_points(stage: &StageConfig, prior_wrong_attempts: u32) -> i32 {
        match stage.attempt_penalty {
            Some(penalty) => {
                let deduction = penalty.per_attempt.saturating_mul(prior_wrong_attempts as i32);
                stage
                    .word_score
                    .saturating_sub(deduction)
                    .max(penalty.floor)
            }
            None => stage.word_score,
        }
    }

    /// Points for solving a puzzle once `revealed_letters` have been uncovered by the countdown.
    pub fn puzzle_points(stage: &StageConfig, revealed_letters: usize, reveal_penalty: i32) -> i32 {
        stage.puzzle_score - reveal_penalty * revealed_letters as i32
    }

    /// Lowercase and trim so guesses compare the same way answers do.
    pub fn normalize_guess(guess: &str) -> String {
        guess.trim().to_lowercase()
    }

    pub fn is_match(guess: &str, answer: &str) -> bool {
        Self::normalize_guess(guess) == Self::normalize_guess(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameRules;

    #[test]
    fn test_flat_word_points() {
        let rules = GameRules::default();
        let stage1 = rules.stage(1).unwrap();

        // Stages without a penalty ignore earlier misses
        assert_eq!(ScoringEngine::word_points(stage1, 0), 1000);
        assert_eq!(ScoringEngine::word_points(stage1, 4), 1000);
        assert_eq!(ScoringEngine::word_points(rules.stage(2).unwrap(), 2), 1500);
    }

    #[test]
    fn test_stage_three_attempt_penalty() {
        let rules = GameRules::default();
        let stage3 = rules.stage(3).unwrap();

        assert_eq!(ScoringEngine::word_points(stage3, 0), 2000);
        assert_eq!(ScoringEngine::word_points(stage3, 1), 1600);
        assert_eq!(ScoringEngine::word_points(stage3, 3), 800);
        // 2000 - 4 * 400 = 400, exactly at the floor
        assert_eq!(ScoringEngine::word_points(stage3, 4), 400);
        assert_eq!(ScoringEngine::word_points(stage3, 9), 400);
    }

    #[test]
    fn test_puzzle_points() {
        let rules = GameRules::default();
        let stage1 = rules.stage(1).unwrap();

        assert_eq!(ScoringEngine::puzzle_points(stage1, 0, 100), 2000);
        assert_eq!(ScoringEngine::puzzle_points(stage1, 3, 100), 1700);
        // Countdown caps at 10 letters, so the lowest stage never goes negative
        assert_eq!(ScoringEngine::puzzle_points(stage1, 10, 100), 1000);
        assert_eq!(ScoringEngine::puzzle_points(rules.stage(3).unwrap(), 10, 100), 3000);
    }

    #[test]
    fn test_guess_normalization() {
        assert_eq!(ScoringEngine::normalize_guess("  Table "), "table");
        assert!(ScoringEngine::is_match("APPLE", "apple"));
        assert!(ScoringEngine::is_match(" apple\n", "Apple"));
        assert!(!ScoringEngine::is_match("apples", "apple"));
        assert!(!ScoringEngine::is_match("", "apple"));
    }
}

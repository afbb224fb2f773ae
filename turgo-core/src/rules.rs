/// One entry of a stage script: a word or a puzzle of the given letter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageItem {
    Word(usize),
    Puzzle(usize),
}

/// Flat deduction applied to a correct word for every wrong attempt made before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPenalty {
    pub per_attempt: i32,
    pub floor: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    pub items: Vec<StageItem>,
    pub word_score: i32,
    pub puzzle_score: i32,
    pub attempt_penalty: Option<AttemptPenalty>,
    pub eliminates_on_exit: bool,
}

impl StageConfig {
    pub fn item(&self, round: usize) -> Option<StageItem> {
        self.items.get(round).copied()
    }

    pub fn word_lengths(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter_map(|item| match item {
                StageItem::Word(length) => Some(*length),
                StageItem::Puzzle(_) => None,
            })
            .collect()
    }

    pub fn puzzle_lengths(&self) -> Vec<usize> {
        self.items
            .iter()
            .filter_map(|item| match item {
                StageItem::Puzzle(length) => Some(*length),
                StageItem::Word(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    pub max_teams: usize,
    pub min_teams: usize,
    pub max_attempts: u32,
    pub countdown_max_ticks: u32,
    pub reveal_penalty: i32,
    pub stages: Vec<StageConfig>,
}

impl Default for GameRules {
    fn default() -> Self {
        use StageItem::{Puzzle, Word};

        Self {
            max_teams: 6,
            min_teams: 3,
            max_attempts: 5,
            countdown_max_ticks: 10,
            reveal_penalty: 100,
            stages: vec![
                StageConfig {
                    items: vec![Word(4), Word(4), Word(4), Puzzle(8)],
                    word_score: 1000,
                    puzzle_score: 2000,
                    attempt_penalty: None,
                    eliminates_on_exit: false,
                },
                StageConfig {
                    items: vec![Word(5), Word(5), Word(5), Word(5), Puzzle(10)],
                    word_score: 1500,
                    puzzle_score: 3000,
                    attempt_penalty: None,
                    eliminates_on_exit: true,
                },
                StageConfig {
                    items: vec![Word(5), Word(5), Puzzle(10), Word(6), Word(6), Puzzle(12)],
                    word_score: 2000,
                    puzzle_score: 4000,
                    attempt_penalty: Some(AttemptPenalty {
                        per_attempt: 400,
                        floor: 400,
                    }),
                    eliminates_on_exit: true,
                },
                // Final stage: words only, passing is allowed
                StageConfig {
                    items: vec![Word(4), Word(5), Word(6), Word(7)],
                    word_score: 2500,
                    puzzle_score: 0,
                    attempt_penalty: None,
                    eliminates_on_exit: false,
                },
            ],
        }
    }
}

impl GameRules {
    /// Stages are numbered from 1.
    pub fn stage(&self, stage: u8) -> Option<&StageConfig> {
        usize::from(stage)
            .checked_sub(1)
            .and_then(|index| self.stages.get(index))
    }

    pub fn final_stage(&self) -> u8 {
        self.stages.len() as u8
    }

    pub fn is_final_stage(&self, stage: u8) -> bool {
        stage == self.final_stage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stage_script() {
        let rules = GameRules::default();
        assert_eq!(rules.final_stage(), 4);

        let stage1 = rules.stage(1).unwrap();
        assert_eq!(stage1.word_lengths(), vec![4, 4, 4]);
        assert_eq!(stage1.puzzle_lengths(), vec![8]);

        let stage2 = rules.stage(2).unwrap();
        assert_eq!(stage2.word_lengths(), vec![5, 5, 5, 5]);
        assert_eq!(stage2.puzzle_lengths(), vec![10]);

        // Hybrid stage interleaves words and puzzles
        let stage3 = rules.stage(3).unwrap();
        assert_eq!(stage3.item(0), Some(StageItem::Word(5)));
        assert_eq!(stage3.item(1), Some(StageItem::Word(5)));
        assert_eq!(stage3.item(2), Some(StageItem::Puzzle(10)));
        assert_eq!(stage3.item(3), Some(StageItem::Word(6)));
        assert_eq!(stage3.item(4), Some(StageItem::Word(6)));
        assert_eq!(stage3.item(5), Some(StageItem::Puzzle(12)));
        assert_eq!(stage3.item(6), None);

        let stage4 = rules.stage(4).unwrap();
        assert_eq!(stage4.word_lengths(), vec![4, 5, 6, 7]);
        assert!(stage4.puzzle_lengths().is_empty());
    }

    #[test]
    fn test_elimination_boundaries() {
        let rules = GameRules::default();
        let eliminating: Vec<u8> = (1..=rules.final_stage())
            .filter(|stage| rules.stage(*stage).unwrap().eliminates_on_exit)
            .collect();
        assert_eq!(eliminating, vec![2, 3]);
    }

    #[test]
    fn test_stage_lookup_bounds() {
        let rules = GameRules::default();
        assert!(rules.stage(0).is_none());
        assert!(rules.stage(5).is_none());
        assert!(rules.is_final_stage(4));
        assert!(!rules.is_final_stage(3));
    }
}

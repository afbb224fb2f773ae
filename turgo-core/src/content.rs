use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;

const BUILTIN_WORDS: &str = include_str!("../data/words.txt");
const BUILTIN_PUZZLES: &str = include_str!("../data/puzzles.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub meaning: String,
}

impl Word {
    pub fn new(text: &str, meaning: &str) -> Self {
        Self {
            text: text.trim().to_lowercase(),
            meaning: meaning.trim().to_string(),
        }
    }

    pub fn length(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub clue: String,
    pub answer: String,
    pub answer_length: usize,
}

impl Puzzle {
    pub fn new(clue: &str, answer: &str) -> Self {
        let answer = answer.trim().to_lowercase();
        Self {
            clue: clue.trim().to_string(),
            answer_length: answer.chars().count(),
            answer,
        }
    }
}

/// Source of words and puzzles for a requested letter count.
///
/// Lookups are synchronous so sessions can load content while their lock is held.
pub trait ContentProvider: Send + Sync {
    fn random_word(&self, length: usize) -> Option<Word>;
    fn random_puzzle(&self, length: usize) -> Option<Puzzle>;
}

/// In-memory content bucketed by letter count.
#[derive(Debug, Clone, Default)]
pub struct WordBank {
    words: HashMap<usize, Vec<Word>>,
    puzzles: HashMap<usize, Vec<Puzzle>>,
}

impl WordBank {
    /// Build from a `word|meaning` list and a `clue|answer` list
    pub fn from_lists(word_list: &str, puzzle_list: &str) -> Self {
        let mut bank = Self::default();

        for (text, meaning) in parse_entries(word_list) {
            let word = Word::new(text, meaning);
            bank.words.entry(word.length()).or_default().push(word);
        }

        for (clue, answer) in parse_entries(puzzle_list) {
            let puzzle = Puzzle::new(clue, answer);
            bank.puzzles
                .entry(puzzle.answer_length)
                .or_default()
                .push(puzzle);
        }

        bank
    }

    /// Load `words.txt` and `puzzles.txt` from a directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let words_path = dir.join("words.txt");
        let puzzles_path = dir.join("puzzles.txt");

        let word_list = fs::read_to_string(&words_path)
            .with_context(|| format!("Failed to read word list {}", words_path.display()))?;
        let puzzle_list = fs::read_to_string(&puzzles_path)
            .with_context(|| format!("Failed to read puzzle list {}", puzzles_path.display()))?;

        Ok(Self::from_lists(&word_list, &puzzle_list))
    }

    /// Lists compiled into the binary
    pub fn builtin() -> Self {
        Self::from_lists(BUILTIN_WORDS, BUILTIN_PUZZLES)
    }

    pub fn word_count_by_length(&self, length: usize) -> usize {
        self.words.get(&length).map_or(0, Vec::len)
    }

    pub fn puzzle_count_by_length(&self, length: usize) -> usize {
        self.puzzles.get(&length).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.puzzles.is_empty()
    }
}

impl ContentProvider for WordBank {
    fn random_word(&self, length: usize) -> Option<Word> {
        self.words
            .get(&length)
            .and_then(|bucket| bucket.choose(&mut rand::rng()))
            .cloned()
    }

    fn random_puzzle(&self, length: usize) -> Option<Puzzle> {
        self.puzzles
            .get(&length)
            .and_then(|bucket| bucket.choose(&mut rand::rng()))
            .cloned()
    }
}

fn parse_entries(list: &str) -> impl Iterator<Item = (&str, &str)> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('|'))
        .filter(|(left, right)| !left.trim().is_empty() && !right.trim().is_empty())
}

//! Crossword construction engine.
//!
//! Given a dictionary of words with clues and a seed string, `PuzzleBuilder` generates a
//! symmetric block pattern, finds the slots in it, fills them with mutually-consistent words
//! using arc consistency plus backtracking search, checks that no stray letter runs were formed,
//! numbers the grid and emits a `GeneratedPuzzle`. `answers::validate_answers` checks a player's
//! in-progress grid against a generated solution.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Not;

pub mod answers;
pub mod arc_consistency;
pub mod builder;
pub mod clues;
pub mod config;
pub mod error;
pub mod grid;
pub mod pattern;
pub mod slots;
pub mod solver;
pub mod structure;
pub mod word_corpus;

pub use answers::{validate_answers, ClueId, PlayerCell, ValidationRequest, ValidationResult};
pub use builder::{daily_seed, PuzzleBuilder};
pub use clues::{ClueEntry, GeneratedPuzzle, PlacedWord, PuzzleSize};
pub use config::PuzzleConfig;
pub use error::{ConfigError, CorpusError, GenerationError, ParseClueIdError, TemplateError};
pub use grid::{Cell, Grid};
pub use slots::{Intersection, Slot, SlotIndex};
pub use solver::{find_fill, FillFailure, FillOptions, FillSuccess, Statistics};
pub use word_corpus::{DictionaryEntry, RawEntry, WordCorpus};

/// The number of distinct letters a grid cell can hold.
pub const LETTER_COUNT: usize = 26;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the `SlotIndex`'s `slots` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the corpus (within the relevant length
/// bucket).
pub type WordId = usize;

/// Zero-indexed (row, col) coords for a cell in the grid, where row = 0 is the top row.
pub type Pos = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    /// The position of the `offset`th cell of a run starting at `origin` in this direction.
    pub fn step(self, origin: Pos, offset: usize) -> Pos {
        match self {
            Direction::Across => (origin.0, origin.1 + offset),
            Direction::Down => (origin.0 + offset, origin.1),
        }
    }
}

impl Not for Direction {
    type Output = Self;
    fn not(self) -> Self {
        match self {
            Direction::Across => Direction::Down,
            Direction::Down => Direction::Across,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Map an ASCII letter onto its index in `0..LETTER_COUNT`, case-insensitively.
pub fn letter_index(c: char) -> Option<u8> {
    c.is_ascii_alphabetic().then(|| (c.to_ascii_uppercase() as u8) - b'A')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_step_and_not() {
        assert_eq!(Direction::Across.step((2, 3), 2), (2, 5));
        assert_eq!(Direction::Down.step((2, 3), 2), (4, 3));
        assert_eq!(!Direction::Across, Direction::Down);
    }

    #[test]
    fn test_letter_index_round_trips_case_insensitively() {
        assert_eq!(letter_index('a'), Some(0));
        assert_eq!(letter_index('Z'), Some(25));
        assert_eq!(letter_index('-'), None);
        assert_eq!(letter_index('q'), Some(16));
    }
}

//! Post-fill checks that read the grid itself rather than the slot list. Adjacent placements can
//! form letter runs the solver never treated as slots, so every run has to be looked up again.

use std::fmt::{Display, Formatter};

use crate::grid::Grid;
use crate::word_corpus::WordCorpus;
use crate::{Direction, Pos};

/// A maximal horizontal or vertical run of filled cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterRun {
    pub origin: Pos,
    pub direction: Direction,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureViolation {
    /// A run of two or more letters that isn't in the corpus.
    UnknownWord(LetterRun),
    /// An open cell that was never given a letter.
    EmptyCell(Pos),
}

impl Display for StructureViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureViolation::UnknownWord(run) => write!(
                f,
                "{} at ({}, {}) {}",
                run.text, run.origin.0, run.origin.1, run.direction
            ),
            StructureViolation::EmptyCell((row, col)) => write!(f, "empty cell at ({}, {})", row, col),
        }
    }
}

/// Every maximal run of at least two letters, across runs first, each in scan order.
pub fn letter_runs(grid: &Grid) -> Vec<LetterRun> {
    let mut runs = vec![];

    for direction in [Direction::Across, Direction::Down] {
        for line in 0..grid.size() {
            let cell = |idx: usize| match direction {
                Direction::Across => (line, idx),
                Direction::Down => (idx, line),
            };

            let mut idx = 0;
            while idx < grid.size() {
                let start = idx;
                let mut text = String::new();
                while let Some(letter) = grid.letter(cell(idx)) {
                    text.push(letter);
                    idx += 1;
                }

                if text.len() >= 2 {
                    runs.push(LetterRun { origin: cell(start), direction, text });
                }
                if idx == start {
                    idx += 1;
                }
            }
        }
    }

    runs
}

/// Check a filled grid. An empty result means every open cell is filled and every run of two or
/// more letters is a corpus word.
pub fn find_violations(grid: &Grid, corpus: &WordCorpus) -> Vec<StructureViolation> {
    let empty_cells = grid
        .positions()
        .filter(|&pos| grid.is_open(pos) && grid.letter(pos).is_none())
        .map(StructureViolation::EmptyCell);

    let unknown_words = letter_runs(grid)
        .into_iter()
        .filter(|run| !corpus.contains(&run.text))
        .map(StructureViolation::UnknownWord);

    empty_cells.chain(unknown_words).collect()
}

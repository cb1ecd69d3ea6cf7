use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::grid::Grid;
use crate::slots::SlotIndex;
use crate::solver::Choice;
use crate::word_corpus::WordCorpus;
use crate::{Direction, Pos};

/// A filled slot with its number and clue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedWord {
    pub word: String,
    pub clue: String,
    pub origin: Pos,
    pub direction: Direction,
    pub number: u32,
}

/// One line of the clue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueEntry {
    pub number: u32,
    pub clue: String,
    pub answer: String,
    pub direction: Direction,
    pub start_row: usize,
    pub start_col: usize,
    pub length: usize,
}

impl ClueEntry {
    /// The grid positions this clue covers, in reading order.
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        let origin = (self.start_row, self.start_col);
        (0..self.length).map(move |offset| self.direction.step(origin, offset))
    }
}

impl From<&PlacedWord> for ClueEntry {
    fn from(placed: &PlacedWord) -> Self {
        ClueEntry {
            number: placed.number,
            clue: placed.clue.clone(),
            answer: placed.word.clone(),
            direction: placed.direction,
            start_row: placed.origin.0,
            start_col: placed.origin.1,
            length: placed.word.chars().count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSize {
    pub rows: usize,
    pub cols: usize,
}

/// The finished puzzle: the solution grid (letters, numbers and blocks) and its clue list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPuzzle {
    pub grid: Grid,
    pub clues: Vec<ClueEntry>,
    pub size: PuzzleSize,
}

impl GeneratedPuzzle {
    /// The grid as shown to a player: numbers and blocks, no letters.
    pub fn player_grid(&self) -> Grid {
        self.grid.cleared()
    }
}

/// Number the grid in a single row-major scan. A cell gets the next number iff one of `starts`
/// begins there; any numbers already in the grid are replaced.
pub fn number_grid<I>(grid: &mut Grid, starts: I) -> BTreeMap<Pos, u32>
where
    I: IntoIterator<Item = Pos>,
{
    let starts: BTreeSet<Pos> = starts.into_iter().collect();
    let mut numbers = BTreeMap::new();
    let mut next = 1;

    for pos in grid.positions().collect::<Vec<_>>() {
        let number = (grid.is_open(pos) && starts.contains(&pos)).then(|| {
            next += 1;
            next - 1
        });
        if let Some(cell) = grid.get_mut(pos) {
            cell.number = number;
        }
        if let Some(number) = number {
            numbers.insert(pos, number);
        }
    }

    numbers
}

/// Turn a successful fill into a puzzle: number the filled grid and list the clues, ordered by
/// number with across before down.
pub fn assemble_puzzle(
    filled: &Grid,
    index: &SlotIndex,
    corpus: &WordCorpus,
    choices: &[Choice],
) -> GeneratedPuzzle {
    let mut grid = filled.clone();
    let numbers = number_grid(&mut grid, choices.iter().map(|c| index.get(c.slot_id).origin));

    let mut placed: Vec<PlacedWord> = choices
        .iter()
        .filter_map(|choice| {
            let slot = index.get(choice.slot_id);
            let entry = corpus.get(slot.length, choice.word_id);
            Some(PlacedWord {
                word: entry.word.clone(),
                clue: entry.clue.clone(),
                origin: slot.origin,
                direction: slot.direction,
                number: *numbers.get(&slot.origin)?,
            })
        })
        .collect();
    placed.sort_by_key(|word| (word.number, word.direction));

    let size = grid.size();
    GeneratedPuzzle {
        grid,
        clues: placed.iter().map(ClueEntry::from).collect(),
        size: PuzzleSize { rows: size, cols: size },
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::error::TemplateError;
use crate::{Direction, Pos};

/// A single grid square.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub letter: Option<char>,
    pub number: Option<u32>,
    pub is_blocked: bool,
}

impl Cell {
    pub fn blocked() -> Cell {
        Cell { is_blocked: true, ..Cell::default() }
    }

    pub fn is_open(&self) -> bool {
        !self.is_blocked
    }
}

/// A square matrix of cells, serialized as `Cell[rows][cols]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    /// An all-open grid.
    pub fn new(size: usize) -> Grid {
        Grid { rows: vec![vec![Cell::default(); size]; size] }
    }

    /// Parse a text template, with `#` representing blocks, `.` representing empty cells, and
    /// letters representing themselves. Leading/trailing whitespace and blank lines are ignored.
    pub fn from_template(template: &str) -> Result<Grid, TemplateError> {
        let lines: Vec<&str> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(TemplateError::Empty);
        }

        let size = lines.len();
        let mut rows = Vec::with_capacity(size);

        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != size {
                return Err(TemplateError::NotSquare { row, found, expected: size });
            }

            let cells = line
                .chars()
                .enumerate()
                .map(|(col, c)| match c {
                    '#' => Ok(Cell::blocked()),
                    '.' => Ok(Cell::default()),
                    c if c.is_ascii_alphabetic() => Ok(Cell {
                        letter: Some(c.to_ascii_uppercase()),
                        ..Cell::default()
                    }),
                    found => Err(TemplateError::BadCell { row, col, found }),
                })
                .collect::<Result<Vec<_>, _>>()?;

            rows.push(cells);
        }

        Ok(Grid { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn get(&self, (row, col): Pos) -> Option<&Cell> {
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    pub fn get_mut(&mut self, (row, col): Pos) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|cells| cells.get_mut(col))
    }

    /// Is this position inside the grid and not blocked?
    pub fn is_open(&self, pos: Pos) -> bool {
        self.get(pos).map_or(false, Cell::is_open)
    }

    pub fn letter(&self, pos: Pos) -> Option<char> {
        self.get(pos).and_then(|cell| cell.letter)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> {
        let size = self.size();
        (0..size).flat_map(move |row| (0..size).map(move |col| (row, col)))
    }

    /// The letters in a run of cells, with `.` standing in for empty or missing cells.
    pub fn pattern(&self, origin: Pos, direction: Direction, length: usize) -> String {
        (0..length)
            .map(|offset| self.letter(direction.step(origin, offset)).unwrap_or('.'))
            .collect()
    }

    /// Write a word into the grid starting at `origin`.
    pub fn place_word(&mut self, origin: Pos, direction: Direction, word: &str) {
        for (offset, letter) in word.chars().enumerate() {
            if let Some(cell) = self.get_mut(direction.step(origin, offset)) {
                cell.letter = Some(letter);
            }
        }
    }

    pub fn blocked_count(&self) -> usize {
        self.rows.iter().flatten().filter(|cell| cell.is_blocked).count()
    }

    pub fn blocked_ratio(&self) -> f64 {
        let total = self.size() * self.size();
        if total == 0 {
            0.0
        } else {
            self.blocked_count() as f64 / total as f64
        }
    }

    /// Is the block layout unchanged by a half-turn rotation?
    pub fn is_symmetric(&self) -> bool {
        let last = self.size().saturating_sub(1);
        self.positions().all(|(row, col)| {
            self.rows[row][col].is_blocked == self.rows[last - row][last - col].is_blocked
        })
    }

    /// A copy with every letter removed, for handing to a player.
    pub fn cleared(&self) -> Grid {
        let mut grid = self.clone();
        for cell in grid.rows.iter_mut().flatten() {
            cell.letter = None;
        }
        grid
    }

    /// Render the grid as text, in the same format `from_template` accepts.
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| match cell {
                        Cell { is_blocked: true, .. } => '#',
                        Cell { letter: Some(letter), .. } => *letter,
                        _ => '.',
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

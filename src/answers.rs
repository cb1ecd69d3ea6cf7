//! Checking a player's in-progress grid against a solution.
//!
//! A cell shared by an across and a down clue may hold a different letter for each, depending on
//! which clue the player was typing in. Cells are judged by the letter on display, while clues
//! are judged by the letters typed for their own direction.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::clues::ClueEntry;
use crate::error::ParseClueIdError;
use crate::grid::Grid;
use crate::{Direction, Pos};

/// What a player has typed into one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCell {
    /// The letter on display.
    #[serde(default, deserialize_with = "deserialize_letter")]
    pub letter: Option<char>,
    /// The letter typed while working on the across clue, if recorded separately.
    #[serde(default, deserialize_with = "deserialize_letter")]
    pub across: Option<char>,
    #[serde(default, deserialize_with = "deserialize_letter")]
    pub down: Option<char>,
}

impl PlayerCell {
    pub fn new(letter: char) -> PlayerCell {
        PlayerCell { letter: Some(letter), ..PlayerCell::default() }
    }

    pub fn displayed(&self) -> Option<char> {
        self.letter.or(self.across).or(self.down)
    }

    /// The letter that counts toward a clue in `direction`.
    pub fn for_direction(&self, direction: Direction) -> Option<char> {
        let own = match direction {
            Direction::Across => self.across,
            Direction::Down => self.down,
        };
        own.or(self.letter)
    }
}

/// Blank strings and nulls both mean "nothing typed".
fn deserialize_letter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<char>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.and_then(|text| text.trim().chars().next()))
}

/// A clue number plus direction, written `5-across`. Across and down clues can share a number,
/// so the number alone doesn't identify a clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClueId {
    pub number: u32,
    pub direction: Direction,
}

impl ClueId {
    pub fn new(number: u32, direction: Direction) -> ClueId {
        ClueId { number, direction }
    }
}

impl From<&ClueEntry> for ClueId {
    fn from(clue: &ClueEntry) -> Self {
        ClueId::new(clue.number, clue.direction)
    }
}

impl Display for ClueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.number, self.direction)
    }
}

impl FromStr for ClueId {
    type Err = ParseClueIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseClueIdError(s.to_string());

        let (number, direction) = s.trim().split_once('-').ok_or_else(invalid)?;
        let number = number.parse().map_err(|_| invalid())?;
        let direction = match direction.to_ascii_lowercase().as_str() {
            "across" | "a" => Direction::Across,
            "down" | "d" => Direction::Down,
            _ => return Err(invalid()),
        };

        Ok(ClueId { number, direction })
    }
}

impl TryFrom<String> for ClueId {
    type Error = ParseClueIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClueId> for String {
    fn from(id: ClueId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Row-major; may be ragged or smaller than the solution while the player is editing.
    pub player_grid: Vec<Vec<PlayerCell>>,
    pub solution: Grid,
    pub clues: Vec<ClueEntry>,
    /// Clues the caller already knows to be complete.
    #[serde(default)]
    pub completed: BTreeSet<ClueId>,
}

/// Per-clue entries are keyed by `ClueId` (`"5-across"`) rather than by the bare clue number,
/// since an across and a down clue often share a number. The same goes for `newly_completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Keyed by `"row,col"`; open cells only.
    pub cells: BTreeMap<String, bool>,
    pub clues: BTreeMap<ClueId, bool>,
    /// The letters read along each clue, for echoing back to the player.
    pub answers: BTreeMap<ClueId, String>,
    pub newly_completed: Vec<ClueId>,
}

fn matches_solution(typed: Option<char>, solution: Option<char>) -> bool {
    match (typed, solution) {
        (Some(typed), Some(solution)) => typed.eq_ignore_ascii_case(&solution),
        _ => false,
    }
}

/// Compare a player's grid against the solution. Missing or out-of-range player cells count as
/// empty; this never fails.
pub fn validate_answers(request: &ValidationRequest) -> ValidationResult {
    let player_cell =
        |(row, col): Pos| request.player_grid.get(row).and_then(|cells| cells.get(col));
    let mut result = ValidationResult::default();

    for pos in request.solution.positions().filter(|&pos| request.solution.is_open(pos)) {
        let displayed = player_cell(pos).and_then(PlayerCell::displayed);
        result.cells.insert(
            format!("{},{}", pos.0, pos.1),
            matches_solution(displayed, request.solution.letter(pos)),
        );
    }

    for clue in &request.clues {
        let id = ClueId::from(clue);

        let mut answer = String::new();
        let mut all_match = true;
        for pos in clue.cells() {
            let typed = player_cell(pos).and_then(|cell| cell.for_direction(clue.direction));
            if let Some(letter) = typed {
                answer.push(letter.to_ascii_uppercase());
            }
            all_match &= matches_solution(typed, request.solution.letter(pos));
        }

        let correct = all_match && answer.chars().count() == clue.length;
        if correct && !request.completed.contains(&id) {
            result.newly_completed.push(id);
        }
        result.clues.insert(id, correct);
        result.answers.insert(id, answer);
    }

    result.newly_completed.sort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clue(number: u32, direction: Direction, start: Pos, answer: &str) -> ClueEntry {
        ClueEntry {
            number,
            clue: format!("Clue {}", number),
            answer: answer.to_string(),
            direction,
            start_row: start.0,
            start_col: start.1,
            length: answer.len(),
        }
    }

    fn square() -> (Grid, Vec<ClueEntry>) {
        let solution = Grid::from_template(
            "
            cat
            ore
            wed
            ",
        )
        .unwrap();
        let clues = vec![
            clue(1, Direction::Across, (0, 0), "CAT"),
            clue(1, Direction::Down, (0, 0), "COW"),
            clue(2, Direction::Down, (0, 1), "ARE"),
            clue(3, Direction::Down, (0, 2), "TED"),
            clue(4, Direction::Across, (1, 0), "ORE"),
            clue(5, Direction::Across, (2, 0), "WED"),
        ];
        (solution, clues)
    }

    fn copy_of(solution: &Grid) -> Vec<Vec<PlayerCell>> {
        solution
            .rows()
            .iter()
            .map(|cells| {
                cells
                    .iter()
                    .map(|cell| PlayerCell { letter: cell.letter, ..PlayerCell::default() })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_partial_answer_is_incorrect() {
        let mut solution = Grid::new(7);
        solution.place_word((2, 3), Direction::Across, "STAR");

        let mut player_grid = vec![vec![PlayerCell::default(); 7]; 7];
        player_grid[2][3] = PlayerCell::new('S');
        player_grid[2][4] = PlayerCell::new('t');
        player_grid[2][6] = PlayerCell::new('R');

        let result = validate_answers(&ValidationRequest {
            player_grid,
            solution,
            clues: vec![clue(5, Direction::Across, (2, 3), "STAR")],
            completed: BTreeSet::new(),
        });

        let id = ClueId::new(5, Direction::Across);
        assert!(!result.clues[&id]);
        assert_eq!(result.answers[&id], "STR");
        assert!(result.cells["2,3"]);
        assert!(result.cells["2,4"]);
        assert!(!result.cells["2,5"]);
        assert!(result.newly_completed.is_empty());
    }

    #[test]
    fn test_complete_grid_completes_every_clue() {
        let (solution, clues) = square();

        let mut request = ValidationRequest {
            player_grid: copy_of(&solution),
            solution,
            clues,
            completed: BTreeSet::new(),
        };
        let result = validate_answers(&request);

        assert!(result.cells.values().all(|&correct| correct));
        assert_eq!(result.cells.len(), 9);
        assert!(result.clues.values().all(|&correct| correct));
        let mut all: Vec<ClueId> = request.clues.iter().map(ClueId::from).collect();
        all.sort();
        assert_eq!(result.newly_completed, all);

        request.completed.insert(ClueId::new(1, Direction::Down));
        let result = validate_answers(&request);
        assert_eq!(result.newly_completed.len(), 5);
        assert!(!result.newly_completed.contains(&ClueId::new(1, Direction::Down)));
    }

    #[test]
    fn test_orientation_letters_are_independent() {
        let (solution, clues) = square();
        let mut player_grid = copy_of(&solution);
        // Typed C for 1-across, then X over it while working on 1-down.
        player_grid[0][0] = PlayerCell { letter: Some('X'), across: Some('C'), down: Some('X') };

        let result = validate_answers(&ValidationRequest {
            player_grid,
            solution,
            clues,
            completed: BTreeSet::new(),
        });

        assert!(result.clues[&ClueId::new(1, Direction::Across)]);
        assert!(!result.clues[&ClueId::new(1, Direction::Down)]);
        assert_eq!(result.answers[&ClueId::new(1, Direction::Down)], "XOW");
        assert!(!result.cells["0,0"]);
    }

    #[test]
    fn test_short_player_grid_is_tolerated() {
        let (solution, clues) = square();
        let player_grid = vec!["CAT".chars().map(PlayerCell::new).collect()];

        let result = validate_answers(&ValidationRequest {
            player_grid,
            solution,
            clues,
            completed: BTreeSet::new(),
        });

        assert_eq!(result.newly_completed, vec![ClueId::new(1, Direction::Across)]);
        assert_eq!(result.answers[&ClueId::new(3, Direction::Down)], "T");
        assert!(!result.cells["2,2"]);
    }

    #[test]
    fn test_clue_id_strings() {
        assert_eq!(ClueId::new(5, Direction::Across).to_string(), "5-across");
        assert_eq!("12-down".parse::<ClueId>(), Ok(ClueId::new(12, Direction::Down)));
        assert_eq!(
            "12-sideways".parse::<ClueId>(),
            Err(ParseClueIdError("12-sideways".to_string()))
        );
        assert!("down".parse::<ClueId>().is_err());
    }

    #[test]
    fn test_request_and_result_json() {
        let request: ValidationRequest = serde_json::from_value(serde_json::json!({
            "playerGrid": [[{ "letter": "h", "across": "", "down": null }, { "letter": "I" }]],
            "solution": [
                [{ "letter": "H", "number": 1, "isBlocked": false },
                 { "letter": "I", "number": null, "isBlocked": false }],
                [{ "letter": null, "number": null, "isBlocked": true },
                 { "letter": null, "number": null, "isBlocked": true }],
            ],
            "clues": [{
                "number": 1, "clue": "Greeting", "answer": "HI", "direction": "across",
                "startRow": 0, "startCol": 0, "length": 2,
            }],
            "completed": [],
        }))
        .unwrap();
        assert_eq!(request.player_grid[0][0].across, None);

        let result = validate_answers(&request);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cells": { "0,0": true, "0,1": true },
                "clues": { "1-across": true },
                "answers": { "1-across": "HI" },
                "newlyCompleted": ["1-across"],
            }),
        );
    }
}

//! Block-pattern generation. Patterns know nothing about words: they only guarantee half-turn
//! symmetry, a capped block count, no isolated blocks, no runs too short to hold a word, and a
//! single connected region of open cells.

use log::trace;
use rand::Rng;
use std::collections::VecDeque;

use crate::config::PuzzleConfig;
use crate::grid::Grid;
use crate::{Direction, Pos};

/// How many random placements to try per cell before settling for the blocks we have.
const PLACEMENT_TRIES_PER_CELL: usize = 8;

/// Generate a symmetric block pattern for the given config.
pub fn generate_pattern<R: Rng>(config: &PuzzleConfig, rng: &mut R) -> Grid {
    let size = config.size;
    let limit = config.max_blocked_cells();
    let mut grid = Grid::new(size);

    if limit == 0 || size == 0 {
        return grid;
    }

    // Anchors: an optional corner, a notch on the top or left edge, and one interior block. These
    // break up the longest runs before the random fill starts.
    let mut anchors: Vec<Pos> = vec![];
    if rng.gen_bool(0.5) {
        anchors.push((0, 0));
    }
    let edge_range = config.min_word_length..size.saturating_sub(config.min_word_length);
    if !edge_range.is_empty() {
        let offset = rng.gen_range(edge_range);
        anchors.push(if rng.gen_bool(0.5) { (0, offset) } else { (offset, 0) });
    }
    let third = size / 3;
    if third > 0 && size - third > third {
        anchors.push((rng.gen_range(third..size - third), rng.gen_range(third..size - third)));
    }

    for anchor in anchors {
        if try_place_pair(&mut grid, anchor, limit, config.min_word_length) {
            trace!("Anchor block at {:?}", anchor);
        }
    }

    // Now scatter symmetric pairs until we run out of budget or tries. Aiming for somewhere
    // between 60% and 100% of the cap keeps the density varied from day to day.
    let target = rng.gen_range((limit * 3 / 5).max(1)..=limit);
    for _ in 0..size * size * PLACEMENT_TRIES_PER_CELL {
        if grid.blocked_count() >= target {
            break;
        }
        let pos = (rng.gen_range(0..size), rng.gen_range(0..size));
        try_place_pair(&mut grid, pos, target, config.min_word_length);
    }

    trace!("Pattern:\n{}", grid);

    grid
}

/// Block `pos` and its rotational mirror, unless that would exceed `limit`, put a block next to
/// another block, or leave the pattern unusable. Returns whether the pair was placed.
fn try_place_pair(grid: &mut Grid, pos: Pos, limit: usize, min_word_length: usize) -> bool {
    let last = grid.size() - 1;
    let mirror = (last - pos.0, last - pos.1);
    let cells: Vec<Pos> = if mirror == pos { vec![pos] } else { vec![pos, mirror] };

    if cells.iter().any(|&cell| !grid.is_open(cell)) {
        return false;
    }
    if grid.blocked_count() + cells.len() > limit {
        return false;
    }
    if cells.iter().any(|&cell| neighbors(grid, cell).any(|n| !grid.is_open(n))) {
        return false;
    }

    set_blocked(grid, &cells, true);

    if !is_usable_pattern(grid, min_word_length) {
        set_blocked(grid, &cells, false);
        return false;
    }

    true
}

fn set_blocked(grid: &mut Grid, cells: &[Pos], is_blocked: bool) {
    for &cell in cells {
        if let Some(cell) = grid.get_mut(cell) {
            cell.is_blocked = is_blocked;
        }
    }
}

/// Orthogonal neighbors that lie inside the grid.
fn neighbors(grid: &Grid, (row, col): Pos) -> impl Iterator<Item = Pos> {
    let size = grid.size();
    [
        row.checked_sub(1).map(|r| (r, col)),
        (row + 1 < size).then(|| (row + 1, col)),
        col.checked_sub(1).map(|c| (row, c)),
        (col + 1 < size).then(|| (row, col + 1)),
    ]
    .into_iter()
    .flatten()
}

/// The length of the open run through `pos` in the given direction (0 if `pos` is blocked).
pub fn run_length(grid: &Grid, pos: Pos, direction: Direction) -> usize {
    if !grid.is_open(pos) {
        return 0;
    }

    let (row, col) = pos;
    let (line, start_idx) = match direction {
        Direction::Across => (row, col),
        Direction::Down => (col, row),
    };
    let cell = |idx: usize| match direction {
        Direction::Across => (line, idx),
        Direction::Down => (idx, line),
    };

    let mut start = start_idx;
    while start > 0 && grid.is_open(cell(start - 1)) {
        start -= 1;
    }
    let mut end = start_idx;
    while grid.is_open(cell(end + 1)) {
        end += 1;
    }

    end - start + 1
}

/// Can every open cell hold a letter that belongs to some word? That means no run is too short
/// to be a slot (single unchecked cells are fine), every open cell lies in at least one slot, and
/// the open cells form one connected region.
pub fn is_usable_pattern(grid: &Grid, min_word_length: usize) -> bool {
    for pos in grid.positions().filter(|&pos| grid.is_open(pos)) {
        let across = run_length(grid, pos, Direction::Across);
        let down = run_length(grid, pos, Direction::Down);

        let is_short = |length: usize| length > 1 && length < min_word_length;
        if is_short(across) || is_short(down) {
            return false;
        }
        if across < min_word_length && down < min_word_length {
            return false;
        }
    }

    open_cells_connected(grid)
}

/// Are all the open cells reachable from each other through orthogonal steps?
pub fn open_cells_connected(grid: &Grid) -> bool {
    let open: Vec<Pos> = grid.positions().filter(|&pos| grid.is_open(pos)).collect();
    let Some(&start) = open.first() else {
        return true;
    };

    let size = grid.size();
    let mut seen = vec![false; size * size];
    let mut queue = VecDeque::from([start]);
    seen[start.0 * size + start.1] = true;
    let mut reached = 0;

    while let Some(pos) = queue.pop_front() {
        reached += 1;
        for next in neighbors(grid, pos) {
            if grid.is_open(next) && !seen[next.0 * size + next.1] {
                seen[next.0 * size + next.1] = true;
                queue.push_back(next);
            }
        }
    }

    reached == open.len()
}

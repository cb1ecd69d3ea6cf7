use smallvec::{smallvec, SmallVec};
use std::collections::VecDeque;

use crate::grid::Grid;
use crate::{Direction, Pos, SlotId, MAX_SLOT_LENGTH};

/// A crossing between one slot and another, referencing the other slot's id and the location of
/// the intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// A maximal run of open cells that will hold one word.
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: SlotId,
    pub origin: Pos,
    pub direction: Direction,
    pub length: usize,
    /// Letters the grid held when the index was built (pre-filled template letters), with `.`
    /// for empty cells. The search never rewrites this; its progress lives in the domains.
    pub pattern: String,
    /// One entry per cell; `Some` if a slot in the other direction passes through that cell.
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl Slot {
    pub fn cells(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.length).map(move |offset| self.direction.step(self.origin, offset))
    }

    /// Number of slots crossing this one.
    pub fn degree(&self) -> usize {
        self.crossings.iter().flatten().count()
    }

    /// The known letter at each offset, if any.
    pub fn fixed_letters(&self) -> impl Iterator<Item = (usize, char)> + '_ {
        self.pattern.chars().enumerate().filter(|&(_, c)| c != '.')
    }

    pub fn neighbors(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.crossings.iter().flatten().map(|crossing| crossing.other_slot_id)
    }
}

/// A shared cell between an across slot and a down slot: cell `pos_a` of `slot_a` is the same
/// grid square as cell `pos_b` of `slot_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intersection {
    pub slot_a: SlotId,
    pub pos_a: usize,
    pub slot_b: SlotId,
    pub pos_b: usize,
}

impl Intersection {
    pub fn reversed(&self) -> Intersection {
        Intersection {
            slot_a: self.slot_b,
            pos_a: self.pos_b,
            slot_b: self.slot_a,
            pos_b: self.pos_a,
        }
    }
}

/// Every slot in a grid plus the crossing graph between them.
#[derive(Debug, Clone)]
pub struct SlotIndex {
    slots: Vec<Slot>,
    intersections: Vec<Intersection>,
    /// Slot ids sorted by descending degree, ties broken by id.
    by_degree: Vec<SlotId>,
}

impl SlotIndex {
    /// Find all runs of at least `min_word_length` open cells, across then down, and work out
    /// where they cross.
    pub fn build(grid: &Grid, min_word_length: usize) -> SlotIndex {
        let mut slots: Vec<Slot> = vec![];

        for direction in [Direction::Across, Direction::Down] {
            for line in 0..grid.size() {
                let cell = |idx: usize| match direction {
                    Direction::Across => (line, idx),
                    Direction::Down => (idx, line),
                };

                let mut idx = 0;
                while idx < grid.size() {
                    if !grid.is_open(cell(idx)) {
                        idx += 1;
                        continue;
                    }

                    let start = idx;
                    while grid.is_open(cell(idx)) {
                        idx += 1;
                    }

                    let length = idx - start;
                    if length >= min_word_length {
                        let origin = cell(start);
                        slots.push(Slot {
                            id: slots.len(),
                            origin,
                            direction,
                            length,
                            pattern: grid.pattern(origin, direction, length),
                            crossings: smallvec![None; length],
                        });
                    }
                }
            }
        }

        let mut intersections = vec![];
        let (across, down): (Vec<&Slot>, Vec<&Slot>) =
            slots.iter().partition(|slot| slot.direction == Direction::Across);

        for a in &across {
            let (row, col) = a.origin;
            for d in &down {
                let (row2, col2) = d.origin;
                if (col..col + a.length).contains(&col2) && (row2..row2 + d.length).contains(&row) {
                    intersections.push(Intersection {
                        slot_a: a.id,
                        pos_a: col2 - col,
                        slot_b: d.id,
                        pos_b: row - row2,
                    });
                }
            }
        }

        for intersection in &intersections {
            for Intersection { slot_a, pos_a, slot_b, pos_b } in
                [*intersection, intersection.reversed()]
            {
                slots[slot_a].crossings[pos_a] = Some(Crossing {
                    other_slot_id: slot_b,
                    other_slot_cell: pos_b,
                });
            }
        }

        let mut by_degree: Vec<SlotId> = (0..slots.len()).collect();
        by_degree.sort_by_key(|&id| std::cmp::Reverse(slots[id].degree()));

        SlotIndex { slots, intersections, by_degree }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, slot_id: SlotId) -> &Slot {
        &self.slots[slot_id]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Each crossing once, as (across slot, down slot).
    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    /// Slot ids, most-crossed first.
    pub fn by_degree(&self) -> &[SlotId] {
        &self.by_degree
    }

    /// The slot of the given direction covering `pos`, with the offset of `pos` inside it.
    pub fn slot_at(&self, pos: Pos, direction: Direction) -> Option<(SlotId, usize)> {
        self.slots
            .iter()
            .filter(|slot| slot.direction == direction)
            .find_map(|slot| {
                slot.cells()
                    .position(|cell| cell == pos)
                    .map(|offset| (slot.id, offset))
            })
    }

    /// Is every slot reachable from every other through crossings?
    pub fn is_connected(&self) -> bool {
        if self.slots.is_empty() {
            return true;
        }

        let mut seen = vec![false; self.slots.len()];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;

        while let Some(slot_id) = queue.pop_front() {
            for next in self.slots[slot_id].neighbors() {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }

        seen.into_iter().all(|s| s)
    }
}

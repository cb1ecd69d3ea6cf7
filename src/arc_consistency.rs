//! A crossword-specific implementation of the AC-3 algorithm. A set of slot domains is
//! arc-consistent when, for every crossing, each word left in one slot's domain places a letter
//! at the shared cell that at least one word left in the crossing slot's domain also places
//! there.
//!
//! Domains live in a `DomainStore`, which records every change on a trail so the search can roll
//! back to any earlier point without copying all of the domains.

use bit_set::BitSet;
use log::trace;
use std::collections::{HashSet, VecDeque};

use crate::slots::SlotIndex;
use crate::word_corpus::WordCorpus;
use crate::{SlotId, WordId, LETTER_COUNT};

/// The word ids still eligible for each slot, plus an undo trail.
#[derive(Debug, Clone)]
pub struct DomainStore {
    domains: Vec<BitSet>,
    trail: Vec<(SlotId, BitSet)>,
}

impl DomainStore {
    pub fn new(domains: Vec<BitSet>) -> DomainStore {
        DomainStore { domains, trail: vec![] }
    }

    pub fn get(&self, slot_id: SlotId) -> &BitSet {
        &self.domains[slot_id]
    }

    pub fn size(&self, slot_id: SlotId) -> usize {
        self.domains[slot_id].len()
    }

    /// A point on the trail to `restore` to later.
    pub fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Undo every change made since `mark` was taken.
    pub fn restore(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((slot_id, domain)) = self.trail.pop() {
                self.domains[slot_id] = domain;
            }
        }
    }

    /// Drop every word from the slot's domain that fails `keep`. Returns whether anything was
    /// removed.
    pub fn retain<F>(&mut self, slot_id: SlotId, mut keep: F) -> bool
    where
        F: FnMut(WordId) -> bool,
    {
        let removed: Vec<WordId> = self.domains[slot_id].iter().filter(|&w| !keep(w)).collect();
        if removed.is_empty() {
            return false;
        }

        self.trail.push((slot_id, self.domains[slot_id].clone()));
        for word_id in removed {
            self.domains[slot_id].remove(word_id);
        }
        true
    }

    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        self.retain(slot_id, |w| w != word_id)
    }

    /// Narrow the slot's domain down to a single word.
    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        self.retain(slot_id, |w| w == word_id);
    }
}

/// Raised when propagation empties a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

/// How many words in the slot's domain place each letter at `cell`.
pub fn letter_counts(
    index: &SlotIndex,
    corpus: &WordCorpus,
    domains: &DomainStore,
    slot_id: SlotId,
    cell: usize,
) -> [u32; LETTER_COUNT] {
    let length = index.get(slot_id).length;
    let mut counts = [0; LETTER_COUNT];
    for word_id in domains.get(slot_id) {
        counts[corpus.get(length, word_id).letters[cell] as usize] += 1;
    }
    counts
}

/// Bitmask of the letters that some word in the slot's domain places at `cell`.
fn supported_letters(
    index: &SlotIndex,
    corpus: &WordCorpus,
    domains: &DomainStore,
    slot_id: SlotId,
    cell: usize,
) -> u32 {
    let length = index.get(slot_id).length;
    domains
        .get(slot_id)
        .iter()
        .fold(0, |mask, word_id| mask | 1u32 << corpus.get(length, word_id).letters[cell])
}

/// Queue of (slot to revise, slot to revise against) pairs, without duplicates.
struct ArcQueue {
    queue: VecDeque<(SlotId, SlotId)>,
    queued: HashSet<(SlotId, SlotId)>,
}

impl ArcQueue {
    fn new() -> ArcQueue {
        ArcQueue { queue: VecDeque::new(), queued: HashSet::new() }
    }

    fn enqueue(&mut self, arc: (SlotId, SlotId)) {
        if self.queued.insert(arc) {
            self.queue.push_back(arc);
        }
    }

    fn pop_front(&mut self) -> Option<(SlotId, SlotId)> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(&arc);
        Some(arc)
    }
}

/// Prune domains until every crossing is consistent. If `changed_slot_ids` is given, only arcs
/// pointing at those slots are checked to begin with; otherwise every arc in the grid is.
/// Returns the first slot whose domain was wiped out, if any. Changes made before a failure stay
/// on the trail for the caller to roll back.
pub fn establish_arc_consistency(
    index: &SlotIndex,
    corpus: &WordCorpus,
    domains: &mut DomainStore,
    changed_slot_ids: Option<&[SlotId]>,
) -> Result<(), ArcConsistencyFailure> {
    let mut queue = ArcQueue::new();

    match changed_slot_ids {
        Some(changed_slot_ids) => {
            for &changed in changed_slot_ids {
                for neighbor in index.get(changed).neighbors() {
                    queue.enqueue((neighbor, changed));
                }
            }
        }
        None => {
            for slot in index.slots() {
                for neighbor in slot.neighbors() {
                    queue.enqueue((slot.id, neighbor));
                }
            }
        }
    }

    let mut revisions = 0usize;

    while let Some((slot_id, other_slot_id)) = queue.pop_front() {
        revisions += 1;

        let slot = index.get(slot_id);
        let Some((cell, crossing)) = slot
            .crossings
            .iter()
            .enumerate()
            .find_map(|(cell, c)| c.filter(|c| c.other_slot_id == other_slot_id).map(|c| (cell, c)))
        else {
            continue;
        };

        let supported =
            supported_letters(index, corpus, domains, other_slot_id, crossing.other_slot_cell);

        let changed = domains.retain(slot_id, |word_id| {
            supported & (1u32 << corpus.get(slot.length, word_id).letters[cell]) != 0
        });

        if !changed {
            continue;
        }

        if domains.size(slot_id) == 0 {
            trace!("Arc consistency wiped out slot {} after {} revisions", slot_id, revisions);
            return Err(ArcConsistencyFailure { slot_id });
        }

        for neighbor in slot.neighbors().filter(|&n| n != other_slot_id) {
            queue.enqueue((neighbor, slot_id));
        }
    }

    Ok(())
}

//! Backtracking search for a fill. Each slot is a variable whose domain is the corpus words of
//! its length; crossings are binary constraints. We keep the domains arc-consistent after every
//! choice, pick the next slot by minimum remaining values (ties broken by degree), and try its
//! candidates least-constraining first.

use bit_set::BitSet;
use instant::{Duration, Instant};
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Reverse;
use std::collections::HashSet;

use crate::arc_consistency::{establish_arc_consistency, letter_counts, DomainStore};
use crate::grid::Grid;
use crate::slots::SlotIndex;
use crate::word_corpus::WordCorpus;
use crate::{letter_index, SlotId, WordId, LETTER_COUNT};

/// A struct recording a slot assignment made during the filling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    /// The most slots that were filled at once.
    pub max_depth: usize,
    pub duration: Duration,
}

/// Knobs for the search.
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Give up after this many rejected candidates.
    pub max_backtracks: Option<u64>,
    /// Added to the least-constraining-value score of words flagged as common.
    pub common_word_bonus: f32,
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions { max_backtracks: None, common_word_bonus: 1.0 }
    }
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    /// Choices in the order they were made.
    pub choices: Vec<Choice>,
}

#[derive(Debug)]
pub enum FillFailure {
    /// Every candidate was exhausted at the root.
    HardFailure(Statistics),
    ExceededBacktrackLimit(Statistics),
}

impl FillFailure {
    pub fn statistics(&self) -> &Statistics {
        match self {
            FillFailure::HardFailure(statistics) => statistics,
            FillFailure::ExceededBacktrackLimit(statistics) => statistics,
        }
    }
}

/// Raised from deep in the search once the backtrack budget is spent.
struct BacktrackLimitReached;

/// Live search state for one fill attempt.
struct Search<'a, R: Rng> {
    index: &'a SlotIndex,
    corpus: &'a WordCorpus,
    options: &'a FillOptions,
    rng: &'a mut R,
    domains: DomainStore,
    assignment: Vec<Option<WordId>>,
    /// (length, word id) pairs already placed somewhere in the grid.
    used: HashSet<(usize, WordId)>,
    choices: Vec<Choice>,
    statistics: Statistics,
}

impl<'a, R: Rng> Search<'a, R> {
    /// Choose whichever unfilled slot has the fewest remaining options, breaking ties by degree
    /// and then by the index's degree ordering. After the first choice, only slots crossing an
    /// already-filled slot are eligible, so the fill grows as one connected piece.
    fn choose_next_slot(&self) -> Option<SlotId> {
        let unfilled = || {
            self.index
                .by_degree()
                .iter()
                .copied()
                .filter(|&slot_id| self.assignment[slot_id].is_none())
        };
        let priority = |&slot_id: &SlotId| {
            (self.domains.size(slot_id), Reverse(self.index.get(slot_id).degree()))
        };

        let frontier = unfilled()
            .filter(|&slot_id| {
                self.index
                    .get(slot_id)
                    .neighbors()
                    .any(|n| self.assignment[n].is_some())
            })
            .min_by_key(priority);

        // The frontier is only empty before the first choice, or for grids whose slots don't
        // form one connected graph.
        frontier.or_else(|| unfilled().min_by_key(priority))
    }

    /// Order the slot's remaining options so that the words leaving the most room in crossing
    /// slots come first. Equal scores keep a random (but seeded) order.
    fn order_candidates(&mut self, slot_id: SlotId) -> Vec<WordId> {
        let slot = self.index.get(slot_id);

        let crossing_counts: Vec<(usize, [u32; LETTER_COUNT])> = slot
            .crossings
            .iter()
            .enumerate()
            .filter_map(|(cell, crossing)| {
                let crossing = crossing.as_ref()?;
                self.assignment[crossing.other_slot_id].is_none().then(|| {
                    (
                        cell,
                        letter_counts(
                            self.index,
                            self.corpus,
                            &self.domains,
                            crossing.other_slot_id,
                            crossing.other_slot_cell,
                        ),
                    )
                })
            })
            .collect();

        let mut candidates: Vec<WordId> = self
            .domains
            .get(slot_id)
            .iter()
            .filter(|&word_id| !self.used.contains(&(slot.length, word_id)))
            .collect();
        candidates.shuffle(&mut *self.rng);

        let corpus = self.corpus;
        let bonus = self.options.common_word_bonus;
        candidates.sort_by_cached_key(|&word_id| {
            let word = corpus.get(slot.length, word_id);

            // Average the logarithms of how many crossing options survive each letter, so that
            // going from 1 to 5 options matters much more than going from 100 to 500.
            let fill_score = crossing_counts
                .iter()
                .map(|(cell, counts)| (counts[word.letters[*cell] as usize] as f32).max(1.0).ln())
                .sum::<f32>()
                / slot.length as f32;
            let common_score = if word.is_common { bonus } else { 0.0 };

            Reverse(((fill_score + common_score) * 1000.0) as i64)
        });

        candidates
    }

    /// Does the word agree with every filled crossing, and is it still unused?
    fn is_consistent(&self, slot_id: SlotId, word_id: WordId) -> bool {
        let slot = self.index.get(slot_id);
        if self.used.contains(&(slot.length, word_id)) {
            return false;
        }

        let word = self.corpus.get(slot.length, word_id);
        slot.crossings.iter().enumerate().all(|(cell, crossing)| {
            let Some(crossing) = crossing else {
                return true;
            };
            match self.assignment[crossing.other_slot_id] {
                Some(other_word_id) => {
                    let other_length = self.index.get(crossing.other_slot_id).length;
                    let other = self.corpus.get(other_length, other_word_id);
                    other.letters[crossing.other_slot_cell] == word.letters[cell]
                }
                None => true,
            }
        })
    }

    /// Place the word and remove it from every other open slot of the same length. Returns the
    /// slots whose domains changed, or None if one of them was emptied.
    fn assign(&mut self, slot_id: SlotId, word_id: WordId) -> Option<Vec<SlotId>> {
        let index = self.index;
        let length = index.get(slot_id).length;

        self.assignment[slot_id] = Some(word_id);
        self.used.insert((length, word_id));
        self.choices.push(Choice { slot_id, word_id });
        self.statistics.max_depth = self.statistics.max_depth.max(self.choices.len());
        self.domains.assign(slot_id, word_id);

        let mut changed = vec![slot_id];
        for other in index.slots() {
            if other.id == slot_id || other.length != length || self.assignment[other.id].is_some() {
                continue;
            }
            if self.domains.remove(other.id, word_id) {
                if self.domains.size(other.id) == 0 {
                    return None;
                }
                changed.push(other.id);
            }
        }

        Some(changed)
    }

    fn unassign(&mut self, slot_id: SlotId) {
        if let Some(word_id) = self.assignment[slot_id].take() {
            self.used.remove(&(self.index.get(slot_id).length, word_id));
            self.choices.pop();
        }
    }

    /// Returns Ok(true) once every slot is filled, Ok(false) if this branch is a dead end.
    fn search(&mut self) -> Result<bool, BacktrackLimitReached> {
        self.statistics.states += 1;

        let Some(slot_id) = self.choose_next_slot() else {
            return Ok(true);
        };

        for word_id in self.order_candidates(slot_id) {
            if !self.is_consistent(slot_id, word_id) {
                continue;
            }

            let mark = self.domains.mark();
            let viable = match self.assign(slot_id, word_id) {
                Some(changed) => establish_arc_consistency(
                    self.index,
                    self.corpus,
                    &mut self.domains,
                    Some(&changed),
                )
                .is_ok(),
                None => false,
            };

            if viable {
                trace!(
                    "{} slot {} = {}",
                    self.choices.len(),
                    slot_id,
                    self.corpus.get(self.index.get(slot_id).length, word_id).word
                );
                if self.search()? {
                    return Ok(true);
                }
            }

            self.domains.restore(mark);
            self.unassign(slot_id);

            self.statistics.backtracks += 1;
            if let Some(limit) = self.options.max_backtracks {
                if self.statistics.backtracks > limit {
                    return Err(BacktrackLimitReached);
                }
            }
        }

        Ok(false)
    }
}

/// The words of the right length that agree with the letters already in the slot.
fn initial_domains(index: &SlotIndex, corpus: &WordCorpus) -> DomainStore {
    DomainStore::new(
        index
            .slots()
            .iter()
            .map(|slot| {
                let fixed: Vec<(usize, u8)> = slot
                    .fixed_letters()
                    .filter_map(|(cell, c)| letter_index(c).map(|letter| (cell, letter)))
                    .collect();

                corpus
                    .by_length(slot.length)
                    .iter()
                    .enumerate()
                    .filter(|(_, entry)| fixed.iter().all(|&(cell, l)| entry.letters[cell] == l))
                    .map(|(word_id, _)| word_id)
                    .collect::<BitSet>()
            })
            .collect(),
    )
}

/// Search for a fill of every slot in the index.
pub fn find_fill<R: Rng>(
    index: &SlotIndex,
    corpus: &WordCorpus,
    options: &FillOptions,
    rng: &mut R,
) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let mut domains = initial_domains(index, corpus);

    let hard_failure = || {
        FillFailure::HardFailure(Statistics { duration: start.elapsed(), ..Statistics::default() })
    };

    if let Some(slot_id) = (0..index.len()).find(|&slot_id| domains.size(slot_id) == 0) {
        debug!("Slot {} has no candidate words", slot_id);
        return Err(hard_failure());
    }
    if let Err(failure) = establish_arc_consistency(index, corpus, &mut domains, None) {
        debug!("Slot {} has no arc-consistent candidates before any choices", failure.slot_id);
        return Err(hard_failure());
    }

    let mut search = Search {
        index,
        corpus,
        options,
        rng,
        domains,
        assignment: vec![None; index.len()],
        used: HashSet::new(),
        choices: Vec::with_capacity(index.len()),
        statistics: Statistics::default(),
    };

    let result = search.search();
    search.statistics.duration = start.elapsed();

    match result {
        Ok(true) => Ok(FillSuccess { statistics: search.statistics, choices: search.choices }),
        Ok(false) => Err(FillFailure::HardFailure(search.statistics)),
        Err(BacktrackLimitReached) => Err(FillFailure::ExceededBacktrackLimit(search.statistics)),
    }
}

/// Write the chosen words into a copy of the grid.
pub fn fill_grid(grid: &Grid, index: &SlotIndex, corpus: &WordCorpus, choices: &[Choice]) -> Grid {
    let mut filled = grid.clone();
    for &Choice { slot_id, word_id } in choices {
        let slot = index.get(slot_id);
        filled.place_word(slot.origin, slot.direction, &corpus.get(slot.length, word_id).word);
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PuzzleConfig;
    use crate::word_corpus::RawEntry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn corpus(words: &[&str]) -> WordCorpus {
        WordCorpus::build(
            words.iter().map(|w| RawEntry::new(w, "clue")),
            &PuzzleConfig::standard(),
        )
        .unwrap()
    }

    /// CAT/ORE/WED across and COW/ARE/TED down, or the transpose.
    const SQUARE_WORDS: [&str; 6] = ["CAT", "ORE", "WED", "COW", "ARE", "TED"];

    fn fill(template: &str, corpus: &WordCorpus, seed: u64) -> Result<(Grid, FillSuccess), FillFailure> {
        let grid = Grid::from_template(template).unwrap();
        let index = SlotIndex::build(&grid, 3);
        let result = find_fill(&index, corpus, &FillOptions::default(), &mut StdRng::seed_from_u64(seed))?;
        Ok((fill_grid(&grid, &index, corpus, &result.choices), result))
    }

    /// ...
    /// ...
    /// ...
    #[test]
    fn test_find_fill_for_3x3_square() {
        let corpus = corpus(&SQUARE_WORDS);
        let (filled, result) = fill("...\n...\n...", &corpus, 7).expect("Failed to find a fill");

        println!("{:?}", result.statistics);
        println!("{}", filled);

        assert!(filled.render() == "CAT\nORE\nWED" || filled.render() == "COW\nARE\nTED");
        assert_eq!(result.choices.len(), 6);

        let words: HashSet<_> =
            result.choices.iter().map(|c| corpus.get(3, c.word_id).word.clone()).collect();
        assert_eq!(words.len(), 6);
    }

    #[test]
    fn test_prefilled_letters_pin_the_fill() {
        let corpus = corpus(&SQUARE_WORDS);
        let (filled, _) = fill("co.\n...\n...", &corpus, 1).expect("Failed to find a fill");

        assert_eq!(filled.render(), "COW\nARE\nTED");
    }

    #[test]
    fn test_choices_stay_connected() {
        let grid = Grid::new(3);
        let index = SlotIndex::build(&grid, 3);
        let corpus = corpus(&SQUARE_WORDS);
        let result =
            find_fill(&index, &corpus, &FillOptions::default(), &mut StdRng::seed_from_u64(3))
                .unwrap();

        for (i, choice) in result.choices.iter().enumerate().skip(1) {
            let earlier: Vec<SlotId> = result.choices[..i].iter().map(|c| c.slot_id).collect();
            assert!(
                index.get(choice.slot_id).neighbors().any(|n| earlier.contains(&n)),
                "choice {} doesn't cross anything filled before it",
                i,
            );
        }
    }

    #[test]
    fn test_same_seed_same_fill() {
        let words = [
            "CAT", "ORE", "WED", "COW", "ARE", "TED", "BAT", "BOW", "ATE", "TEE", "OAT", "ROE",
            "AWE", "EWE", "TOE", "WET",
        ];
        let corpus = corpus(&words);

        let (a, _) = fill("...\n...\n...", &corpus, 11).expect("Failed to find a fill");
        let (b, _) = fill("...\n...\n...", &corpus, 11).expect("Failed to find a fill");
        assert_eq!(a.render(), b.render());
    }

    #[test]
    fn test_fill_fails_gracefully() {
        let corpus = corpus(&["CAT", "DOG", "EMU", "FOX", "GNU", "HEN"]);

        let failure = fill("...\n...\n...", &corpus, 0).expect_err("Found an impossible fill??");
        assert!(matches!(failure, FillFailure::HardFailure(_)));
    }

    #[test]
    fn test_words_are_never_reused() {
        // The only arc-consistent arrangement is a symmetric word square, which would need each
        // word twice.
        let corpus = corpus(&["BIT", "ICE", "TEN"]);

        let failure = fill("...\n...\n...", &corpus, 0).expect_err("Reused a word");
        assert!(matches!(failure, FillFailure::HardFailure(_)));
        assert!(failure.statistics().backtracks > 0);
    }

    #[test]
    fn test_backtrack_limit() {
        let grid = Grid::new(3);
        let index = SlotIndex::build(&grid, 3);
        let corpus = corpus(&["BIT", "ICE", "TEN"]);
        let options = FillOptions { max_backtracks: Some(0), ..FillOptions::default() };

        let failure = find_fill(&index, &corpus, &options, &mut StdRng::seed_from_u64(0))
            .expect_err("Found an impossible fill??");
        assert!(matches!(failure, FillFailure::ExceededBacktrackLimit(_)));
    }

    #[test]
    fn test_missing_length_fails_before_search() {
        let corpus = corpus(&SQUARE_WORDS);
        let failure = fill("....\n....\n....\n....", &corpus, 0).expect_err("No 4-letter words");

        assert_eq!(failure.statistics().states, 0);
    }
}

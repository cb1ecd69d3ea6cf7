//! The retry loop that turns a corpus and a seed into a finished puzzle.
//!
//! Each attempt runs pattern generation, slot discovery, the fill search, structural checks and
//! clue assembly in order. Any of them can reject the attempt, in which case we start over with
//! a fresh random draw. All randomness comes from a single RNG derived from the seed string, so
//! the same seed always produces the same puzzle.

use chrono::NaiveDate;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::clues::{assemble_puzzle, GeneratedPuzzle};
use crate::config::PuzzleConfig;
use crate::error::{AttemptError, GenerationError, TemplateError};
use crate::grid::Grid;
use crate::pattern::{generate_pattern, is_usable_pattern, open_cells_connected};
use crate::slots::SlotIndex;
use crate::solver::{fill_grid, find_fill, FillOptions};
use crate::structure::find_violations;
use crate::word_corpus::WordCorpus;

/// The conventional seed for a given day's puzzle: lowercase hex SHA-256 of the secret followed
/// by the date as `YYYY-MM-DD`.
pub fn daily_seed(secret: &str, date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn seeded_rng(seed: &str) -> StdRng {
    let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
    StdRng::from_seed(digest)
}

pub struct PuzzleBuilder<'a> {
    corpus: &'a WordCorpus,
    config: PuzzleConfig,
}

impl<'a> PuzzleBuilder<'a> {
    pub fn new(corpus: &'a WordCorpus, config: PuzzleConfig) -> PuzzleBuilder<'a> {
        PuzzleBuilder { corpus, config }
    }

    pub fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    /// Generate a puzzle with a fresh block pattern per attempt.
    pub fn build(&self, seed: &str) -> Result<GeneratedPuzzle, GenerationError> {
        self.config.validate()?;
        self.run(seed, None)
    }

    /// Fill a fixed block layout (which may already contain some letters). Only the fill varies
    /// between attempts. The template's own size is used in place of `config.size`.
    pub fn build_from_template(
        &self,
        template: &Grid,
        seed: &str,
    ) -> Result<GeneratedPuzzle, GenerationError> {
        let config = PuzzleConfig { size: template.size(), ..self.config.clone() };
        config.validate()?;

        if !template.is_symmetric() {
            return Err(TemplateError::Asymmetric.into());
        }
        let limit = config.max_blocked_cells();
        if template.blocked_count() > limit {
            return Err(TemplateError::TooManyBlocks { blocked: template.blocked_count(), limit }
                .into());
        }
        if !is_usable_pattern(template, self.config.min_word_length) {
            return Err(TemplateError::Unusable.into());
        }

        self.run(seed, Some(template))
    }

    fn run(&self, seed: &str, template: Option<&Grid>) -> Result<GeneratedPuzzle, GenerationError> {
        info!(
            "Generating a {0}x{0} puzzle from {1} words (seed {2})",
            template.map_or(self.config.size, Grid::size),
            self.corpus.len(),
            seed
        );

        let mut master = seeded_rng(seed);
        // (clues, words, slots) of the most promising failed attempt.
        let mut best = (0, 0, 0);

        for attempt in 1..=self.config.max_attempts {
            let mut rng = StdRng::seed_from_u64(master.gen());
            let grid = match template {
                Some(template) => template.clone(),
                None => generate_pattern(&self.config, &mut rng),
            };

            match self.attempt(grid, &mut rng) {
                Ok(puzzle) => {
                    info!(
                        "Attempt {} succeeded with {} clues, {:.0}% blocked",
                        attempt,
                        puzzle.clues.len(),
                        puzzle.grid.blocked_ratio() * 100.0
                    );
                    return Ok(puzzle);
                }
                Err(err) => {
                    debug!("Attempt {} failed: {}", attempt, err);
                    let (slots, words, clues) = err.progress();
                    best = best.max((clues, words, slots));
                }
            }
        }

        let (best_clues, best_words, best_slots) = best;
        info!("Giving up after {} attempts", self.config.max_attempts);
        Err(GenerationError::Failed {
            attempts: self.config.max_attempts,
            best_slots,
            best_words,
            best_clues,
        })
    }

    fn attempt(&self, grid: Grid, rng: &mut StdRng) -> Result<GeneratedPuzzle, AttemptError> {
        let index = SlotIndex::build(&grid, self.config.min_word_length);
        let slots = index.len();

        if slots < self.config.min_slots {
            return Err(AttemptError::PatternInsufficient { slots });
        }
        if !index.is_connected() || !open_cells_connected(&grid) {
            return Err(AttemptError::Disconnected { slots });
        }

        let options = FillOptions {
            max_backtracks: Some(self.config.max_backtracks),
            ..FillOptions::default()
        };
        let fill = find_fill(&index, self.corpus, &options, rng).map_err(|failure| {
            let statistics = failure.statistics().clone();
            AttemptError::SolveExhausted { placed: statistics.max_depth, slots, statistics }
        })?;
        debug!("Filled {} slots: {:?}", slots, fill.statistics);

        let filled = fill_grid(&grid, &index, self.corpus, &fill.choices);
        let violations = find_violations(&filled, self.corpus);
        if !violations.is_empty() {
            return Err(AttemptError::StructuralInvalid {
                runs: violations.iter().map(ToString::to_string).collect(),
                slots,
            });
        }

        let puzzle = assemble_puzzle(&filled, &index, self.corpus, &fill.choices);
        if puzzle.clues.len() < self.config.min_clues {
            return Err(AttemptError::TooFewClues { clues: puzzle.clues.len() });
        }

        Ok(puzzle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word_corpus::RawEntry;
    use crate::Direction;
    use std::collections::HashSet;
    use std::ops::RangeInclusive;

    fn corpus(words: &[&str]) -> WordCorpus {
        WordCorpus::build(
            words.iter().map(|w| RawEntry::new(w, "clue")),
            &PuzzleConfig::standard(),
        )
        .unwrap()
    }

    fn three_by_three() -> PuzzleConfig {
        PuzzleConfig {
            size: 3,
            min_word_length: 3,
            max_word_length: 3,
            max_blocked_ratio: 0.0,
            min_slots: 6,
            min_clues: 6,
            max_attempts: 5,
            ..PuzzleConfig::mini()
        }
    }

    const SQUARE_WORDS: [&str; 6] = ["CAT", "ORE", "WED", "COW", "ARE", "TED"];

    /// Every string over `alphabet` with a length in `lengths`.
    fn every_word(alphabet: &str, lengths: RangeInclusive<usize>) -> WordCorpus {
        let mut words = Vec::new();
        for length in lengths.clone() {
            let mut current = vec![String::new()];
            for _ in 0..length {
                current = current
                    .iter()
                    .flat_map(|prefix| alphabet.chars().map(move |c| format!("{}{}", prefix, c)))
                    .collect();
            }
            words.extend(current);
        }

        let config = PuzzleConfig {
            min_word_length: *lengths.start(),
            max_word_length: *lengths.end(),
            ..PuzzleConfig::standard()
        };
        WordCorpus::build(words.iter().map(|w| RawEntry::new(w, "clue")), &config).unwrap()
    }

    fn assert_well_formed(puzzle: &GeneratedPuzzle, corpus: &WordCorpus, config: &PuzzleConfig) {
        let grid = &puzzle.grid;
        assert_eq!(grid.size(), config.size);
        assert!(grid.is_symmetric());
        assert!(grid.blocked_count() <= config.max_blocked_cells());
        assert!(find_violations(grid, corpus).is_empty());
        assert!(puzzle.clues.len() >= config.min_clues);

        let answers: HashSet<&str> = puzzle.clues.iter().map(|c| c.answer.as_str()).collect();
        assert_eq!(answers.len(), puzzle.clues.len(), "answers repeat");

        for clue in &puzzle.clues {
            let read: String = clue.cells().filter_map(|pos| grid.letter(pos)).collect();
            assert_eq!(read, clue.answer);
        }

        for pos in grid.positions() {
            let starting: HashSet<u32> = puzzle
                .clues
                .iter()
                .filter(|clue| (clue.start_row, clue.start_col) == pos)
                .map(|clue| clue.number)
                .collect();
            let numbered: HashSet<u32> = grid.get(pos).and_then(|cell| cell.number).into_iter().collect();
            assert_eq!(numbered, starting, "numbering at {:?}", pos);
        }
    }

    #[test]
    fn test_builds_word_square() {
        let corpus = corpus(&SQUARE_WORDS);
        let builder = PuzzleBuilder::new(&corpus, three_by_three());

        let puzzle = builder.build("2024-03-01").expect("Failed to build a puzzle");
        println!("{}", puzzle.grid);

        assert!(puzzle.grid.is_symmetric());
        assert_eq!(puzzle.clues.len(), 6);

        let answers: HashSet<&str> = puzzle.clues.iter().map(|c| c.answer.as_str()).collect();
        assert_eq!(answers, SQUARE_WORDS.into_iter().collect());

        for clue in &puzzle.clues {
            let read: String = clue.cells().filter_map(|pos| puzzle.grid.letter(pos)).collect();
            assert_eq!(read, clue.answer);
        }
        assert_eq!(
            puzzle.clues.iter().map(|c| (c.number, c.direction)).collect::<Vec<_>>(),
            vec![
                (1, Direction::Across),
                (1, Direction::Down),
                (2, Direction::Down),
                (3, Direction::Down),
                (4, Direction::Across),
                (5, Direction::Across),
            ],
        );
    }

    #[test]
    fn test_same_seed_same_puzzle() {
        let words = [
            "CAT", "ORE", "WED", "COW", "ARE", "TED", "BAT", "BOW", "ATE", "TEE", "OAT", "ROE",
            "AWE", "EWE", "TOE", "WET", "ACE", "APE", "ERA", "ODE",
        ];
        let corpus = corpus(&words);
        let builder = PuzzleBuilder::new(&corpus, three_by_three());

        let a = builder.build("same seed").expect("Failed to build a puzzle");
        let b = builder.build("same seed").expect("Failed to build a puzzle");
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_builds_mini_puzzle() {
        let corpus = every_word("ABC", 3..=5);
        let config = PuzzleConfig::mini();
        let builder = PuzzleBuilder::new(&corpus, config.clone());

        let puzzle = builder.build("mini").expect("Failed to build a puzzle");
        println!("{}", puzzle.grid);
        assert_well_formed(&puzzle, &corpus, &config);

        let again = builder.build("mini").expect("Failed to build a puzzle");
        assert_eq!(serde_json::to_string(&puzzle).unwrap(), serde_json::to_string(&again).unwrap());
    }

    #[test]
    #[ignore = "takes minutes without optimizations; run with --release -- --ignored"]
    fn test_builds_standard_puzzle() {
        let corpus = every_word("AB", 3..=15);
        let config = PuzzleConfig::standard();

        let puzzle = PuzzleBuilder::new(&corpus, config.clone())
            .build("standard")
            .expect("Failed to build a puzzle");
        println!("{}", puzzle.grid);
        assert_well_formed(&puzzle, &corpus, &config);
    }

    #[test]
    fn test_generation_failure_reports_best_attempt() {
        // Enough words for the pattern, but filling it would mean using each one twice.
        let corpus = corpus(&["BIT", "ICE", "TEN"]);
        let builder = PuzzleBuilder::new(&corpus, three_by_three());

        match builder.build("seed") {
            Err(GenerationError::Failed { attempts, best_slots, best_words, best_clues }) => {
                assert_eq!(attempts, 5);
                assert_eq!(best_slots, 6);
                assert_eq!(best_words, 1);
                assert_eq!(best_clues, 0);
            }
            other => panic!("Expected a generation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_insufficient_patterns_are_retried_then_fail() {
        let corpus = corpus(&SQUARE_WORDS);
        let config = PuzzleConfig { min_slots: 10, ..three_by_three() };

        match PuzzleBuilder::new(&corpus, config).build("seed") {
            Err(GenerationError::Failed { best_slots, best_words, .. }) => {
                assert_eq!(best_slots, 6);
                assert_eq!(best_words, 0);
            }
            other => panic!("Expected a generation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let corpus = corpus(&SQUARE_WORDS);
        let config = PuzzleConfig { size: 2, ..three_by_three() };

        assert!(matches!(
            PuzzleBuilder::new(&corpus, config).build("seed"),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn test_template_with_prefilled_letters() {
        let corpus = corpus(&SQUARE_WORDS);
        let builder = PuzzleBuilder::new(&corpus, three_by_three());
        let template = Grid::from_template("co.\n...\n...").unwrap();

        let puzzle = builder.build_from_template(&template, "seed").unwrap();
        assert_eq!(puzzle.grid.render(), "COW\nARE\nTED");
    }

    #[test]
    fn test_asymmetric_template_is_rejected() {
        let corpus = corpus(&SQUARE_WORDS);
        let config = PuzzleConfig { max_blocked_ratio: 0.2, min_slots: 1, ..three_by_three() };
        let template = Grid::from_template("#..\n...\n...").unwrap();

        assert!(matches!(
            PuzzleBuilder::new(&corpus, config).build_from_template(&template, "seed"),
            Err(GenerationError::Template(TemplateError::Asymmetric))
        ));
    }

    #[test]
    fn test_daily_seed() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let seed = daily_seed("secret", date);

        assert_eq!(seed.len(), 64);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(seed, daily_seed("secret", date));
        assert_ne!(seed, daily_seed("secret", date.succ_opt().unwrap()));
        assert_ne!(seed, daily_seed("other", date));

        // Equivalent to hashing the concatenation.
        assert_eq!(seed, hex::encode(Sha256::digest(b"secret2024-03-01")));
    }
}

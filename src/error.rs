use std::path::PathBuf;
use thiserror::Error;

use crate::solver::Statistics;

/// Problems with the dictionary feed. These are fatal: generation can't start without a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("couldn't read dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dictionary is empty after filtering ({rejected} records rejected)")]
    Empty { rejected: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template is empty")]
    Empty,

    #[error("template row {row} has {found} cells, expected {expected}")]
    NotSquare { row: usize, found: usize, expected: usize },

    #[error("unexpected character {found:?} at row {row}, column {col}")]
    BadCell { row: usize, col: usize, found: char },

    #[error("block pattern is not symmetric under a half turn")]
    Asymmetric,

    #[error("template has {blocked} blocked cells, over the limit of {limit}")]
    TooManyBlocks { blocked: usize, limit: usize },

    #[error("template has open cells that can't belong to a word, or isn't connected")]
    Unusable,
}

/// Errors that escape `PuzzleBuilder::build`.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(
        "no valid puzzle after {attempts} attempts \
         (best attempt: {best_words}/{best_slots} slots filled, {best_clues} clues)"
    )]
    Failed {
        attempts: usize,
        best_slots: usize,
        best_words: usize,
        best_clues: usize,
    },
}

/// Reasons a single generation attempt is thrown away. These never leave the builder's retry
/// loop.
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("pattern only has {slots} slots")]
    PatternInsufficient { slots: usize },

    #[error("open cells are not all connected")]
    Disconnected { slots: usize },

    #[error("search exhausted after placing at most {placed} of {slots} words")]
    SolveExhausted {
        placed: usize,
        slots: usize,
        statistics: Statistics,
    },

    #[error("fill contains runs that aren't words: {runs:?}")]
    StructuralInvalid { runs: Vec<String>, slots: usize },

    #[error("fill only produced {clues} clues")]
    TooFewClues { clues: usize },
}

impl AttemptError {
    /// (slots found, words placed, clues emitted) for the best-attempt diagnostics.
    pub(crate) fn progress(&self) -> (usize, usize, usize) {
        match *self {
            AttemptError::PatternInsufficient { slots } | AttemptError::Disconnected { slots } => {
                (slots, 0, 0)
            }
            AttemptError::SolveExhausted { placed, slots, .. } => (slots, placed, 0),
            AttemptError::StructuralInvalid { slots, .. } => (slots, slots, 0),
            AttemptError::TooFewClues { clues } => (clues, clues, clues),
        }
    }
}

/// A clue id that isn't of the form `<number>-across` or `<number>-down`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid clue id {0:?}")]
pub struct ParseClueIdError(pub String);

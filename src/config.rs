use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::MAX_SLOT_LENGTH;

/// Tunable parameters for puzzle generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleConfig {
    /// Grid dimension; grids are always square.
    pub size: usize,
    /// Shortest slot (and shortest corpus word) allowed.
    pub min_word_length: usize,
    /// Longest corpus word kept.
    pub max_word_length: usize,
    /// Upper bound on blocked cells as a fraction of all cells.
    pub max_blocked_ratio: f64,
    /// Patterns with fewer slots than this are discarded before filling.
    pub min_slots: usize,
    /// Filled puzzles with fewer clues than this are discarded.
    pub min_clues: usize,
    /// How many patterns to try before giving up.
    pub max_attempts: usize,
    /// Search budget for a single attempt.
    pub max_backtracks: u64,
    pub exclude_plurals: bool,
    pub exclude_technical: bool,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl PuzzleConfig {
    /// The daily 15x15 puzzle.
    pub fn standard() -> Self {
        Self {
            size: 15,
            min_word_length: 3,
            max_word_length: 15,
            max_blocked_ratio: 0.2,
            min_slots: 20,
            min_clues: 20,
            max_attempts: 100,
            max_backtracks: 20_000,
            exclude_plurals: false,
            exclude_technical: false,
        }
    }

    pub fn mini() -> Self {
        Self {
            size: 5,
            max_word_length: 5,
            min_slots: 6,
            min_clues: 6,
            max_backtracks: 5_000,
            ..Self::standard()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: PuzzleConfig = serde_json::from_str(&data)?;
        config.validate()?;

        Ok(config)
    }

    /// Total number of blocked cells a pattern may contain.
    pub fn max_blocked_cells(&self) -> usize {
        (self.max_blocked_ratio * (self.size * self.size) as f64).floor() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_word_length < 2 {
            return Err(ConfigError::Invalid("min_word_length must be at least 2".into()));
        }
        if self.size < self.min_word_length {
            return Err(ConfigError::Invalid(format!(
                "size {} is smaller than min_word_length {}",
                self.size, self.min_word_length
            )));
        }
        if self.size > MAX_SLOT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "size {} exceeds the supported maximum of {}",
                self.size, MAX_SLOT_LENGTH
            )));
        }
        if self.max_word_length < self.min_word_length {
            return Err(ConfigError::Invalid(
                "max_word_length is smaller than min_word_length".into(),
            ));
        }
        if !(0.0..=0.5).contains(&self.max_blocked_ratio) {
            return Err(ConfigError::Invalid(format!(
                "max_blocked_ratio {} is outside 0.0..=0.5",
                self.max_blocked_ratio
            )));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be positive".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PuzzleConfig =
            serde_json::from_str(r#"{ "size": 11, "max_attempts": 7 }"#).unwrap();

        assert_eq!(config.size, 11);
        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.min_word_length, 3);
        assert_eq!(config.max_blocked_ratio, 0.2);
    }

    #[test]
    fn test_validate_rejects_inconsistent_values() {
        let mut config = PuzzleConfig::mini();
        assert!(config.validate().is_ok());

        config.size = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = PuzzleConfig { max_blocked_ratio: 0.9, ..PuzzleConfig::standard() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_blocked_cells() {
        assert_eq!(PuzzleConfig::standard().max_blocked_cells(), 45);
        assert_eq!(PuzzleConfig::mini().max_blocked_cells(), 5);
    }
}

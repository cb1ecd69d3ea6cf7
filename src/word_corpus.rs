//! The dictionary feed and the normalized, length-indexed corpus built from it.

use log::{debug, info};
use serde::{Deserialize, Deserializer};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::config::PuzzleConfig;
use crate::error::CorpusError;
use crate::{letter_index, WordId, MAX_SLOT_LENGTH};

/// One record of the dictionary feed, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntry {
    pub word: String,
    #[serde(default)]
    pub clue: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_common_english: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_plural: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_technical_word: bool,
}

impl RawEntry {
    pub fn new(word: &str, clue: &str) -> RawEntry {
        RawEntry {
            word: word.to_string(),
            clue: Some(clue.to_string()),
            ..RawEntry::default()
        }
    }

    pub fn common(mut self) -> RawEntry {
        self.is_common_english = true;
        self
    }
}

/// Feeds are inconsistent about how they spell booleans, so accept `true`, `1`, `"yes"`, etc.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Number(value)) => value != 0.0,
        Some(Flag::Text(text)) => parse_flag(&text),
        None => false,
    })
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// A normalized dictionary word with its clue.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry {
    pub word: String,
    pub clue: String,
    pub is_common: bool,
    pub is_plural: bool,
    pub is_technical: bool,
    /// Letter indices (see `letter_index`), one per character of `word`.
    pub letters: SmallVec<[u8; MAX_SLOT_LENGTH]>,
}

impl DictionaryEntry {
    pub fn length(&self) -> usize {
        self.letters.len()
    }

    /// Normalize a raw record, or return None if it should be dropped.
    fn normalize(raw: RawEntry, config: &PuzzleConfig) -> Option<DictionaryEntry> {
        let word = raw.word.trim().to_ascii_uppercase();
        let clue = raw.clue.as_deref().map(str::trim).filter(|clue| !clue.is_empty())?;

        let letters: SmallVec<[u8; MAX_SLOT_LENGTH]> =
            word.chars().map(letter_index).collect::<Option<_>>()?;

        if letters.len() < config.min_word_length
            || letters.len() > config.max_word_length
            || letters.len() > MAX_SLOT_LENGTH
        {
            return None;
        }
        if (config.exclude_plurals && raw.is_plural)
            || (config.exclude_technical && raw.is_technical_word)
        {
            return None;
        }

        Some(DictionaryEntry {
            word,
            clue: clue.to_string(),
            is_common: raw.is_common_english,
            is_plural: raw.is_plural,
            is_technical: raw.is_technical_word,
            letters,
        })
    }
}

/// The active word list: deduplicated, bucketed by length, immutable once built.
#[derive(Debug)]
pub struct WordCorpus {
    /// `words[n]` holds every entry of length `n`, sorted alphabetically so that word ids are
    /// stable for a given feed.
    words: Vec<Vec<DictionaryEntry>>,
    index: HashMap<String, (usize, WordId)>,
}

impl WordCorpus {
    pub fn build<I>(records: I, config: &PuzzleConfig) -> Result<WordCorpus, CorpusError>
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let mut by_word: HashMap<String, DictionaryEntry> = HashMap::new();
        let mut rejected = 0;

        for raw in records {
            let Some(entry) = DictionaryEntry::normalize(raw, config) else {
                rejected += 1;
                continue;
            };

            // The first record for a word wins unless a later one is flagged common and it isn't.
            let keep_existing = by_word
                .get(&entry.word)
                .map_or(false, |existing| existing.is_common || !entry.is_common);
            if !keep_existing {
                by_word.insert(entry.word.clone(), entry);
            }
        }

        if by_word.is_empty() {
            return Err(CorpusError::Empty { rejected });
        }

        let max_length = by_word.values().map(|entry| entry.length()).max().unwrap_or(0);
        let mut words: Vec<Vec<DictionaryEntry>> = (0..=max_length).map(|_| vec![]).collect();
        for entry in by_word.into_values() {
            words[entry.length()].push(entry);
        }

        let mut index = HashMap::new();
        for (length, bucket) in words.iter_mut().enumerate() {
            bucket.sort_by(|a, b| a.word.cmp(&b.word));
            for (word_id, entry) in bucket.iter().enumerate() {
                index.insert(entry.word.clone(), (length, word_id));
            }
        }

        info!("Built corpus of {} words ({} records rejected)", index.len(), rejected);
        for (length, bucket) in words.iter().enumerate().filter(|(_, b)| !b.is_empty()) {
            debug!("  {} words of length {}", bucket.len(), length);
        }

        Ok(WordCorpus { words, index })
    }

    /// Every entry of the given length, in word-id order.
    pub fn by_length(&self, length: usize) -> &[DictionaryEntry] {
        self.words.get(length).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, length: usize, word_id: WordId) -> &DictionaryEntry {
        &self.words[length][word_id]
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(&word.to_ascii_uppercase())
    }

    /// The word's id within its length bucket.
    pub fn id_of(&self, word: &str) -> Option<WordId> {
        self.index.get(&word.to_ascii_uppercase()).map(|&(_, word_id)| word_id)
    }

    pub fn lookup(&self, word: &str) -> Option<&DictionaryEntry> {
        self.index
            .get(&word.to_ascii_uppercase())
            .map(|&(length, word_id)| self.get(length, word_id))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Parse `WORD;clue[;is_common[;is_plural[;is_technical]]]` lines. Blank lines and lines
/// starting with `#` are skipped.
pub fn parse_text_records(text: &str) -> Vec<RawEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let mut parts = line.split(';');
            let word = parts.next().unwrap_or_default().to_string();
            let clue = parts.next().map(str::to_string);
            let mut flag = || parts.next().map(parse_flag).unwrap_or(false);

            RawEntry {
                word,
                clue,
                is_common_english: flag(),
                is_plural: flag(),
                is_technical_word: flag(),
            }
        })
        .collect()
}

pub fn parse_json_records(text: &str) -> Result<Vec<RawEntry>, CorpusError> {
    Ok(serde_json::from_str(text)?)
}

/// Load and build a corpus from a file. `.json` files hold an array of records; anything else is
/// read as `;`-delimited text.
pub fn load_dictionary(path: &Path, config: &PuzzleConfig) -> Result<WordCorpus, CorpusError> {
    let text = fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    let records = if is_json {
        parse_json_records(&text)?
    } else {
        parse_text_records(&text)
    };

    WordCorpus::build(records, config)
}

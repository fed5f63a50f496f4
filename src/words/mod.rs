//! Word source
//!
//! Loads the pre-built dictionary word list and the optional part-of-speech
//! index. Fetching and curating the lists happens elsewhere; this module only
//! reads them and drops entries that could never form a valid label.

use crate::config::{PosPaths, WordsConfig};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading word lists
#[derive(Debug, Error)]
pub enum WordSourceError {
    #[error("Failed to read word list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Word list {0} contains no usable words")]
    Empty(PathBuf),
}

/// Part of speech attached to a dictionary word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adj,
    Adv,
}

impl PartOfSpeech {
    /// Lookup precedence when a word appears in several lists
    pub const ALL: [PartOfSpeech; 4] = [Self::Noun, Self::Verb, Self::Adj, Self::Adv];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::Verb => "verb",
            Self::Adj => "adj",
            Self::Adv => "adv",
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deduplicated, lowercase, alphabetic word list
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Builds a word list, keeping the first occurrence of each usable word
    ///
    /// Words are trimmed and lowercased; anything non-alphabetic or longer
    /// than `max_length` is dropped.
    pub fn from_words<I, S>(words: I, max_length: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for word in words {
            if let Some(word) = clean_word(word.as_ref(), max_length) {
                if seen.insert(word.clone()) {
                    kept.push(word);
                }
            }
        }
        Self { words: kept }
    }

    /// Reads a word list with one word per line
    pub fn load(path: &Path, max_length: u32) -> Result<Self, WordSourceError> {
        let content = read_list(path)?;
        let list = Self::from_words(content.lines(), max_length);
        if list.is_empty() {
            return Err(WordSourceError::Empty(path.to_path_buf()));
        }
        Ok(list)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Maps words to their part of speech
#[derive(Debug, Clone, Default)]
pub struct PosIndex {
    entries: HashMap<String, PartOfSpeech>,
}

impl PosIndex {
    /// Adds every word of a list under `pos`, unless already tagged
    pub fn insert_list<I, S>(&mut self, pos: PartOfSpeech, words: I, max_length: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            if let Some(word) = clean_word(word.as_ref(), max_length) {
                self.entries.entry(word).or_insert(pos);
            }
        }
    }

    /// Loads the configured POS lists in precedence order
    pub fn load(paths: &PosPaths, max_length: u32) -> Result<Self, WordSourceError> {
        let mut index = Self::default();
        for pos in PartOfSpeech::ALL {
            let path = match pos {
                PartOfSpeech::Noun => &paths.noun,
                PartOfSpeech::Verb => &paths.verb,
                PartOfSpeech::Adj => &paths.adj,
                PartOfSpeech::Adv => &paths.adv,
            };
            if let Some(path) = path {
                let content = read_list(path)?;
                index.insert_list(pos, content.lines(), max_length);
            }
        }
        Ok(index)
    }

    pub fn lookup(&self, word: &str) -> Option<PartOfSpeech> {
        self.entries.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Word list plus POS index, as consumed by word mode
#[derive(Debug, Clone, Default)]
pub struct WordSource {
    pub words: WordList,
    pub pos: PosIndex,
}

impl WordSource {
    /// Loads the word list and POS index described by the config
    pub fn load(config: &WordsConfig) -> Result<Self, WordSourceError> {
        let words = WordList::load(&config.path, config.max_length)?;
        let pos = PosIndex::load(&config.pos, config.max_length)?;
        tracing::info!(
            "Loaded {} words ({} tagged with a part of speech) from {}",
            words.len(),
            pos.len(),
            config.path.display()
        );
        Ok(Self { words, pos })
    }
}

fn read_list(path: &Path) -> Result<String, WordSourceError> {
    std::fs::read_to_string(path).map_err(|source| WordSourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn clean_word(raw: &str, max_length: u32) -> Option<String> {
    let word = raw.trim().to_lowercase();
    if word.is_empty() || word.chars().count() > max_length as usize {
        return None;
    }
    if !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(word)
}

//! Word corpus used to pick answers and validate guesses.
//!
//! Words are stored lower-cased and lookups fold their argument the same way,
//! so validity checks are case-insensitive.

use log::{info, warn};
use rand::seq::SliceRandom;
use shared::WORD_LENGTH;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("cannot read word list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("word list contains no {0}-letter words")]
    Empty(usize),
}

#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: Vec<String>,
    index: HashSet<String>,
}

impl WordList {
    /// Reads a newline-delimited word file.
    ///
    /// Blank lines and surrounding whitespace are ignored, as are entries
    /// that are not exactly `WORD_LENGTH` letters long.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WordListError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| WordListError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let list = Self::from_words(contents.lines());
        info!("Loaded {} words from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();

        for raw in words {
            let word = raw.as_ref().trim();
            if word.is_empty() {
                continue;
            }
            if word.chars().count() != WORD_LENGTH {
                warn!("Skipping word {:?}: not {} letters", word, WORD_LENGTH);
                continue;
            }

            let word = word.to_lowercase();
            if list.index.insert(word.clone()) {
                list.words.push(word);
            }
        }

        list
    }

    /// Like `load`, but an empty result is an error.
    pub fn load_non_empty(path: impl AsRef<Path>) -> Result<Self, WordListError> {
        let list = Self::load(path)?;
        if list.is_empty() {
            return Err(WordListError::Empty(WORD_LENGTH));
        }
        Ok(list)
    }

    pub fn is_valid_word(&self, word: &str) -> bool {
        self.index.contains(&word.trim().to_lowercase())
    }

    /// Uniformly random word, or an empty string when the list is empty.
    pub fn random_word(&self) -> String {
        self.words
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

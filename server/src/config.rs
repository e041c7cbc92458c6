//! Server tunables and their startup validation.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::word_list::{WordList, WordListError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max guesses must be even so both players get the same number of turns (got {0})")]
    OddMaxGuesses(u32),
    #[error("max guesses must be at least 2 (got {0})")]
    TooFewGuesses(u32),
    #[error("think time must be at least one second")]
    ThinkTimeTooShort,
    #[error("queue capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error(transparent)]
    WordList(#[from] WordListError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the TCP listener binds to
    pub bind_addr: String,
    /// Newline-delimited word list
    pub word_list_path: PathBuf,
    /// Scored attempts per match, shared by both players
    pub max_guesses: u32,
    /// Time the active player has to submit a guess
    pub think_time: Duration,
    /// Delay between pairing two players and starting their session
    pub commit_guard: Duration,
    /// How long a finished player has to ask for another match
    pub replay_timeout: Duration,
    /// Maximum number of players waiting in the lobby
    pub queue_capacity: usize,
    /// Pause between dispatcher iterations
    pub dispatch_idle: Duration,
    pub max_nickname_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            word_list_path: PathBuf::from("assets/words.txt"),
            max_guesses: 6,
            think_time: Duration::from_secs(30),
            commit_guard: Duration::from_secs(2),
            replay_timeout: Duration::from_secs(10),
            queue_capacity: 100,
            dispatch_idle: Duration::from_millis(100),
            max_nickname_len: 20,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_guesses < 2 {
            return Err(ConfigError::TooFewGuesses(self.max_guesses));
        }
        if self.max_guesses % 2 != 0 {
            return Err(ConfigError::OddMaxGuesses(self.max_guesses));
        }
        if self.think_time < Duration::from_secs(1) {
            return Err(ConfigError::ThinkTimeTooShort);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        Ok(())
    }

    /// Loads the configured word list; an unreadable or empty list is fatal.
    pub fn load_word_list(&self) -> Result<WordList, ConfigError> {
        Ok(WordList::load_non_empty(&self.word_list_path)?)
    }
}

//! Word-guessing rules shared by the server and any client implementation.
//!
//! Contains the guess evaluator, the per-match `Game` that records attempts,
//! and the `protocol` module describing every message exchanged on the wire.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod protocol;

pub const WORD_LENGTH: usize = 5;

/// Per-letter verdict, encoded on the wire as 0 (miss), 1 (present), 2 (hit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MatchType {
    Miss,
    Present,
    Hit,
}

impl From<MatchType> for u8 {
    fn from(match_type: MatchType) -> Self {
        match match_type {
            MatchType::Miss => 0,
            MatchType::Present => 1,
            MatchType::Hit => 2,
        }
    }
}

impl TryFrom<u8> for MatchType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(MatchType::Miss),
            1 => Ok(MatchType::Present),
            2 => Ok(MatchType::Hit),
            other => Err(format!("invalid match type code {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterResult {
    pub letter: char,
    pub position: usize,
    pub match_type: MatchType,
}

/// Feedback for one guess, one entry per letter in guess order.
pub type Attempt = Vec<LetterResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("game is not in progress")]
    GameOver,
    #[error("invalid guess length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Scores `guess` against `answer`, ignoring case.
///
/// Exact-position matches are resolved first and consume their answer letter.
/// Remaining guess letters then claim the leftmost unconsumed equal letter of
/// the answer, so a letter is never reported as hit or present more times
/// than it occurs in the answer.
pub fn evaluate(answer: &str, guess: &str) -> Result<Attempt, GameError> {
    let answer: Vec<char> = answer.chars().collect();
    let guess: Vec<char> = guess.chars().collect();

    if guess.len() != answer.len() {
        return Err(GameError::InvalidLength {
            expected: answer.len(),
            actual: guess.len(),
        });
    }

    let mut consumed = vec![false; answer.len()];
    let mut verdicts = vec![MatchType::Miss; guess.len()];

    for (i, (&g, &a)) in guess.iter().zip(answer.iter()).enumerate() {
        if same_letter(g, a) {
            verdicts[i] = MatchType::Hit;
            consumed[i] = true;
        }
    }

    for (i, &g) in guess.iter().enumerate() {
        if verdicts[i] == MatchType::Hit {
            continue;
        }
        let claimed = answer
            .iter()
            .enumerate()
            .position(|(j, &a)| !consumed[j] && same_letter(g, a));
        if let Some(j) = claimed {
            consumed[j] = true;
            verdicts[i] = MatchType::Present;
        }
    }

    Ok(guess
        .into_iter()
        .zip(verdicts)
        .enumerate()
        .map(|(position, (letter, match_type))| LetterResult {
            letter,
            position,
            match_type,
        })
        .collect())
}

/// One hidden answer and the attempts made against it.
///
/// Both players of a match guess against the same `Game`, so `max_guesses`
/// bounds the combined number of scored attempts.
#[derive(Debug, Clone)]
pub struct Game {
    pub answer: String,
    pub max_guesses: usize,
    pub attempts: Vec<Attempt>,
    pub status: GameStatus,
}

impl Game {
    pub fn new(answer: impl Into<String>, max_guesses: usize) -> Self {
        Self {
            answer: answer.into(),
            max_guesses,
            attempts: Vec::with_capacity(max_guesses),
            status: GameStatus::InProgress,
        }
    }

    /// Scores a guess and records it.
    ///
    /// Rejected guesses (terminal game, wrong length) leave the attempt list
    /// and status untouched.
    pub fn make_guess(&mut self, guess: &str) -> Result<Attempt, GameError> {
        if self.status != GameStatus::InProgress {
            return Err(GameError::GameOver);
        }

        let attempt = evaluate(&self.answer, guess)?;
        let solved = attempt.iter().all(|r| r.match_type == MatchType::Hit);
        self.attempts.push(attempt.clone());

        self.status = if solved {
            GameStatus::Won
        } else if self.attempts.len() >= self.max_guesses {
            GameStatus::Lost
        } else {
            GameStatus::InProgress
        };

        Ok(attempt)
    }

    pub fn is_over(&self) -> bool {
        self.status != GameStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use MatchType::{Hit, Miss, Present};

    fn verdicts(answer: &str, guess: &str) -> Vec<MatchType> {
        evaluate(answer, guess)
            .unwrap()
            .into_iter()
            .map(|r| r.match_type)
            .collect()
    }

    #[test]
    fn test_exact_guess_is_all_hits() {
        assert_eq!(verdicts("apple", "apple"), vec![Hit; 5]);
    }

    #[test]
    fn test_extra_letter_after_hit_is_miss() {
        assert_eq!(verdicts("smile", "skill"), vec![Hit, Miss, Hit, Hit, Miss]);
    }

    #[test]
    fn test_extra_letter_after_present_is_miss() {
        assert_eq!(
            verdicts("smile", "alley"),
            vec![Miss, Present, Miss, Present, Miss]
        );
    }

    #[test]
    fn test_hit_takes_precedence_over_present() {
        assert_eq!(verdicts("kitty", "empty"), vec![Miss, Miss, Miss, Hit, Hit]);
    }

    #[test]
    fn test_partial_match() {
        assert_eq!(
            verdicts("apple", "grape"),
            vec![Miss, Miss, Present, Present, Hit]
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(verdicts("Apple", "aPpLe"), vec![Hit; 5]);
        assert_eq!(
            verdicts("Apple", "pPale"),
            vec![Present, Hit, Present, Hit, Hit]
        );
    }

    #[test]
    fn test_letters_and_positions_follow_guess() {
        let attempt = evaluate("apple", "Grape").unwrap();
        let letters: String = attempt.iter().map(|r| r.letter).collect();
        assert_eq!(letters, "Grape");
        for (i, result) in attempt.iter().enumerate() {
            assert_eq!(result.position, i);
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert_eq!(
            evaluate("apple", "app"),
            Err(GameError::InvalidLength {
                expected: 5,
                actual: 3
            })
        );
    }

    #[test]
    fn test_credited_letters_never_exceed_answer_counts() {
        let pairs = [
            ("smile", "lllll"),
            ("abbey", "bbbbb"),
            ("eerie", "eeeee"),
            ("kayak", "akkaa"),
            ("sassy", "asses"),
            ("llama", "allay"),
            ("Geese", "eGGEe"),
        ];

        for (answer, guess) in pairs {
            let mut available: HashMap<char, usize> = HashMap::new();
            for c in answer.to_lowercase().chars() {
                *available.entry(c).or_default() += 1;
            }
            let mut credited: HashMap<char, usize> = HashMap::new();
            for result in evaluate(answer, guess).unwrap() {
                if result.match_type != Miss {
                    *credited
                        .entry(result.letter.to_ascii_lowercase())
                        .or_default() += 1;
                }
            }
            for (letter, count) in credited {
                assert!(
                    count <= available.get(&letter).copied().unwrap_or(0),
                    "{} credited {} times for {} vs {}",
                    letter,
                    count,
                    answer,
                    guess
                );
            }
        }
    }

    #[test]
    fn test_match_type_wire_codes() {
        assert_eq!(serde_json::to_string(&Miss).unwrap(), "0");
        assert_eq!(serde_json::to_string(&Present).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Hit).unwrap(), "2");
        assert_eq!(serde_json::from_str::<MatchType>("2").unwrap(), Hit);
        assert!(serde_json::from_str::<MatchType>("3").is_err());
    }

    #[test]
    fn test_game_creation() {
        let game = Game::new("apple", 6);
        assert_eq!(game.answer, "apple");
        assert_eq!(game.max_guesses, 6);
        assert!(game.attempts.is_empty());
        assert_eq!(game.status, GameStatus::InProgress);
    }

    #[test]
    fn test_correct_guess_wins_immediately() {
        let mut game = Game::new("apple", 6);
        game.make_guess("grape").unwrap();
        game.make_guess("APPLE").unwrap();
        assert_eq!(game.status, GameStatus::Won);
        assert_eq!(game.attempts.len(), 2);
    }

    #[test]
    fn test_lost_after_max_guesses() {
        let mut game = Game::new("apple", 2);
        game.make_guess("grape").unwrap();
        assert_eq!(game.status, GameStatus::InProgress);
        game.make_guess("grape").unwrap();
        assert_eq!(game.status, GameStatus::Lost);
    }

    #[test]
    fn test_winning_on_last_guess_is_won() {
        let mut game = Game::new("apple", 2);
        game.make_guess("grape").unwrap();
        game.make_guess("apple").unwrap();
        assert_eq!(game.status, GameStatus::Won);
    }

    #[test]
    fn test_guess_after_game_over() {
        let mut game = Game::new("apple", 2);
        game.make_guess("apple").unwrap();

        assert_eq!(game.make_guess("grape"), Err(GameError::GameOver));
        assert_eq!(game.attempts.len(), 1);
        assert_eq!(game.status, GameStatus::Won);
    }

    #[test]
    fn test_invalid_length_does_not_record() {
        let mut game = Game::new("apple", 6);
        assert!(matches!(
            game.make_guess("app"),
            Err(GameError::InvalidLength { .. })
        ));
        assert!(game.attempts.is_empty());
        assert_eq!(game.status, GameStatus::InProgress);
    }
}

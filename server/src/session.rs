//! Turn-based match between two players, followed by the replay decision.
//!
//! A [`GameSession`] owns both [`Player`]s for the duration of the match. Each
//! round it tells both sides whose turn it is, then waits on the active
//! player's next message, the round deadline, and both error signals. All
//! broadcasts go out from this one task, first seat then second, so both
//! players observe the same event order.

use log::{debug, info, warn};
use shared::protocol::{Payload, PlayerInfo};
use shared::{Game, GameStatus};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::lobby::Lobby;
use crate::player::{Player, TransportError};

/// Outcome of one finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub winner: Option<PlayerInfo>,
    pub answer: String,
    /// Last round that was issued
    pub rounds: u32,
    /// The winner won because the other player disconnected
    pub forfeit: bool,
}

/// What a finished player decided in the replay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDecision {
    Requeued,
    /// Asked to play again but the lobby turned them away
    Rejected,
    Declined,
    TimedOut,
    Disconnected,
}

struct MatchContext {
    /// Seat 0 is always the starting player.
    players: [Player; 2],
    current: usize,
    round: u32,
    deadline: Instant,
    winner: Option<usize>,
    disconnected: [bool; 2],
}

enum RoundEvent {
    Message(Payload),
    Stray(usize, Payload),
    Deadline,
    Disconnected(usize, TransportError),
}

/// How a single issued round ended.
enum Step {
    Advance,
    Reissue,
    Solved,
    Forfeit(usize),
}

pub struct GameSession {
    ctx: MatchContext,
    game: Game,
    lobby: Lobby,
}

impl GameSession {
    /// Seats the pair, picking the starting player at random.
    pub fn new(first: Player, second: Player, answer: String, lobby: Lobby) -> Self {
        let players = if rand::random::<bool>() {
            [first, second]
        } else {
            [second, first]
        };
        let max_guesses = lobby.config().max_guesses as usize;

        Self {
            ctx: MatchContext {
                players,
                current: 0,
                round: 1,
                deadline: Instant::now(),
                winner: None,
                disconnected: [false, false],
            },
            game: Game::new(answer, max_guesses),
            lobby,
        }
    }

    /// Plays the match to completion, then hands each connected player to its
    /// own replay gate.
    pub async fn run(mut self) -> MatchSummary {
        let config = self.lobby.config();
        self.broadcast(Payload::GameStart {
            max_guesses: config.max_guesses,
            player1: self.ctx.players[0].info(),
            player2: self.ctx.players[1].info(),
        })
        .await;

        let forfeit = self.play_rounds().await;

        let winner = self.ctx.winner.map(|seat| self.ctx.players[seat].info());
        let summary = MatchSummary {
            winner: winner.clone(),
            answer: self.game.answer.clone(),
            rounds: self.ctx.round.min(self.lobby.config().max_guesses),
            forfeit,
        };

        match &winner {
            Some(player) => info!("Game over, {} wins (answer {})", player.nickname, summary.answer),
            None => info!("Game over, draw (answer {})", summary.answer),
        }
        self.broadcast(Payload::GameOver {
            winner,
            answer: summary.answer.clone(),
        })
        .await;

        let replay_timeout = self.lobby.config().replay_timeout;
        let MatchContext {
            players,
            disconnected,
            ..
        } = self.ctx;
        for (player, gone) in players.into_iter().zip(disconnected) {
            if gone {
                debug!("{} disconnected, skipping replay", player.nickname);
                continue;
            }
            tokio::spawn(replay_gate(player, self.lobby.clone(), replay_timeout));
        }

        summary
    }

    /// Runs rounds until someone solves the word, a player drops, or the
    /// round ceiling is passed. Returns whether the match ended by forfeit.
    async fn play_rounds(&mut self) -> bool {
        let max_guesses = self.lobby.config().max_guesses;

        while self.ctx.round <= max_guesses {
            self.start_round().await;

            let step = loop {
                match self.next_event().await {
                    RoundEvent::Message(Payload::Typing { word, .. }) => {
                        let typist = self.ctx.players[self.ctx.current].info();
                        let peer = &self.ctx.players[1 - self.ctx.current];
                        peer.send(Payload::Typing {
                            player: Some(typist),
                            word,
                        })
                        .await;
                    }
                    RoundEvent::Message(Payload::Guess { word }) => break self.handle_guess(word).await,
                    RoundEvent::Message(other) => {
                        debug!("Ignoring {} from the active player", other.message_type());
                    }
                    RoundEvent::Stray(seat, payload) => {
                        debug!(
                            "Discarding {} from {}: not their turn",
                            payload.message_type(),
                            self.ctx.players[seat].nickname
                        );
                    }
                    RoundEvent::Deadline => {
                        let player = self.ctx.players[self.ctx.current].info();
                        info!("{} ran out of time in round {}", player.nickname, self.ctx.round);
                        self.broadcast(Payload::GuessTimeout {
                            player,
                            round: self.ctx.round,
                        })
                        .await;
                        break Step::Advance;
                    }
                    RoundEvent::Disconnected(seat, error) => {
                        info!("Player {} has disconnected: {}", self.ctx.players[seat].nickname, error);
                        break Step::Forfeit(seat);
                    }
                }
            };

            match step {
                Step::Advance => {
                    self.ctx.round += 1;
                    self.ctx.current = 1 - self.ctx.current;
                }
                Step::Reissue => {}
                Step::Solved => {
                    self.ctx.winner = Some(self.ctx.current);
                    return false;
                }
                Step::Forfeit(seat) => {
                    self.ctx.disconnected[seat] = true;
                    self.ctx.winner = Some(1 - seat);
                    return true;
                }
            }
        }

        false
    }

    async fn start_round(&mut self) {
        let think_time = self.lobby.config().think_time;
        self.ctx.deadline = Instant::now() + think_time;

        self.broadcast(Payload::RoundStart {
            player: self.ctx.players[self.ctx.current].info(),
            round: self.ctx.round,
            timeout_seconds: think_time.as_secs(),
        })
        .await;
    }

    /// Waits for whichever happens first this round. A closed inbound stream
    /// counts as a disconnect.
    async fn next_event(&mut self) -> RoundEvent {
        let current = self.ctx.current;
        let other = 1 - current;
        let deadline = self.ctx.deadline;

        let [first, second] = &mut self.ctx.players;
        let (active, waiting) = if current == 0 {
            (first, second)
        } else {
            (second, first)
        };

        tokio::select! {
            biased;
            error = active.errors.recv() => {
                RoundEvent::Disconnected(current, error.unwrap_or(TransportError::Closed))
            }
            error = waiting.errors.recv() => {
                RoundEvent::Disconnected(other, error.unwrap_or(TransportError::Closed))
            }
            message = active.incoming.recv() => match message {
                Some(payload) => RoundEvent::Message(payload),
                None => RoundEvent::Disconnected(current, TransportError::Closed),
            },
            message = waiting.incoming.recv() => match message {
                Some(payload) => RoundEvent::Stray(other, payload),
                None => RoundEvent::Disconnected(other, TransportError::Closed),
            },
            _ = sleep_until(deadline) => RoundEvent::Deadline,
        }
    }

    async fn handle_guess(&mut self, word: String) -> Step {
        let player = self.ctx.players[self.ctx.current].info();
        let word = word.trim().to_string();

        if !self.lobby.word_list().is_valid_word(&word) {
            debug!("{} guessed unknown word {:?}", player.nickname, word);
            self.broadcast(Payload::InvalidWord { player, word }).await;
            return Step::Reissue;
        }

        let feedback = match self.game.make_guess(&word) {
            Ok(feedback) => feedback,
            Err(e) => {
                warn!("Rejected guess {:?} from {}: {}", word, player.nickname, e);
                self.broadcast(Payload::InvalidWord { player, word }).await;
                return Step::Reissue;
            }
        };

        info!("{} guessed {} in round {}", player.nickname, word, self.ctx.round);
        self.broadcast(Payload::Feedback {
            player,
            round: self.ctx.round,
            feedback,
        })
        .await;

        if self.game.status == GameStatus::Won {
            Step::Solved
        } else {
            Step::Advance
        }
    }

    async fn broadcast(&self, payload: Payload) {
        for player in &self.ctx.players {
            player.send(payload.clone()).await;
        }
    }
}

enum ReplayEvent {
    Message(Payload),
    Gone(TransportError),
    Expired,
}

/// Waits up to `wait` for a finished player's play-again answer.
///
/// Accepting puts the player back in the lobby queue. Declining, timing out
/// or disconnecting releases the player, which closes its outbound stream.
pub async fn replay_gate(mut player: Player, lobby: Lobby, wait: Duration) -> ReplayDecision {
    let deadline = Instant::now() + wait;

    loop {
        let event = tokio::select! {
            biased;
            error = player.errors.recv() => ReplayEvent::Gone(error.unwrap_or(TransportError::Closed)),
            message = player.incoming.recv() => match message {
                Some(payload) => ReplayEvent::Message(payload),
                None => ReplayEvent::Gone(TransportError::Closed),
            },
            _ = sleep_until(deadline) => ReplayEvent::Expired,
        };

        match event {
            ReplayEvent::Message(Payload::PlayAgain { confirm: true }) => {
                info!("{} wants another game", player.nickname);
                return match lobby.enqueue(player).await {
                    Ok(()) => ReplayDecision::Requeued,
                    Err(_) => ReplayDecision::Rejected,
                };
            }
            ReplayEvent::Message(Payload::PlayAgain { confirm: false }) => {
                info!("{} declined another game", player.nickname);
                return ReplayDecision::Declined;
            }
            ReplayEvent::Message(other) => {
                debug!("Ignoring {} while awaiting replay decision", other.message_type());
            }
            ReplayEvent::Gone(error) => {
                info!("Player {} left before deciding: {}", player.nickname, error);
                return ReplayDecision::Disconnected;
            }
            ReplayEvent::Expired => {
                info!("{} did not answer the replay prompt", player.nickname);
                player.send(Payload::PlayAgainTimeout {}).await;
                return ReplayDecision::TimedOut;
            }
        }
    }
}

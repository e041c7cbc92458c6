//! Matchmaking queue and the dispatcher that pairs waiting players.
//!
//! The queue is a bounded channel of [`Player`]s: joining is a non-blocking
//! push, and a full queue turns new entrants away. A single dispatcher task
//! pulls two players at a time and holds them for a short commit-guard window;
//! if either connection fails during the window the survivor goes back into
//! the queue, otherwise a [`GameSession`] is started for the pair.

use log::{debug, error, info, warn};
use shared::protocol::Payload;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::config::ServerConfig;
use crate::player::{Connection, Player, TransportError};
use crate::session::GameSession;
use crate::word_list::WordList;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    #[error("matchmaking queue is full")]
    QueueFull,
    #[error("matchmaking dispatcher is not running")]
    Closed,
}

struct LobbyState {
    config: ServerConfig,
    word_list: WordList,
    queue: mpsc::Sender<Player>,
    active_sessions: AtomicUsize,
}

/// Cheap handle to the shared matchmaking queue.
#[derive(Clone)]
pub struct Lobby {
    state: Arc<LobbyState>,
}

/// Owns the receiving side of the queue; see [`Dispatcher::run`].
pub struct Dispatcher {
    lobby: Lobby,
    queue: mpsc::Receiver<Player>,
}

impl Lobby {
    /// Builds the lobby without starting its dispatcher.
    pub fn new(config: ServerConfig, word_list: WordList) -> (Self, Dispatcher) {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
        let lobby = Lobby {
            state: Arc::new(LobbyState {
                config,
                word_list,
                queue: queue_tx,
                active_sessions: AtomicUsize::new(0),
            }),
        };
        let dispatcher = Dispatcher {
            lobby: lobby.clone(),
            queue: queue_rx,
        };
        (lobby, dispatcher)
    }

    /// Builds the lobby and spawns its dispatcher on the current runtime.
    pub fn start(config: ServerConfig, word_list: WordList) -> Self {
        let (lobby, dispatcher) = Self::new(config, word_list);
        tokio::spawn(dispatcher.run());
        lobby
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn word_list(&self) -> &WordList {
        &self.state.word_list
    }

    /// Players currently waiting in the queue.
    pub fn queued(&self) -> usize {
        let queue = &self.state.queue;
        queue.max_capacity() - queue.capacity()
    }

    pub fn active_sessions(&self) -> usize {
        self.state.active_sessions.load(Ordering::SeqCst)
    }

    /// Admits a freshly connected client: greets it with its identity, then
    /// queues it for a match.
    pub async fn join(&self, connection: Connection) -> Result<(), LobbyError> {
        let player = Player::from_connection(connection);
        info!("New player connected: {} ({})", player.nickname, player.id);

        player
            .send(Payload::PlayerInfo {
                id: player.id.clone(),
                nickname: player.nickname.clone(),
            })
            .await;
        self.enqueue(player).await
    }

    /// Tells the player a match is being searched for, then tries to queue it.
    ///
    /// When the queue is full the player is sent `queue_full` and released,
    /// which closes its outbound stream.
    pub async fn enqueue(&self, player: Player) -> Result<(), LobbyError> {
        player.send(Payload::Matching {}).await;

        let nickname = player.nickname.clone();
        match self.state.queue.try_send(player) {
            Ok(()) => {
                info!("{} queued ({} waiting)", nickname, self.queued());
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(player)) => {
                warn!("Queue full, turning away {}", player.nickname);
                player.send(Payload::QueueFull {}).await;
                Err(LobbyError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(player)) => {
                error!("Dispatcher gone, cannot queue {}", player.nickname);
                Err(LobbyError::Closed)
            }
        }
    }

    /// Puts a player back without a new `matching` notice, waiting for room.
    async fn requeue(&self, player: Player) {
        let nickname = player.nickname.clone();
        if self.state.queue.send(player).await.is_err() {
            error!("Dispatcher gone, dropping {}", nickname);
        }
    }

    /// Holds a candidate pair for the commit-guard window, then either starts
    /// their session or returns the surviving player to the queue.
    async fn confirm_pairing(self, mut first: Player, mut second: Player) {
        let guard = self.state.config.commit_guard;

        let failed = tokio::select! {
            biased;
            error = first.errors.recv() => Some((0, error.unwrap_or(TransportError::Closed))),
            error = second.errors.recv() => Some((1, error.unwrap_or(TransportError::Closed))),
            _ = sleep(guard) => None,
        };

        match failed {
            Some((0, error)) => {
                info!("Player {} has disconnected ({}), requeueing {}", first.nickname, error, second.nickname);
                self.requeue(second).await;
            }
            Some((_, error)) => {
                info!("Player {} has disconnected ({}), requeueing {}", second.nickname, error, first.nickname);
                self.requeue(first).await;
            }
            None => self.run_session(first, second).await,
        }
    }

    async fn run_session(&self, first: Player, second: Player) {
        let answer = self.state.word_list.random_word();
        if answer.is_empty() {
            error!(
                "Word list is empty, cannot start a game for {} and {}",
                first.nickname, second.nickname
            );
            return;
        }

        info!("Starting game between {} and {}", first.nickname, second.nickname);
        debug!("Answer for this game: {}", answer);
        self.state.active_sessions.fetch_add(1, Ordering::SeqCst);

        let summary = GameSession::new(first, second, answer, self.clone())
            .run()
            .await;

        self.state.active_sessions.fetch_sub(1, Ordering::SeqCst);
        debug!("Session finished: {:?}", summary);
    }
}

impl Dispatcher {
    /// Pairs queued players for as long as the runtime is alive.
    ///
    /// Each pair is confirmed on its own task so a guard window never stalls
    /// further matchmaking.
    pub async fn run(mut self) {
        let idle = self.lobby.state.config.dispatch_idle;
        info!("Matchmaking dispatcher started");

        let mut waiting: Option<Player> = None;

        loop {
            let Some(mut player) = self.queue.recv().await else {
                break;
            };
            // Already-failed players never get held for a partner.
            if let Some(error) = player.check_disconnected() {
                info!("Dropping {} from the queue: {}", player.nickname, error);
                continue;
            }
            let Some(first) = waiting.take() else {
                waiting = Some(player);
                continue;
            };
            let second = player;
            debug!("Paired {} with {}", first.nickname, second.nickname);

            tokio::spawn(self.lobby.clone().confirm_pairing(first, second));

            sleep(idle).await;
        }

        info!("Matchmaking dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::RemoteEnd;
    use shared::protocol;
    use std::time::Duration;

    fn test_config() -> ServerConfig {
        ServerConfig {
            max_guesses: 2,
            think_time: Duration::from_secs(5),
            commit_guard: Duration::from_secs(2),
            replay_timeout: Duration::from_secs(10),
            queue_capacity: 4,
            ..ServerConfig::default()
        }
    }

    fn words() -> WordList {
        WordList::from_words(["apple", "magic", "table"])
    }

    async fn join(lobby: &Lobby, id: &str) -> RemoteEnd {
        let (connection, mut remote) = Connection::pair(id, id.to_uppercase());
        lobby.join(connection).await.unwrap();
        assert!(matches!(remote.recv().await, Some(Payload::PlayerInfo { .. })));
        assert_eq!(remote.recv().await, Some(Payload::Matching {}));
        remote
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_queues_player() {
        let (lobby, _dispatcher) = Lobby::new(test_config(), words());

        let (connection, mut remote) = Connection::pair("p1", "Alice");
        lobby.join(connection).await.unwrap();

        assert_eq!(
            remote.recv().await,
            Some(Payload::PlayerInfo {
                id: "p1".to_string(),
                nickname: "Alice".to_string(),
            })
        );
        assert_eq!(remote.recv().await, Some(Payload::Matching {}));
        assert_eq!(lobby.queued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_rejects_with_notice() {
        let config = ServerConfig {
            queue_capacity: 1,
            ..test_config()
        };
        let (lobby, _dispatcher) = Lobby::new(config, words());

        let _first = join(&lobby, "p1").await;

        let (connection, mut remote) = Connection::pair("p2", "Bob");
        assert_eq!(lobby.join(connection).await, Err(LobbyError::QueueFull));

        assert!(matches!(remote.recv().await, Some(Payload::PlayerInfo { .. })));
        assert_eq!(remote.recv().await, Some(Payload::Matching {}));
        assert_eq!(remote.recv().await, Some(Payload::QueueFull {}));
        // Rejected player is released, so its stream ends.
        assert_eq!(remote.recv().await, None);
        assert_eq!(lobby.queued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_during_guard_requeues_survivor() {
        let lobby = Lobby::start(test_config(), words());

        let first = join(&lobby, "p1").await;
        let mut second = join(&lobby, "p2").await;

        // Let the dispatcher take both players, then fail one inside the window.
        sleep(Duration::from_millis(500)).await;
        assert_eq!(lobby.queued(), 0);
        first.fail(TransportError::Closed);

        // Survivor never saw a game start.
        sleep(Duration::from_secs(5)).await;
        assert!(second.from_server.try_recv().is_err());
        assert_eq!(lobby.active_sessions(), 0);

        // It is back in matchmaking and pairs with the next arrival.
        let mut third = join(&lobby, "p3").await;
        for remote in [&mut second, &mut third] {
            match remote.recv().await {
                Some(Payload::GameStart { player1, player2, .. }) => {
                    let mut ids = vec![player1.id, player2.id];
                    ids.sort();
                    assert_eq!(ids, vec!["p2".to_string(), "p3".to_string()]);
                }
                other => panic!("expected game_start, got {:?}", other),
            }
        }
        assert_eq!(lobby.active_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_survives_guard_and_starts_session() {
        let lobby = Lobby::start(test_config(), words());

        let mut first = join(&lobby, "p1").await;
        let mut second = join(&lobby, "p2").await;

        for remote in [&mut first, &mut second] {
            match remote.recv().await {
                Some(Payload::GameStart {
                    max_guesses,
                    player1,
                    player2,
                }) => {
                    assert_eq!(max_guesses, 2);
                    let mut ids = vec![player1.id, player2.id];
                    ids.sort();
                    assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);
                }
                other => panic!("expected game_start, got {:?}", other),
            }
        }
        assert_eq!(lobby.queued(), 0);
        assert_eq!(lobby.active_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_players_one_pair_one_waiting() {
        let lobby = Lobby::start(test_config(), words());

        let _a = join(&lobby, "p1").await;
        let _b = join(&lobby, "p2").await;
        let _c = join(&lobby, "p3").await;

        sleep(Duration::from_secs(3)).await;
        assert_eq!(lobby.active_sessions(), 1);
        assert_eq!(lobby.queued(), 0, "third player is held by the dispatcher");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_player_is_skipped_by_dispatcher() {
        let (lobby, dispatcher) = Lobby::new(test_config(), words());

        let gone = join(&lobby, "p1").await;
        gone.fail(TransportError::Closed);
        let mut second = join(&lobby, "p2").await;
        let mut third = join(&lobby, "p3").await;

        tokio::spawn(dispatcher.run());

        // p2 and p3 pair straight away, so their guard window ends at 2s.
        sleep(Duration::from_millis(2050)).await;
        assert_eq!(lobby.active_sessions(), 1);
        for remote in [&mut second, &mut third] {
            let frame = remote.from_server.try_recv().expect("game_start delivered");
            match protocol::decode(&frame).unwrap() {
                Payload::GameStart { player1, player2, .. } => {
                    let mut ids = vec![player1.id, player2.id];
                    ids.sort();
                    assert_eq!(ids, vec!["p2".to_string(), "p3".to_string()]);
                }
                other => panic!("expected game_start, got {:?}", other),
            }
        }
    }
}

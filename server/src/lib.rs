//! # Word Duel Server Library
//!
//! Authoritative server for two-player word-guessing matches. Players are
//! queued, paired, and take turns guessing a hidden five-letter word against
//! a per-turn deadline; every guess is scored on the server and broadcast to
//! both sides.
//!
//! ## Architecture Design
//!
//! ### Task Per Concern
//! Each connection runs a read pump and a write pump, each match runs on its
//! own task, and a single dispatcher task does matchmaking. Nothing is shared
//! between tasks except channels and the lobby's bounded queue.
//!
//! ### Ownership Hand-Off
//! A [`player::Player`] owns its inbound, outbound and error channels. It moves
//! by value from the lobby queue into a game session and then into a replay
//! gate, so exactly one component can talk to a player at any time. Dropping
//! the `Player` closes its outbound stream, which the transport turns into a
//! closed connection.
//!
//! ### Partial Failure
//! Malformed frames are dropped by the decoder and never reach a session. A
//! transport failure disqualifies a player from a pending pairing, forfeits a
//! running match, or ends a replay wait; it never affects other players.
//!
//! ## Module Organization
//!
//! ### Config Module (`config`)
//! Tunables such as guess count, think time and queue capacity, with startup
//! validation.
//!
//! ### Word List Module (`word_list`)
//! Loads the answer corpus, validates guesses and picks random answers.
//!
//! ### Player Module (`player`)
//! Connection endpoints and the codec tasks between bytes and payloads.
//!
//! ### Lobby Module (`lobby`)
//! Bounded matchmaking queue, the pairing dispatcher and the commit-guard
//! window.
//!
//! ### Session Module (`session`)
//! The round loop state machine and the replay gate.
//!
//! ### Network Module (`network`)
//! Line-delimited TCP transport used by the `server` binary.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::lobby::Lobby;
//! use server::network::NetworkServer;
//! use server::word_list::WordList;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     config.validate()?;
//!
//!     let words = WordList::load_non_empty(&config.word_list_path)?;
//!     let lobby = Lobby::start(config, words);
//!
//!     NetworkServer::bind(lobby).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod lobby;
pub mod network;
pub mod player;
pub mod session;
pub mod word_list;

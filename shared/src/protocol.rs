//! Message envelope and payload types exchanged between server and clients.
//!
//! Every frame on the wire is a JSON envelope `{"type": <tag>, "payload": {..}}`.
//! The tag selects which `Payload` variant the body decodes into; unknown tags
//! and bodies that do not fit their tag are reported as distinct errors so the
//! transport layer can log and drop a single bad frame.

use crate::LetterResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown message type: {0}")]
    UnknownType(String),
    #[error("decode failed for type {kind}: {source}")]
    Decode {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Tag carried in the `type` field of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    // Server to client
    PlayerInfo,
    Matching,
    QueueFull,
    GameStart,
    RoundStart,
    InvalidWord,
    GuessTimeout,
    Feedback,
    GameOver,
    PlayAgainTimeout,
    // Client to server
    Typing,
    Guess,
    PlayAgain,
}

impl MessageType {
    pub const ALL: [MessageType; 13] = [
        MessageType::PlayerInfo,
        MessageType::Matching,
        MessageType::QueueFull,
        MessageType::GameStart,
        MessageType::RoundStart,
        MessageType::InvalidWord,
        MessageType::GuessTimeout,
        MessageType::Feedback,
        MessageType::GameOver,
        MessageType::PlayAgainTimeout,
        MessageType::Typing,
        MessageType::Guess,
        MessageType::PlayAgain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::PlayerInfo => "player_info",
            MessageType::Matching => "matching",
            MessageType::QueueFull => "queue_full",
            MessageType::GameStart => "game_start",
            MessageType::RoundStart => "round_start",
            MessageType::InvalidWord => "invalid_word",
            MessageType::GuessTimeout => "guess_timeout",
            MessageType::Feedback => "feedback",
            MessageType::GameOver => "game_over",
            MessageType::PlayAgainTimeout => "play_again_timeout",
            MessageType::Typing => "typing",
            MessageType::Guess => "guess",
            MessageType::PlayAgain => "play_again",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ProtocolError::UnknownType(tag.to_string()))
    }
}

/// Public identity of a connected player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: String,
    pub nickname: String,
}

/// Every message variant. Serialized adjacently tagged, which is exactly the
/// envelope shape, so `Payload` encodes straight to wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Payload {
    PlayerInfo {
        id: String,
        nickname: String,
    },
    Matching {},
    QueueFull {},
    GameStart {
        max_guesses: u32,
        player1: PlayerInfo,
        player2: PlayerInfo,
    },
    RoundStart {
        player: PlayerInfo,
        round: u32,
        timeout_seconds: u64,
    },
    InvalidWord {
        player: PlayerInfo,
        word: String,
    },
    GuessTimeout {
        player: PlayerInfo,
        round: u32,
    },
    Feedback {
        player: PlayerInfo,
        round: u32,
        feedback: Vec<LetterResult>,
    },
    GameOver {
        winner: Option<PlayerInfo>,
        answer: String,
    },
    PlayAgainTimeout {},
    Typing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        player: Option<PlayerInfo>,
        word: String,
    },
    Guess {
        word: String,
    },
    PlayAgain {
        confirm: bool,
    },
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::PlayerInfo { .. } => MessageType::PlayerInfo,
            Payload::Matching {} => MessageType::Matching,
            Payload::QueueFull {} => MessageType::QueueFull,
            Payload::GameStart { .. } => MessageType::GameStart,
            Payload::RoundStart { .. } => MessageType::RoundStart,
            Payload::InvalidWord { .. } => MessageType::InvalidWord,
            Payload::GuessTimeout { .. } => MessageType::GuessTimeout,
            Payload::Feedback { .. } => MessageType::Feedback,
            Payload::GameOver { .. } => MessageType::GameOver,
            Payload::PlayAgainTimeout {} => MessageType::PlayAgainTimeout,
            Payload::Typing { .. } => MessageType::Typing,
            Payload::Guess { .. } => MessageType::Guess,
            Payload::PlayAgain { .. } => MessageType::PlayAgain,
        }
    }
}

/// Transport-level wrapper: a type tag plus an opaque body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn wrap(payload: &Payload) -> Result<Self, ProtocolError> {
        let value = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        serde_json::from_value(value).map_err(ProtocolError::Encode)
    }

    /// Resolves the tag, then decodes the body into the matching variant.
    pub fn into_payload(self) -> Result<Payload, ProtocolError> {
        let kind: MessageType = self.kind.parse()?;
        let body = match self.payload {
            // Empty-bodied messages may omit the payload entirely.
            Value::Null => Value::Object(Default::default()),
            body => body,
        };

        let tagged = serde_json::json!({ "type": kind.as_str(), "payload": body });
        serde_json::from_value(tagged).map_err(|source| ProtocolError::Decode { kind, source })
    }
}

/// Serializes a payload into one wire frame.
pub fn encode(payload: &Payload) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(payload).map_err(ProtocolError::Encode)
}

/// Parses one wire frame into a payload.
pub fn decode(frame: &[u8]) -> Result<Payload, ProtocolError> {
    let envelope: Envelope = serde_json::from_slice(frame).map_err(ProtocolError::Malformed)?;
    envelope.into_payload()
}

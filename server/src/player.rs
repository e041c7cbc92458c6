//! Per-connection player endpoint and the codec tasks feeding it.
//!
//! A transport hands the server a [`Connection`]: raw inbound frames, raw
//! outbound frames and an error signal. [`Player::from_connection`] wraps the
//! byte streams in two codec tasks so the rest of the server only ever sees
//! typed [`Payload`]s. Whoever holds the `Player` owns all three channels;
//! ownership moves between the lobby queue, a game session and the replay gate
//! by value.

use log::{debug, error, warn};
use shared::protocol::{self, Payload, PlayerInfo};
use thiserror::Error;
use tokio::sync::mpsc;

pub type PlayerId = String;

/// Buffer size for every per-player channel.
pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,
    #[error("i/o error: {0}")]
    Io(String),
}

/// Server-side endpoints of one transport connection.
#[derive(Debug)]
pub struct Connection {
    pub id: PlayerId,
    pub nickname: String,
    pub inbound: mpsc::Receiver<Vec<u8>>,
    pub outbound: mpsc::Sender<Vec<u8>>,
    pub errors: mpsc::Receiver<TransportError>,
}

/// Transport-side endpoints matching a [`Connection`].
#[derive(Debug)]
pub struct RemoteEnd {
    pub to_server: mpsc::Sender<Vec<u8>>,
    pub from_server: mpsc::Receiver<Vec<u8>>,
    pub errors: mpsc::Sender<TransportError>,
}

impl Connection {
    /// Creates a connected pair of in-memory endpoints.
    pub fn pair(id: impl Into<PlayerId>, nickname: impl Into<String>) -> (Connection, RemoteEnd) {
        let (to_server, inbound) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound, from_server) = mpsc::channel(CHANNEL_CAPACITY);
        // Both pumps of a transport may report a failure.
        let (error_tx, errors) = mpsc::channel(2);

        let connection = Connection {
            id: id.into(),
            nickname: nickname.into(),
            inbound,
            outbound,
            errors,
        };
        let remote = RemoteEnd {
            to_server,
            from_server,
            errors: error_tx,
        };
        (connection, remote)
    }
}

impl RemoteEnd {
    /// Sends a typed payload as if it arrived from the client.
    pub async fn send(&self, payload: &Payload) -> bool {
        match protocol::encode(payload) {
            Ok(frame) => self.to_server.send(frame).await.is_ok(),
            Err(e) => {
                error!("Failed to encode {}: {}", payload.message_type(), e);
                false
            }
        }
    }

    /// Next decodable payload the server sent, skipping bad frames.
    pub async fn recv(&mut self) -> Option<Payload> {
        while let Some(frame) = self.from_server.recv().await {
            match protocol::decode(&frame) {
                Ok(payload) => return Some(payload),
                Err(e) => warn!("Client side dropped frame: {}", e),
            }
        }
        None
    }

    /// Raises the connection's error signal.
    pub fn fail(&self, error: TransportError) {
        if self.errors.try_send(error).is_err() {
            debug!("Error signal already raised or no longer observed");
        }
    }
}

/// Drains typed payloads and forwards their encoded frames downstream.
///
/// The returned sender is the payload side; when every clone of it is dropped
/// the task ends and `downstream` is closed.
pub fn spawn_encoder(downstream: mpsc::Sender<Vec<u8>>) -> mpsc::Sender<Payload> {
    let (payload_tx, mut payload_rx) = mpsc::channel::<Payload>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(payload) = payload_rx.recv().await {
            let frame = match protocol::encode(&payload) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Dropping outgoing {}: {}", payload.message_type(), e);
                    continue;
                }
            };
            if downstream.send(frame).await.is_err() {
                debug!("Outbound stream closed, encoder stopping");
                break;
            }
        }
    });

    payload_tx
}

/// Decodes inbound frames into payloads.
///
/// Malformed frames and unknown message types are logged and dropped; they
/// never close the stream.
pub fn spawn_decoder(mut upstream: mpsc::Receiver<Vec<u8>>) -> mpsc::Receiver<Payload> {
    let (payload_tx, payload_rx) = mpsc::channel::<Payload>(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(frame) = upstream.recv().await {
            match protocol::decode(&frame) {
                Ok(payload) => {
                    if payload_tx.send(payload).await.is_err() {
                        debug!("Inbound consumer gone, decoder stopping");
                        break;
                    }
                }
                Err(e) => warn!("Dropping inbound frame: {}", e),
            }
        }
    });

    payload_rx
}

/// A connected participant, owned by exactly one component at a time.
#[derive(Debug)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub(crate) incoming: mpsc::Receiver<Payload>,
    pub(crate) outgoing: mpsc::Sender<Payload>,
    pub(crate) errors: mpsc::Receiver<TransportError>,
}

impl Player {
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            id: connection.id,
            nickname: connection.nickname,
            incoming: spawn_decoder(connection.inbound),
            outgoing: spawn_encoder(connection.outbound),
            errors: connection.errors,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            nickname: self.nickname.clone(),
        }
    }

    /// Queues a payload for delivery. A closed outbound stream is only logged;
    /// the transport reports the failure through the error signal.
    pub async fn send(&self, payload: Payload) {
        let kind = payload.message_type();
        if self.outgoing.send(payload).await.is_err() {
            debug!("Could not deliver {} to {}: outbound closed", kind, self.nickname);
        }
    }

    /// Non-blocking check of the error signal. A signal whose sender is gone
    /// counts as closed.
    pub fn check_disconnected(&mut self) -> Option<TransportError> {
        match self.errors.try_recv() {
            Ok(error) => Some(error),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => Some(TransportError::Closed),
        }
    }
}

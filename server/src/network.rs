//! Line-delimited TCP transport feeding connections into the lobby.
//!
//! The first line a client sends is its nickname. After that every line in
//! either direction is one JSON envelope. Each connection gets a read pump and
//! a write pump; either one raises the connection's error signal when the
//! socket fails or reaches end of stream.

use log::{debug, error, info, warn};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::lobby::Lobby;
use crate::player::{Connection, RemoteEnd, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicknameError {
    #[error("nickname must not be empty")]
    Empty,
    #[error("nickname must be at most {0} characters")]
    TooLong(usize),
}

/// Trims a requested nickname and checks its length.
pub fn validate_nickname(raw: &str, max_len: usize) -> Result<String, NicknameError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(NicknameError::Empty);
    }
    if nickname.chars().count() > max_len {
        return Err(NicknameError::TooLong(max_len));
    }
    Ok(nickname.to_string())
}

/// Accept loop handing every connection to the lobby.
pub struct NetworkServer {
    listener: TcpListener,
    lobby: Lobby,
}

impl NetworkServer {
    pub async fn bind(lobby: Lobby) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&lobby.config().bind_addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, lobby })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs until accepting fails.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!("Accepted connection from {}", peer);
            tokio::spawn(handle_connection(stream, peer, self.lobby.clone()));
        }
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, lobby: Lobby) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let requested = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!("{} closed before sending a nickname", peer);
            return;
        }
        Err(e) => {
            warn!("Handshake read from {} failed: {}", peer, e);
            return;
        }
    };

    let nickname = match validate_nickname(&requested, lobby.config().max_nickname_len) {
        Ok(nickname) => nickname,
        Err(e) => {
            info!("Refusing {}: {}", peer, e);
            let refusal = format!("error: {}\n", e);
            if let Err(e) = writer.write_all(refusal.as_bytes()).await {
                debug!("Could not send refusal to {}: {}", peer, e);
            }
            let _ = writer.shutdown().await;
            return;
        }
    };

    let id = Uuid::new_v4().to_string();
    let (connection, remote) = Connection::pair(id, nickname);
    let RemoteEnd {
        to_server,
        from_server,
        errors,
    } = remote;

    tokio::spawn(read_pump(lines, to_server, errors.clone(), peer));
    tokio::spawn(write_pump(writer, from_server, errors, peer));

    if let Err(e) = lobby.join(connection).await {
        warn!("Could not admit {}: {}", peer, e);
    }
}

fn raise(errors: &mpsc::Sender<TransportError>, error: TransportError) {
    if errors.try_send(error).is_err() {
        debug!("Error signal already raised");
    }
}

async fn read_pump(
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    inbound: mpsc::Sender<Vec<u8>>,
    errors: mpsc::Sender<TransportError>,
    peer: SocketAddr,
) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if inbound.send(line.into_bytes()).await.is_err() {
                    debug!("Server side of {} is gone, read pump stopping", peer);
                    break;
                }
            }
            Ok(None) => {
                info!("{} disconnected", peer);
                raise(&errors, TransportError::Closed);
                break;
            }
            Err(e) => {
                error!("Read from {} failed: {}", peer, e);
                raise(&errors, TransportError::Io(e.to_string()));
                break;
            }
        }
    }
}

async fn write_pump(
    mut writer: OwnedWriteHalf,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    errors: mpsc::Sender<TransportError>,
    peer: SocketAddr,
) {
    while let Some(mut frame) = outbound.recv().await {
        frame.push(b'\n');
        if let Err(e) = writer.write_all(&frame).await {
            error!("Write to {} failed: {}", peer, e);
            raise(&errors, TransportError::Io(e.to_string()));
            return;
        }
    }

    // The player was released; close our half so the client sees the end.
    debug!("Closing connection to {}", peer);
    let _ = writer.shutdown().await;
}

//! A low-level blocking TCP client.
//!
//! This client is blocking and so is primarily used as a testing utility
//! rather than an actual game client.

use anyhow::{Error, bail};
use std::{
    io::BufReader,
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use super::{messages::ServerMessage, utils};
use crate::game::{
    entities::{Card, TableView, Username},
    round::Decision,
};

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for writing to the server.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A blocking TCP client for connecting to a game server.
///
/// Provides a synchronous interface for receiving broadcasts and answering
/// decision prompts.
#[derive(Debug)]
pub struct Client {
    /// The username associated with this client.
    pub username: Username,
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    /// Connect to a server, announce the username, and receive the
    /// admission table snapshot.
    ///
    /// Connection attempts retry with decreasing timeouts (1s, 500ms,
    /// 100ms), matching a server that may still be binding its port.
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or if the server rejects the
    /// connection (`REJECTED:GAME_RUNNING` / `REJECTED:TABLE_FULL`).
    pub fn connect(username: Username, addr: &SocketAddr) -> Result<(Self, TableView), Error> {
        let mut connect_timeouts = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        while let Some(connect_timeout) = connect_timeouts.pop() {
            match TcpStream::connect_timeout(addr, connect_timeout) {
                Ok(mut stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
                    utils::write_line(&mut stream, &username.to_string())?;
                    let mut reader = BufReader::new(stream.try_clone()?);
                    return match ServerMessage::read_from(&mut reader)? {
                        ServerMessage::Rejected(reason) => bail!("rejected: {reason}"),
                        ServerMessage::Table(view) => Ok((
                            Self {
                                username,
                                stream,
                                reader,
                            },
                            view,
                        )),
                        response => bail!("invalid server response: {response}"),
                    };
                }
                _ => thread::sleep(connect_timeout),
            }
        }
        bail!("couldn't connect to {addr} as {username}")
    }

    /// Receive the next server message.
    pub fn recv(&mut self) -> Result<ServerMessage, Error> {
        Ok(ServerMessage::read_from(&mut self.reader)?)
    }

    /// Receive messages until a `DECISION` prompt arrives, returning the
    /// prompted card. Broadcasts that arrive in between are discarded.
    pub fn recv_decision_prompt(&mut self) -> Result<Card, Error> {
        loop {
            if let ServerMessage::Decision(card) = self.recv()? {
                return Ok(card);
            }
        }
    }

    /// Receive messages until the next table snapshot.
    pub fn recv_table(&mut self) -> Result<TableView, Error> {
        loop {
            if let ServerMessage::Table(view) = self.recv()? {
                return Ok(view);
            }
        }
    }

    /// Answer a `DECISION` prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply cannot be sent to the server.
    pub fn send_decision(&mut self, decision: Decision) -> Result<(), Error> {
        utils::write_line(&mut self.stream, &decision.to_string())?;
        Ok(())
    }
}

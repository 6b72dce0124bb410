use log::debug;
use std::{
    collections::HashMap,
    io,
    net::TcpStream,
    sync::{Mutex, MutexGuard, PoisonError, mpsc},
};

use super::config::ServerConfig;
use crate::{
    game::{
        entities::{Card, Seat, SeatIndex, Table},
        round::Decision,
    },
    net::messages::ServerMessage,
};

/// A request for one seat's decision, serviced by that seat's connection
/// worker: the worker writes the `DECISION` prompt, blocks on the reply
/// line, and answers on `reply`.
pub(crate) struct DecisionPrompt {
    pub card: Card,
    pub reply: mpsc::Sender<io::Result<Decision>>,
}

/// The write half and prompt channel for one seated connection.
struct SeatLink {
    writer: TcpStream,
    prompts: mpsc::Sender<DecisionPrompt>,
}

/// Process-wide mutable game state.
///
/// Guarded by the single mutex in [`SharedState`]; every mutation of seats,
/// dealer, or lifecycle flags happens under that lock.
pub(crate) struct GameState {
    pub table: Table,
    links: HashMap<SeatIndex, SeatLink>,
    pub game_running: bool,
    pub countdown_active: bool,
    pub cancel_countdown: bool,
}

impl GameState {
    fn new() -> Self {
        Self {
            table: Table::default(),
            links: HashMap::new(),
            game_running: false,
            countdown_active: false,
            cancel_countdown: false,
        }
    }

    pub(crate) fn register(
        &mut self,
        seat: SeatIndex,
        writer: TcpStream,
        prompts: mpsc::Sender<DecisionPrompt>,
    ) {
        self.links.insert(seat, SeatLink { writer, prompts });
    }

    /// Free a seat and its connection handles. Dropping the prompt sender
    /// makes the seat's worker thread exit.
    pub(crate) fn remove_seat(&mut self, seat: SeatIndex) -> Option<Seat> {
        self.links.remove(&seat);
        self.table.remove(seat)
    }

    pub(crate) fn prompt_sender(&self, seat: SeatIndex) -> Option<mpsc::Sender<DecisionPrompt>> {
        self.links.get(&seat).map(|link| link.prompts.clone())
    }

    /// Write a message to one seat.
    pub(crate) fn send_to(&mut self, seat: SeatIndex, msg: &ServerMessage) -> io::Result<()> {
        let link = self
            .links
            .get_mut(&seat)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))?;
        msg.write_to(&mut link.writer)
    }

    /// Best-effort broadcast: a failed send to one seat does not prevent
    /// the others. Returns the seats whose writes failed.
    pub(crate) fn broadcast(&mut self, msg: &ServerMessage) -> Vec<SeatIndex> {
        let mut failed = Vec::new();
        for (&seat, link) in &mut self.links {
            if let Err(error) = msg.write_to(&mut link.writer) {
                debug!("write to seat {seat} failed: {error}");
                failed.push(seat);
            }
        }
        failed
    }
}

/// The state and configuration shared by every server thread.
pub(crate) struct SharedState {
    state: Mutex<GameState>,
    pub config: ServerConfig,
}

pub(crate) type Shared = std::sync::Arc<SharedState>;

impl SharedState {
    pub(crate) fn new(config: ServerConfig) -> Self {
        Self {
            state: Mutex::new(GameState::new()),
            config,
        }
    }

    /// Take the game-state lock. Poisoning is ignored; critical sections
    /// leave the state consistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

use log::{debug, info, warn};
use std::{
    io::{self, BufReader},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{Arc, mpsc},
    thread,
};

use super::{
    config::ServerConfig,
    engine,
    registry::{Shared, SharedState},
};
use crate::{
    game::{
        entities::{Card, SeatIndex, Username},
        round::Decision,
    },
    net::{
        messages::{RejectReason, ServerMessage},
        utils,
    },
};

/// A bound game server.
pub struct Server {
    listener: TcpListener,
    shared: Shared,
}

impl Server {
    /// Bind the listening socket. Failing to bind is fatal to the caller.
    pub fn bind(addr: SocketAddr, config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Self {
            listener,
            shared: Arc::new(SharedState::new(config)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits.
    pub fn run(self) -> io::Result<()> {
        info!("listening on {}", self.listener.local_addr()?);
        {
            let shared = Arc::clone(&self.shared);
            thread::spawn(move || lobby_loop(shared));
        }
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let shared = Arc::clone(&self.shared);
                    thread::spawn(move || handle_connection(shared, stream));
                }
                Err(error) => warn!("accept failed: {error}"),
            }
        }
        Ok(())
    }
}

/// Bind and run a server.
pub fn run(addr: SocketAddr, config: ServerConfig) -> io::Result<()> {
    Server::bind(addr, config)?.run()
}

fn handle_connection(shared: Shared, stream: TcpStream) {
    let peer = stream
        .peer_addr()
        .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
    if let Err(error) = serve_connection(&shared, stream, &peer) {
        debug!("connection from {peer} ended: {error}");
    }
}

/// The per-connection worker: username intake, admission, then decision
/// prompts. It blocks on reads only here and when the engine asks for a
/// decision; it never runs an independent message loop.
fn serve_connection(shared: &Shared, mut stream: TcpStream, peer: &str) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let username = Username::new(&utils::read_line(&mut reader)?);
    info!("{username} connected from {peer}");

    let (prompt_tx, prompt_rx) = mpsc::channel();
    let seat = {
        let mut state = shared.lock();
        if state.game_running {
            info!("{username} rejected: game running");
            ServerMessage::Rejected(RejectReason::GameRunning).write_to(&mut stream)?;
            return Ok(());
        }
        let Some(seat) = state.table.admit(username.clone()) else {
            info!("{username} rejected: table full");
            ServerMessage::Rejected(RejectReason::TableFull).write_to(&mut stream)?;
            return Ok(());
        };
        state.register(seat, stream.try_clone()?, prompt_tx);
        let view = state.table.view();
        let failed = state.broadcast(&ServerMessage::Table(view));
        drop(state);
        drop_seats(shared, failed);
        seat
    };
    info!("{username} took seat {seat}");

    while let Ok(prompt) = prompt_rx.recv() {
        let result = serve_prompt(&mut stream, &mut reader, prompt.card);
        let broken = result.is_err();
        let _ = prompt.reply.send(result);
        if broken {
            break;
        }
    }
    Ok(())
}

/// Solicit one decision: write the prompt, block for the reply line.
/// An unparseable reply tears the connection down.
fn serve_prompt(
    stream: &mut TcpStream,
    reader: &mut BufReader<TcpStream>,
    card: Card,
) -> io::Result<Decision> {
    ServerMessage::Decision(card).write_to(stream)?;
    let line = utils::read_line(reader)?;
    line.parse::<Decision>()
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

/// Lobby ticker: nags a lone player each tick and starts the countdown once
/// a second seat fills. Runs for the life of the process; it goes quiet
/// while a game or countdown is in progress.
fn lobby_loop(shared: Shared) {
    loop {
        thread::sleep(shared.config.tick_interval);
        let failed = {
            let mut state = shared.lock();
            if state.game_running || state.countdown_active {
                continue;
            }
            match state.table.seat_count() {
                0 => continue,
                1 => state.broadcast(&ServerMessage::Waiting(
                    "waiting for more players".to_string(),
                )),
                _ => {
                    state.countdown_active = true;
                    state.cancel_countdown = false;
                    let countdown_shared = Arc::clone(&shared);
                    thread::spawn(move || countdown_loop(countdown_shared));
                    continue;
                }
            }
        };
        drop_seats(&shared, failed);
    }
}

/// One-shot lobby countdown. Cancellation is a flag checked each tick, not
/// a thread interruption; on expiry the game flips to running and the
/// engine thread starts.
fn countdown_loop(shared: Shared) {
    info!("lobby countdown started");
    for remaining in (1..=shared.config.countdown_ticks).rev() {
        let failed = {
            let mut state = shared.lock();
            if state.cancel_countdown || state.table.seat_count() < 2 {
                state.countdown_active = false;
                state.cancel_countdown = false;
                info!("lobby countdown cancelled");
                return;
            }
            state.broadcast(&ServerMessage::Waiting(format!(
                "game starts in {remaining}s"
            )))
        };
        drop_seats(&shared, failed);
        thread::sleep(shared.config.tick_interval);
    }
    {
        let mut state = shared.lock();
        state.countdown_active = false;
        if state.cancel_countdown || state.table.seat_count() < 2 {
            state.cancel_countdown = false;
            info!("lobby countdown cancelled");
            return;
        }
        state.game_running = true;
    }
    let engine_shared = Arc::clone(&shared);
    thread::spawn(move || engine::game_loop(engine_shared));
}

/// Remove seats whose connections failed.
///
/// A failure during a running game abandons the whole game: the seat is
/// freed, every remaining seat's lives reset, and the lobby cycle takes
/// over. No attempt is made to resume the interrupted round. Returns true
/// if a running game was aborted.
pub(crate) fn drop_seats(shared: &Shared, mut failed: Vec<SeatIndex>) -> bool {
    let mut aborted = false;
    while !failed.is_empty() {
        let mut state = shared.lock();
        for seat in failed.drain(..) {
            if let Some(freed) = state.remove_seat(seat) {
                warn!("{} (seat {seat}) disconnected", freed.username);
            }
        }
        if state.game_running {
            state.game_running = false;
            state.table.reset_lives();
            aborted = true;
            warn!("game abandoned after disconnect");
        }
        if state.countdown_active && state.table.seat_count() < 2 {
            state.cancel_countdown = true;
        }
        // Survivors need the updated table; a failure here cascades into
        // another removal pass.
        let view = state.table.view();
        failed = state.broadcast(&ServerMessage::Table(view));
    }
    aborted
}

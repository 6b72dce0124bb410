//! # Chase the Ace
//!
//! A multiplayer chase-the-ace card game: the server-side engine and its
//! line-oriented wire protocol.
//!
//! Players join a shared table of up to six seats. Each round every seat
//! with lives remaining is dealt one card and, in turn order, decides to
//! `keep` it or `switch`; the dealer acts last and redraws from the deck
//! instead of swapping. The seats revealing the lowest card lose a life,
//! and the last seat with lives remaining wins. Kings are immune: revealed
//! on the spot, never taken in a switch.
//!
//! ## Architecture
//!
//! One thread accepts connections and one worker thread serves each seated
//! connection, blocking on reads only for username intake and decisions the
//! engine solicits. A single engine thread owns round progression:
//!
//! - **Lobby**: waiting for two or more players, then a countdown
//! - **Dealing**: one card per live seat, in flip order
//! - **Decisions**: keep or switch, dealer redraws last
//! - **Reveal**: the full round table goes out to every seat
//! - **Loss resolution**: lowest rank loses a life; total ties push
//!
//! All shared table state sits behind one lock. A mid-game disconnect
//! abandons the game and returns everyone to the lobby.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, seats, and round rules
//! - [`net`]: wire protocol codec and a blocking client
//! - [`server`]: session supervision and the game loop
//!
//! ## Example
//!
//! ```no_run
//! use chase_the_ace::server::{Server, ServerConfig};
//!
//! let addr = "127.0.0.1:0".parse().unwrap();
//! let server = Server::bind(addr, ServerConfig::default()).unwrap();
//! server.run().unwrap();
//! ```

/// Core game logic and entities.
pub mod game;
pub use game::{
    constants::{MAX_SEATS, STARTING_LIVES},
    entities, round,
};

/// Networking components for client-server communication.
pub mod net;
pub use net::{client::Client, messages, utils};

/// The game server.
pub mod server;
pub use server::{Server, ServerConfig};

//! The game server.
//!
//! Session supervision (accept loop, admission, lobby countdown), the round
//! engine, and the connection registry, all sharing one lock-guarded
//! [`registry::GameState`]. The engine thread is the only writer of round
//! progression; connection workers block on reads only when the engine asks
//! a seat for a decision.

mod config;
mod engine;
mod registry;
mod session;

pub use config::ServerConfig;
pub use session::{Server, run};

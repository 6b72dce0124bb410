//! Core game logic: cards, seats, and round rules.
//!
//! Everything in this module is independent of the transport layer so the
//! rules can be tested without sockets. The [`crate::server`] module drives
//! these types from its game loop.

pub mod constants;
pub mod entities;
pub mod round;

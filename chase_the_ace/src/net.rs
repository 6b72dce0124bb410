//! Networking layer for client-server communication.
//!
//! The wire protocol is line-oriented: every command is a single ASCII line
//! terminated by `\n`. Two commands (`TABLE`, `REVEAL`) additionally carry a
//! length-prefixed JSON payload declared by the control line.

/// A low-level blocking TCP client, primarily a testing utility.
pub mod client;

/// Protocol error types.
pub mod errors;

/// Message types for the client-server protocol.
pub mod messages;

/// Line and payload framing primitives.
pub mod utils;

//! Protocol error types.
//!
//! Transport failures stay `std::io::Error` so callers can match on
//! `ErrorKind`; everything that means "the bytes were readable but not a
//! valid message" is a [`ProtocolError`], and the offending connection is
//! torn down by the caller.

use std::io;
use thiserror::Error;

use crate::game::{entities::ParseCardError, round::ParseDecisionError};

/// Errors raised while decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line did not start with a known command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The command was recognized but its fields did not parse.
    #[error("malformed {command} message: {line}")]
    Malformed { command: &'static str, line: String },

    /// A field that should have been a card token was not.
    #[error(transparent)]
    BadCard(#[from] ParseCardError),

    /// A field that should have been `keep` or `switch` was not.
    #[error(transparent)]
    BadDecision(#[from] ParseDecisionError),

    /// A declared payload size exceeded the maximum allowed.
    #[error("payload size {actual} exceeds maximum {max}")]
    PayloadTooLarge { actual: usize, max: usize },

    /// A length-prefixed payload was not valid JSON for its command.
    #[error("invalid payload: {0}")]
    BadPayload(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type for protocol decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

//! Game-wide constants.

/// Number of seats at the table. Seat ids are always in `0..MAX_SEATS`.
pub const MAX_SEATS: usize = 6;

/// Lives each player starts a game with.
pub const STARTING_LIVES: u8 = 4;

/// Cards in a full deck.
pub const DECK_SIZE: usize = 52;

/// Usernames are truncated to this length at construction.
pub const MAX_USERNAME_LEN: usize = 16;

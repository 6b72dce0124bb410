use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

use super::constants::{DECK_SIZE, MAX_SEATS, MAX_USERNAME_LEN, STARTING_LIVES};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Club, Self::Spade, Self::Diamond, Self::Heart];

    /// Single-letter ASCII form used in card tokens.
    pub const fn letter(self) -> char {
        match self {
            Self::Club => 'C',
            Self::Spade => 'S',
            Self::Diamond => 'D',
            Self::Heart => 'H',
        }
    }

    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'C' => Some(Self::Club),
            'S' => Some(Self::Spade),
            'D' => Some(Self::Diamond),
            'H' => Some(Self::Heart),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Placeholder for card values. Ace is 1 (lowest), king is 13 (highest).
pub type Value = u8;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("not a card token: {0}")]
pub struct ParseCardError(pub String);

/// A card is a tuple of a value (ace=1u8 ... king=13u8) and a suit.
///
/// The wire token is the rank followed by the suit letter, e.g. `AS`,
/// `10H`, `KC`. Cards serialize as their token string.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Card(pub Value, pub Suit);

impl Card {
    pub const KING_VALUE: Value = 13;

    /// Kings are immune: revealed without soliciting a decision and never
    /// taken in a switch.
    pub const fn is_king(self) -> bool {
        self.0 == Self::KING_VALUE
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            1 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseCardError(s.to_string());
        let mut chars = s.chars();
        let suit = chars.next_back().and_then(Suit::from_letter).ok_or_else(bad)?;
        let value = match chars.as_str() {
            "A" => 1,
            "J" => 11,
            "Q" => 12,
            "K" => 13,
            v => match v.parse::<Value>() {
                Ok(v) if (2..=10).contains(&v) => v,
                _ => return Err(bad()),
            },
        };
        Ok(Self(value, suit))
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A shuffled 52-card deck consumed one card at a time.
///
/// Callers reshuffle before the deck runs dry; the game loop guarantees at
/// least `player_count + 1` cards remain before each round.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    deck_idx: usize,
}

impl Deck {
    pub fn draw(&mut self) -> Card {
        let card = self.cards[self.deck_idx];
        self.deck_idx += 1;
        card
    }

    pub fn remaining(&self) -> usize {
        DECK_SIZE - self.deck_idx
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.deck_idx = 0;
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card(1, Suit::Club); DECK_SIZE];
        for (i, value) in (1..=13u8).enumerate() {
            for (j, suit) in Suit::ALL.into_iter().enumerate() {
                cards[4 * i + j] = Card(value, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// A player's display name.
///
/// Whitespace and the protocol delimiters `:`/`,` are replaced with `_` at
/// construction so every inline message stays unambiguous, and the name is
/// truncated to [`MAX_USERNAME_LEN`].
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(s: &str) -> Self {
        let mut username: String = s
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_whitespace() || c == ':' || c == ',' {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        username.truncate(MAX_USERNAME_LEN);
        Self(username)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<String> for Username {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

/// Type alias for seat positions at the table.
pub type SeatIndex = usize;

/// One occupied seat: identity, remaining lives, dealer flag.
#[derive(Clone, Debug)]
pub struct Seat {
    pub username: Username,
    pub lives: u8,
    pub is_dealer: bool,
}

/// A seat as serialized in `TABLE` payloads: `[username, lives, isDealer]`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SeatView(pub Username, pub u8, pub bool);

/// The full seat table as serialized in `TABLE` payloads.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableView(pub BTreeMap<SeatIndex, SeatView>);

/// The set of all seats, keyed by seat id.
///
/// Invariants: at most [`MAX_SEATS`] seats; at most one dealer while the
/// table is non-empty; seat ids are stable until freed and then reusable.
#[derive(Debug, Default)]
pub struct Table {
    seats: BTreeMap<SeatIndex, Seat>,
}

impl Table {
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= MAX_SEATS
    }

    pub fn get(&self, seat: SeatIndex) -> Option<&Seat> {
        self.seats.get(&seat)
    }

    pub fn get_mut(&mut self, seat: SeatIndex) -> Option<&mut Seat> {
        self.seats.get_mut(&seat)
    }

    pub fn seat_ids(&self) -> impl Iterator<Item = SeatIndex> + '_ {
        self.seats.keys().copied()
    }

    /// Assign the lowest-numbered free seat to `username`.
    ///
    /// The first player to join an empty table becomes the dealer.
    /// Returns `None` when the table is full.
    pub fn admit(&mut self, username: Username) -> Option<SeatIndex> {
        let seat = (0..MAX_SEATS).find(|id| !self.seats.contains_key(id))?;
        let is_dealer = self.dealer().is_none();
        self.seats.insert(
            seat,
            Seat {
                username,
                lives: STARTING_LIVES,
                is_dealer,
            },
        );
        Some(seat)
    }

    /// Free a seat. If the dealer leaves, the dealer flag moves to the next
    /// occupied seat so the at-most-one-dealer invariant holds.
    pub fn remove(&mut self, seat: SeatIndex) -> Option<Seat> {
        let removed = self.seats.remove(&seat)?;
        if removed.is_dealer
            && let Some(next) = self.next_occupied_after(seat)
            && let Some(next_seat) = self.seats.get_mut(&next)
        {
            next_seat.is_dealer = true;
        }
        Some(removed)
    }

    pub fn dealer(&self) -> Option<SeatIndex> {
        self.seats
            .iter()
            .find(|(_, seat)| seat.is_dealer)
            .map(|(&id, _)| id)
    }

    /// Move the dealer flag to the next seat with lives remaining,
    /// wrapping and skipping empty or zero-life seats.
    pub fn advance_dealer(&mut self) -> Option<SeatIndex> {
        let current = self.dealer()?;
        let next = self
            .circular_ids_after(current)
            .find(|&id| id != current && self.seats[&id].lives > 0)?;
        if let Some(seat) = self.seats.get_mut(&current) {
            seat.is_dealer = false;
        }
        if let Some(seat) = self.seats.get_mut(&next) {
            seat.is_dealer = true;
        }
        Some(next)
    }

    /// Turn order for a round: every seat with lives remaining, starting
    /// immediately clockwise of the dealer and wrapping, dealer last.
    pub fn flip_order(&self) -> Vec<SeatIndex> {
        let Some(dealer) = self.dealer() else {
            return Vec::new();
        };
        let mut order: Vec<SeatIndex> = self
            .circular_ids_after(dealer)
            .filter(|&id| self.seats[&id].lives > 0)
            .collect();
        // The dealer wraps to the back; a dead dealer is advanced before
        // flip order is computed.
        if order.first() == Some(&dealer) {
            order.rotate_left(1);
        }
        order
    }

    pub fn alive_count(&self) -> usize {
        self.seats.values().filter(|seat| seat.lives > 0).count()
    }

    pub fn reset_lives(&mut self) {
        for seat in self.seats.values_mut() {
            seat.lives = STARTING_LIVES;
        }
    }

    pub fn view(&self) -> TableView {
        TableView(
            self.seats
                .iter()
                .map(|(&id, seat)| {
                    (id, SeatView(seat.username.clone(), seat.lives, seat.is_dealer))
                })
                .collect(),
        )
    }

    /// Occupied seat ids in circular order starting strictly after `seat`.
    fn circular_ids_after(&self, seat: SeatIndex) -> impl Iterator<Item = SeatIndex> + '_ {
        let mut ids: Vec<SeatIndex> = self.seats.keys().copied().collect();
        ids.sort_unstable();
        let pivot = ids.partition_point(|&id| id <= seat);
        ids.rotate_left(pivot);
        ids.into_iter()
    }

    fn next_occupied_after(&self, seat: SeatIndex) -> Option<SeatIndex> {
        self.circular_ids_after(seat).next()
    }
}

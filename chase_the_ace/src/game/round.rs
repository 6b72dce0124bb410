use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use thiserror::Error;

use super::entities::{Card, SeatIndex, Table};

/// A seat's choice in response to its dealt card.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Keep,
    Switch,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Keep => "keep",
            Self::Switch => "switch",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("not a decision: {0}")]
pub struct ParseDecisionError(pub String);

impl FromStr for Decision {
    type Err = ParseDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(Self::Keep),
            "switch" => Ok(Self::Switch),
            _ => Err(ParseDecisionError(s.to_string())),
        }
    }
}

/// Cards held per seat for one round, discarded after loss resolution.
///
/// Every entry holds one card except a dealer who redrew, whose entry grows
/// to two; only the last card counts at loss resolution. Serializes as the
/// `REVEAL` payload, a map of seat id to card tokens.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RoundTable(pub BTreeMap<SeatIndex, Vec<Card>>);

impl RoundTable {
    pub fn deal(&mut self, seat: SeatIndex, card: Card) {
        self.0.insert(seat, vec![card]);
    }

    /// Append the dealer's redrawn card; the original stays face up.
    pub fn redraw(&mut self, seat: SeatIndex, card: Card) {
        self.0.entry(seat).or_default().push(card);
    }

    pub fn swap(&mut self, a: SeatIndex, b: SeatIndex) {
        if a == b {
            return;
        }
        match (self.0.remove(&a), self.0.remove(&b)) {
            (Some(cards_a), Some(cards_b)) => {
                self.0.insert(a, cards_b);
                self.0.insert(b, cards_a);
            }
            (Some(cards_a), None) => {
                self.0.insert(a, cards_a);
            }
            (None, Some(cards_b)) => {
                self.0.insert(b, cards_b);
            }
            (None, None) => {}
        }
    }

    /// The card a seat currently plays: its second card if it drew one,
    /// else its only card.
    pub fn current(&self, seat: SeatIndex) -> Option<Card> {
        self.0.get(&seat).and_then(|cards| cards.last()).copied()
    }

    pub fn cards(&self, seat: SeatIndex) -> &[Card] {
        self.0.get(&seat).map_or(&[], Vec::as_slice)
    }
}

/// Every seat tied at the minimum rank. Ace is lowest, king is highest.
pub fn losing_seats(round: &RoundTable) -> Vec<SeatIndex> {
    let Some(min) = round
        .0
        .values()
        .filter_map(|cards| cards.last())
        .map(|card| card.0)
        .min()
    else {
        return Vec::new();
    };
    round
        .0
        .iter()
        .filter(|(_, cards)| cards.last().is_some_and(|card| card.0 == min))
        .map(|(&seat, _)| seat)
        .collect()
}

/// What a finished round means for the game.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundOutcome {
    /// Play another round.
    Continue,
    /// Everyone left would have been eliminated at once; lives were
    /// restored and the round changes nothing.
    Push,
    /// Exactly one seat has lives remaining.
    GameOver(SeatIndex),
}

/// Decrement each losing seat's lives and classify the result.
///
/// If the decrement would leave zero seats alive, it is reverted for every
/// loser and the round is a push.
pub fn apply_losses(table: &mut Table, losers: &[SeatIndex]) -> RoundOutcome {
    for &seat in losers {
        if let Some(seat) = table.get_mut(seat) {
            seat.lives = seat.lives.saturating_sub(1);
        }
    }
    let alive: Vec<SeatIndex> = table
        .seat_ids()
        .filter(|&id| table.get(id).is_some_and(|seat| seat.lives > 0))
        .collect();
    match alive.as_slice() {
        [] => {
            for &seat in losers {
                if let Some(seat) = table.get_mut(seat) {
                    seat.lives += 1;
                }
            }
            RoundOutcome::Push
        }
        [winner] => RoundOutcome::GameOver(*winner),
        _ => RoundOutcome::Continue,
    }
}

use serde::Serialize;
use std::{
    fmt,
    io::{self, BufRead, Write},
};

use super::{
    errors::{ProtocolError, Result},
    utils,
};
use crate::game::{
    entities::{Card, SeatIndex, TableView, Username},
    round::{Decision, RoundTable},
};

/// Why an admission attempt was refused. Sent as the payload of a
/// `REJECTED` line, after which the connection is closed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RejectReason {
    GameRunning,
    TableFull,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::GameRunning => "GAME_RUNNING",
            Self::TableFull => "TABLE_FULL",
        };
        write!(f, "{repr}")
    }
}

/// A message from the server to a client.
///
/// Most commands are a single inline line. `Table` and `Reveal` are
/// length-prefixed: the control line declares a byte count and exactly that
/// many raw bytes of JSON follow, not newline-terminated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerMessage {
    /// Connection refused; sent once, then the connection is closed.
    Rejected(RejectReason),
    /// Lobby or status text for display.
    Waiting(String),
    /// Full seat table snapshot.
    Table(TableView),
    /// Per-seat deal notification; `None` means the seat sat this round out.
    Deal {
        flip_order: Vec<SeatIndex>,
        card: Option<Card>,
    },
    /// A seat's decision, broadcast to everyone.
    PlayerAction {
        seat: SeatIndex,
        decision: Decision,
    },
    /// Addressed only to the acting seat; the server blocks for a reply.
    Decision(Card),
    /// Addressed only to a seat whose card changed via switch or redraw.
    NewCard(Card),
    /// An immune king revealed without soliciting a decision.
    FlipCard { seat: SeatIndex, card: Card },
    /// Full round table at the end of a round.
    Reveal {
        flip_order: Vec<SeatIndex>,
        round: RoundTable,
    },
    /// Round-end loser announcement.
    Losers {
        usernames: Vec<Username>,
        cards: Vec<Card>,
    },
}

impl ServerMessage {
    /// Encode onto a writer: the command line, plus the raw JSON payload for
    /// the length-prefixed shapes.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Self::Rejected(reason) => utils::write_line(writer, &format!("REJECTED:{reason}")),
            Self::Waiting(text) => utils::write_line(writer, &format!("WAITING:{text}")),
            Self::Table(view) => {
                let payload = encode_json(view)?;
                utils::write_sized(writer, &format!("TABLE:{}", payload.len()), &payload)
            }
            Self::Deal { flip_order, card } => {
                let card = card.map_or_else(|| "NONE".to_string(), |card| card.to_string());
                utils::write_line(writer, &format!("DEAL:{}:{card}", seat_csv(flip_order)))
            }
            Self::PlayerAction { seat, decision } => {
                utils::write_line(writer, &format!("PLAYER_ACTION:{seat}:{decision}"))
            }
            Self::Decision(card) => utils::write_line(writer, &format!("DECISION:{card}")),
            Self::NewCard(card) => utils::write_line(writer, &format!("NEW_CARD:{card}")),
            Self::FlipCard { seat, card } => {
                utils::write_line(writer, &format!("FLIP_CARD:{seat}:{card}"))
            }
            Self::Reveal { flip_order, round } => {
                let payload = encode_json(round)?;
                let control = format!("REVEAL:{}:{}", payload.len(), seat_csv(flip_order));
                utils::write_sized(writer, &control, &payload)
            }
            Self::Losers { usernames, cards } => {
                let names = usernames
                    .iter()
                    .map(Username::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let cards = cards
                    .iter()
                    .map(Card::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                utils::write_line(writer, &format!("LOSERS:{names}:{cards}"))
            }
        }
    }

    /// Decode one message from a reader. Parsing happens once, here at the
    /// boundary; everything downstream matches on the variants.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let line = utils::read_line(reader)?;
        let (command, rest) = line.split_once(':').unwrap_or((line.as_str(), ""));
        match command {
            "REJECTED" => match rest {
                "GAME_RUNNING" => Ok(Self::Rejected(RejectReason::GameRunning)),
                "TABLE_FULL" => Ok(Self::Rejected(RejectReason::TableFull)),
                _ => Err(malformed("REJECTED", &line)),
            },
            "WAITING" => Ok(Self::Waiting(rest.to_string())),
            "TABLE" => {
                let len = parse_len("TABLE", &line, rest)?;
                let payload = utils::read_payload(reader, len)?;
                Ok(Self::Table(serde_json::from_slice(&payload)?))
            }
            "DEAL" => {
                let (csv, card) = rest.split_once(':').ok_or_else(|| malformed("DEAL", &line))?;
                let flip_order = parse_seat_csv("DEAL", &line, csv)?;
                let card = match card {
                    "NONE" => None,
                    token => Some(token.parse()?),
                };
                Ok(Self::Deal { flip_order, card })
            }
            "PLAYER_ACTION" => {
                let (seat, decision) = rest
                    .split_once(':')
                    .ok_or_else(|| malformed("PLAYER_ACTION", &line))?;
                let seat = parse_seat("PLAYER_ACTION", &line, seat)?;
                Ok(Self::PlayerAction {
                    seat,
                    decision: decision.parse()?,
                })
            }
            "DECISION" => Ok(Self::Decision(rest.parse()?)),
            "NEW_CARD" => Ok(Self::NewCard(rest.parse()?)),
            "FLIP_CARD" => {
                let (seat, card) = rest
                    .split_once(':')
                    .ok_or_else(|| malformed("FLIP_CARD", &line))?;
                Ok(Self::FlipCard {
                    seat: parse_seat("FLIP_CARD", &line, seat)?,
                    card: card.parse()?,
                })
            }
            "REVEAL" => {
                let (len, csv) = rest
                    .split_once(':')
                    .ok_or_else(|| malformed("REVEAL", &line))?;
                let len = parse_len("REVEAL", &line, len)?;
                let flip_order = parse_seat_csv("REVEAL", &line, csv)?;
                let payload = utils::read_payload(reader, len)?;
                Ok(Self::Reveal {
                    flip_order,
                    round: serde_json::from_slice(&payload)?,
                })
            }
            "LOSERS" => {
                let (names, cards) = rest
                    .split_once(':')
                    .ok_or_else(|| malformed("LOSERS", &line))?;
                let usernames = names.split(',').map(Username::new).collect();
                let cards = cards
                    .split(',')
                    .map(str::parse)
                    .collect::<std::result::Result<_, _>>()?;
                Ok(Self::Losers { usernames, cards })
            }
            _ => Err(ProtocolError::UnknownCommand(line)),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Rejected(reason) => &format!("rejected: {reason}"),
            Self::Waiting(text) => text,
            Self::Table(_) => "table snapshot",
            Self::Deal { .. } => "deal",
            Self::PlayerAction { seat, decision } => &format!("seat {seat} chose {decision}"),
            Self::Decision(card) => &format!("decision prompt for {card}"),
            Self::NewCard(card) => &format!("new card {card}"),
            Self::FlipCard { seat, card } => &format!("seat {seat} shows {card}"),
            Self::Reveal { .. } => "reveal",
            Self::Losers { usernames, .. } => &format!("{} seat(s) lost", usernames.len()),
        };
        write!(f, "{repr}")
    }
}

fn encode_json<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

fn seat_csv(seats: &[SeatIndex]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn malformed(command: &'static str, line: &str) -> ProtocolError {
    ProtocolError::Malformed {
        command,
        line: line.to_string(),
    }
}

fn parse_seat(command: &'static str, line: &str, field: &str) -> Result<SeatIndex> {
    field.parse().map_err(|_| malformed(command, line))
}

fn parse_seat_csv(command: &'static str, line: &str, csv: &str) -> Result<Vec<SeatIndex>> {
    if csv.is_empty() {
        return Ok(Vec::new());
    }
    csv.split(',')
        .map(|field| parse_seat(command, line, field))
        .collect()
}

fn parse_len(command: &'static str, line: &str, field: &str) -> Result<usize> {
    let len: usize = field.parse().map_err(|_| malformed(command, line))?;
    if len > utils::MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            actual: len,
            max: utils::MAX_PAYLOAD_SIZE,
        });
    }
    Ok(len)
}

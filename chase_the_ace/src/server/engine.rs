use log::{debug, info, warn};
use std::{io, sync::mpsc, thread};

use super::{
    registry::{DecisionPrompt, Shared},
    session,
};
use crate::{
    game::{
        entities::{Card, Deck, SeatIndex},
        round::{self, Decision, RoundOutcome, RoundTable},
    },
    net::messages::ServerMessage,
};

/// The authoritative game loop, one thread per running game.
///
/// Spawned when the lobby countdown expires; the only writer of round and
/// dealer state while the game runs. Exits when the game ends or is
/// abandoned after a disconnect.
pub(crate) fn game_loop(shared: Shared) {
    let mut deck = Deck::default();
    deck.shuffle();
    info!("game starting");
    while play_round(&shared, &mut deck) {}
    info!("returning to lobby");
}

/// Drive one round through dealing, decisions, reveal, and loss
/// resolution. Returns false when the game is over or was abandoned.
fn play_round(shared: &Shared, deck: &mut Deck) -> bool {
    // Dealer and deck lifecycle. A dealer who ran out of lives passes the
    // deal to the next live seat, which also forces a reshuffle.
    let mut dealer_changed = false;
    let flip_order = {
        let mut state = shared.lock();
        if !state.game_running {
            return false;
        }
        if let Some(dealer) = state.table.dealer()
            && state.table.get(dealer).is_some_and(|seat| seat.lives == 0)
        {
            state.table.advance_dealer();
            dealer_changed = true;
        }
        state.table.flip_order()
    };
    if flip_order.len() < 2 {
        warn!("round aborted: not enough live seats");
        shared.lock().game_running = false;
        return false;
    }
    if dealer_changed {
        deck.shuffle();
        if !broadcast_table(shared) {
            return false;
        }
        thread::sleep(shared.config.round_pause);
    }
    // The round needs one card per live seat plus a possible dealer redraw.
    if deck.remaining() < flip_order.len() + 1 {
        debug!("deck low, reshuffling");
        deck.shuffle();
    }

    // Dealing. Every live seat draws; seats that are out of lives are told
    // the round is passing them by.
    let mut round_table = RoundTable::default();
    for &seat in &flip_order {
        round_table.deal(seat, deck.draw());
    }
    let failed = {
        let mut state = shared.lock();
        let seats: Vec<SeatIndex> = state.table.seat_ids().collect();
        let mut failed = Vec::new();
        for seat in seats {
            let msg = ServerMessage::Deal {
                flip_order: flip_order.clone(),
                card: round_table.current(seat),
            };
            if state.send_to(seat, &msg).is_err() {
                failed.push(seat);
            }
        }
        failed
    };
    if session::drop_seats(shared, failed) {
        return false;
    }
    thread::sleep(shared.config.deal_pause);

    // Decisions, in flip order. The dealer acts last and redraws instead
    // of swapping; with two live seats the non-head seat is the dealer.
    for (position, &seat) in flip_order.iter().enumerate() {
        let Some(card) = round_table.current(seat) else {
            continue;
        };
        if card.is_king() {
            // Immune: revealed without soliciting a decision.
            if !broadcast_or_abort(shared, &ServerMessage::FlipCard { seat, card }) {
                return false;
            }
            continue;
        }
        let decision = match request_decision(shared, seat, card) {
            Ok(decision) => decision,
            Err(error) => {
                warn!("seat {seat} dropped during decision: {error}");
                session::drop_seats(shared, vec![seat]);
                return false;
            }
        };
        debug!("seat {seat} chose {decision}");
        if decision == Decision::Switch {
            let dealer_turn = position == flip_order.len() - 1;
            if dealer_turn {
                let drawn = deck.draw();
                round_table.redraw(seat, drawn);
                if !send_or_abort(shared, seat, &ServerMessage::NewCard(drawn)) {
                    return false;
                }
            } else {
                let target = flip_order[position + 1];
                if let Some(target_card) = round_table.current(target)
                    && !target_card.is_king()
                {
                    round_table.swap(seat, target);
                    if !send_or_abort(shared, seat, &ServerMessage::NewCard(target_card)) {
                        return false;
                    }
                    if !send_or_abort(shared, target, &ServerMessage::NewCard(card)) {
                        return false;
                    }
                }
            }
        }
        let action = ServerMessage::PlayerAction { seat, decision };
        if !broadcast_or_abort(shared, &action) {
            return false;
        }
    }

    // Reveal.
    let reveal = ServerMessage::Reveal {
        flip_order: flip_order.clone(),
        round: round_table.clone(),
    };
    if !broadcast_or_abort(shared, &reveal) {
        return false;
    }

    // Loss resolution.
    let losers = round::losing_seats(&round_table);
    let losers_msg = {
        let state = shared.lock();
        ServerMessage::Losers {
            usernames: losers
                .iter()
                .filter_map(|&seat| state.table.get(seat).map(|s| s.username.clone()))
                .collect(),
            cards: losers
                .iter()
                .filter_map(|&seat| round_table.current(seat))
                .collect(),
        }
    };
    if !broadcast_or_abort(shared, &losers_msg) {
        return false;
    }
    let outcome = {
        let mut state = shared.lock();
        round::apply_losses(&mut state.table, &losers)
    };
    match outcome {
        RoundOutcome::Continue => {}
        RoundOutcome::Push => info!("push: every remaining seat tied at its last life"),
        RoundOutcome::GameOver(winner) => {
            finish_game(shared, winner);
            return false;
        }
    }
    thread::sleep(shared.config.round_pause);
    true
}

/// Game-over sequence: final table, winner announcement, then reset for
/// the next lobby cycle.
fn finish_game(shared: &Shared, winner: SeatIndex) {
    info!("game over: seat {winner} wins");
    let mut failed = broadcast_table_collect(shared);
    let announcement = {
        let state = shared.lock();
        state
            .table
            .get(winner)
            .map(|seat| ServerMessage::Waiting(format!("{} wins!", seat.username)))
    };
    if let Some(announcement) = announcement {
        failed.extend(shared.lock().broadcast(&announcement));
    }
    {
        let mut state = shared.lock();
        state.table.reset_lives();
        state.table.advance_dealer();
        state.game_running = false;
    }
    failed.sort_unstable();
    failed.dedup();
    session::drop_seats(shared, failed);
}

/// Ask a seat's worker for a decision, blocking until the reply arrives.
/// With a configured timeout, a silent seat defaults to `keep`.
fn request_decision(shared: &Shared, seat: SeatIndex, card: Card) -> io::Result<Decision> {
    let Some(prompts) = shared.lock().prompt_sender(seat) else {
        return Err(io::ErrorKind::NotConnected.into());
    };
    let (reply_tx, reply_rx) = mpsc::channel();
    prompts
        .send(DecisionPrompt {
            card,
            reply: reply_tx,
        })
        .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?;
    match shared.config.decision_timeout {
        None => reply_rx
            .recv()
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))?,
        Some(timeout) => match reply_rx.recv_timeout(timeout) {
            Ok(reply) => reply,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                info!("seat {seat} timed out, defaulting to keep");
                Ok(Decision::Keep)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(io::ErrorKind::BrokenPipe.into()),
        },
    }
}

/// Broadcast a message; returns false if the resulting disconnect handling
/// abandoned the game.
fn broadcast_or_abort(shared: &Shared, msg: &ServerMessage) -> bool {
    let failed = shared.lock().broadcast(msg);
    !session::drop_seats(shared, failed)
}

/// Send to one seat; returns false if the game was abandoned.
fn send_or_abort(shared: &Shared, seat: SeatIndex, msg: &ServerMessage) -> bool {
    let result = shared.lock().send_to(seat, msg);
    match result {
        Ok(()) => true,
        Err(error) => {
            warn!("write to seat {seat} failed: {error}");
            !session::drop_seats(shared, vec![seat])
        }
    }
}

/// Broadcast the current table; returns false if the game was abandoned.
fn broadcast_table(shared: &Shared) -> bool {
    let failed = broadcast_table_collect(shared);
    !session::drop_seats(shared, failed)
}

fn broadcast_table_collect(shared: &Shared) -> Vec<SeatIndex> {
    let mut state = shared.lock();
    let view = state.table.view();
    state.broadcast(&ServerMessage::Table(view))
}

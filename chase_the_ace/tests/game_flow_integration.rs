/// Integration tests for full games over real sockets
///
/// Each test spawns a server on an ephemeral port and drives it with
/// scripted clients. The shared client loop cross-checks the protocol as it
/// plays: kings are never offered a decision, prompts and reveals agree
/// with the cards a seat was told it holds, a dealer who switches shows two
/// cards, and every `LOSERS` line matches the revealed round table.
use anyhow::{Error, anyhow, ensure};
use chase_the_ace::{
    Client,
    game::{
        entities::{Card, SeatIndex, TableView, Username},
        round::{self, Decision, RoundTable},
    },
    net::messages::ServerMessage,
    server::{Server, ServerConfig},
};
use std::{collections::BTreeSet, net::SocketAddr, thread, time::Duration};

fn spawn_server(config: ServerConfig) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0".parse().unwrap(), config).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());
    addr
}

/// Instant pacing; the countdown still takes a few ticks so every player
/// in a test gets seated before the game starts.
fn fast_config(countdown_ticks: u32) -> ServerConfig {
    ServerConfig {
        countdown_ticks,
        tick_interval: Duration::from_millis(20),
        deal_pause: Duration::ZERO,
        round_pause: Duration::ZERO,
        decision_timeout: None,
    }
}

/// Join as `name` and play games until a winner is announced, answering
/// every prompt with `decide(card, position, flip_order)`. Returns the
/// winner announcement text.
fn play_game<F>(
    addr: SocketAddr,
    name: &'static str,
    decide: F,
) -> thread::JoinHandle<Result<String, Error>>
where
    F: Fn(Card, usize, &[SeatIndex]) -> Decision + Send + 'static,
{
    thread::spawn(move || {
        let username = Username::new(name);
        let (mut client, view) = Client::connect(username.clone(), &addr)?;
        let my_seat = seat_of(&view, &username)?;
        let mut last_table = view;
        let mut flip_order: Vec<SeatIndex> = Vec::new();
        let mut my_card: Option<Card> = None;
        let mut switched = false;
        let mut reveal: Option<RoundTable> = None;
        let mut rounds = 0usize;
        loop {
            match client.recv()? {
                ServerMessage::Deal {
                    flip_order: order,
                    card,
                } => {
                    rounds += 1;
                    ensure!(rounds < 500, "game did not converge");
                    flip_order = order;
                    my_card = card;
                    switched = false;
                    reveal = None;
                }
                ServerMessage::Decision(card) => {
                    ensure!(!card.is_king(), "a king was offered a decision");
                    if let Some(held) = my_card {
                        ensure!(card == held, "prompted with {card} while holding {held}");
                    }
                    let position = flip_order
                        .iter()
                        .position(|&seat| seat == my_seat)
                        .ok_or_else(|| anyhow!("prompted while out of the round"))?;
                    let decision = decide(card, position, &flip_order);
                    switched = decision == Decision::Switch;
                    client.send_decision(decision)?;
                }
                ServerMessage::NewCard(card) => my_card = Some(card),
                ServerMessage::Reveal { round, .. } => {
                    if let Some(held) = my_card {
                        ensure!(
                            round.current(my_seat) == Some(held),
                            "reveal disagrees with the held card"
                        );
                    }
                    if switched && flip_order.last() == Some(&my_seat) {
                        ensure!(
                            round.cards(my_seat).len() == 2,
                            "a dealer switch must draw a second card"
                        );
                    }
                    reveal = Some(round);
                }
                ServerMessage::Losers { usernames, .. } => {
                    if let Some(round) = &reveal {
                        let expected: BTreeSet<String> = round::losing_seats(round)
                            .iter()
                            .filter_map(|seat| last_table.0.get(seat))
                            .map(|seat| seat.0.to_string())
                            .collect();
                        let got: BTreeSet<String> =
                            usernames.iter().map(ToString::to_string).collect();
                        ensure!(expected == got, "LOSERS disagrees with the revealed cards");
                    }
                }
                ServerMessage::Table(view) => last_table = view,
                ServerMessage::Waiting(text) => {
                    if text.ends_with("wins!") {
                        return Ok(text);
                    }
                }
                _ => {}
            }
        }
    })
}

fn seat_of(view: &TableView, username: &Username) -> Result<SeatIndex, Error> {
    view.0
        .iter()
        .find(|(_, seat)| &seat.0 == username)
        .map(|(&id, _)| id)
        .ok_or_else(|| anyhow!("own seat missing from admission snapshot"))
}

#[test]
fn two_player_game_reaches_a_winner() {
    let addr = spawn_server(fast_config(1));

    let alice = play_game(addr, "alice", |_, _, _| Decision::Keep);
    let bob = play_game(addr, "bob", |_, _, _| Decision::Keep);

    let alice_saw = alice.join().unwrap().unwrap();
    let bob_saw = bob.join().unwrap().unwrap();
    assert_eq!(alice_saw, bob_saw);
    assert!(alice_saw == "alice wins!" || alice_saw == "bob wins!");
}

#[test]
fn switch_heavy_three_player_game_stays_consistent() {
    let addr = spawn_server(fast_config(5));

    // Everyone switches whenever asked: the head swaps forward, the middle
    // swaps with the next live seat, the dealer redraws.
    let players = [
        play_game(addr, "ann", |_, _, _| Decision::Switch),
        play_game(addr, "ben", |_, _, _| Decision::Switch),
        play_game(addr, "cam", |_, _, _| Decision::Switch),
    ];

    let mut winners = Vec::new();
    for player in players {
        winners.push(player.join().unwrap().unwrap());
    }
    assert!(winners.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn dealer_switch_draws_a_second_card() {
    let addr = spawn_server(fast_config(1));

    // Only the dealer ever switches; the in-loop checks assert the redraw
    // shows up as a two-card entry judged by its second card.
    let dealer_switches = |_: Card, position: usize, order: &[SeatIndex]| {
        if position == order.len() - 1 {
            Decision::Switch
        } else {
            Decision::Keep
        }
    };
    let alice = play_game(addr, "alice", dealer_switches);
    let bob = play_game(addr, "bob", dealer_switches);

    alice.join().unwrap().unwrap();
    bob.join().unwrap().unwrap();
}

#[test]
fn mid_game_disconnect_resets_everyone() {
    let addr = spawn_server(fast_config(5));

    // alice and bob answer every prompt and watch for the post-abort state:
    // a two-seat table back at four lives after at least one loss, followed
    // by a fresh countdown.
    let observer = |name: &'static str| {
        thread::spawn(move || -> Result<(), Error> {
            let (mut client, _) = Client::connect(Username::new(name), &addr)?;
            let mut losers_seen = false;
            let mut reset_seen = false;
            loop {
                match client.recv()? {
                    ServerMessage::Decision(_) => client.send_decision(Decision::Keep)?,
                    ServerMessage::Losers { .. } => losers_seen = true,
                    ServerMessage::Table(view) => {
                        if losers_seen
                            && view.0.len() == 2
                            && view.0.values().all(|seat| seat.1 == 4)
                        {
                            reset_seen = true;
                        }
                    }
                    ServerMessage::Waiting(text) => {
                        if reset_seen && text.starts_with("game starts in") {
                            return Ok(());
                        }
                    }
                    _ => {}
                }
            }
        })
    };
    let alice = observer("alice");
    let bob = observer("bob");

    // carol plays the first round, then walks away mid-round two.
    let (mut carol, _) = Client::connect(Username::new("carol"), &addr).unwrap();
    let mut losers_seen = false;
    loop {
        match carol.recv().unwrap() {
            ServerMessage::Decision(_) => carol.send_decision(Decision::Keep).unwrap(),
            ServerMessage::Losers { .. } => losers_seen = true,
            ServerMessage::Deal { .. } if losers_seen => break,
            _ => {}
        }
    }
    drop(carol);

    alice.join().unwrap().unwrap();
    bob.join().unwrap().unwrap();
}

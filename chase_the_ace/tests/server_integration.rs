/// Integration tests for connection admission and the lobby
///
/// These tests verify seat assignment, rejection rules, and the
/// countdown lifecycle against a real server on an ephemeral port.
use chase_the_ace::{
    Client,
    game::entities::Username,
    net::messages::ServerMessage,
    server::{Server, ServerConfig},
};
use std::{net::SocketAddr, thread, time::Duration};

fn spawn_server(config: ServerConfig) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0".parse().unwrap(), config).unwrap();
    let addr = server.local_addr().unwrap();
    thread::spawn(move || server.run());
    addr
}

/// A lobby that ticks fast but whose countdown never finishes within a
/// test, so no game starts underneath the assertions.
fn lobby_config() -> ServerConfig {
    ServerConfig {
        countdown_ticks: 1000,
        tick_interval: Duration::from_millis(10),
        deal_pause: Duration::ZERO,
        round_pause: Duration::ZERO,
        decision_timeout: None,
    }
}

/// A lobby whose countdown fires almost immediately.
fn game_config() -> ServerConfig {
    ServerConfig {
        countdown_ticks: 1,
        tick_interval: Duration::from_millis(10),
        deal_pause: Duration::ZERO,
        round_pause: Duration::ZERO,
        decision_timeout: None,
    }
}

fn wait_for_waiting_prefix(client: &mut Client, prefix: &str) {
    loop {
        if let ServerMessage::Waiting(text) = client.recv().unwrap()
            && text.starts_with(prefix)
        {
            return;
        }
    }
}

#[test]
fn admission_returns_table_snapshot() {
    let addr = spawn_server(lobby_config());

    let (_client, view) = Client::connect(Username::new("alice"), &addr).unwrap();

    assert_eq!(view.0.len(), 1);
    let seat = view.0.get(&0).unwrap();
    assert_eq!(seat.0.to_string(), "alice");
    assert_eq!(seat.1, 4);
    assert!(seat.2, "the first player to join becomes the dealer");
}

#[test]
fn second_player_takes_next_seat_without_dealer() {
    let addr = spawn_server(lobby_config());

    let (_alice, _) = Client::connect(Username::new("alice"), &addr).unwrap();
    let (_bob, view) = Client::connect(Username::new("bob"), &addr).unwrap();

    assert_eq!(view.0.len(), 2);
    let seat = view.0.get(&1).unwrap();
    assert_eq!(seat.0.to_string(), "bob");
    assert!(!seat.2);
}

#[test]
fn lone_player_is_told_to_wait() {
    let addr = spawn_server(lobby_config());

    let (mut client, _) = Client::connect(Username::new("alice"), &addr).unwrap();

    wait_for_waiting_prefix(&mut client, "waiting for more players");
}

#[test]
fn two_players_start_the_countdown() {
    let addr = spawn_server(lobby_config());

    let (mut alice, _) = Client::connect(Username::new("alice"), &addr).unwrap();
    let (_bob, _) = Client::connect(Username::new("bob"), &addr).unwrap();

    wait_for_waiting_prefix(&mut alice, "game starts in");
}

#[test]
fn seventh_join_is_rejected_table_full() {
    let addr = spawn_server(lobby_config());

    let mut clients = Vec::new();
    for i in 0..6 {
        clients.push(Client::connect(Username::new(&format!("p{i}")), &addr).unwrap());
    }

    let error = Client::connect(Username::new("late"), &addr).unwrap_err();
    assert!(error.to_string().contains("TABLE_FULL"), "{error}");

    // No table mutation occurred: the first player's snapshots stop at six
    // seats and never mention the rejected name.
    let mut table = clients[0].1.clone();
    for _ in 0..5 {
        table = clients[0].0.recv_table().unwrap();
    }
    assert_eq!(table.0.len(), 6);
    assert!(table.0.values().all(|seat| seat.0.to_string() != "late"));
}

#[test]
fn join_rejected_while_game_running() {
    let addr = spawn_server(game_config());

    let (mut alice, _) = Client::connect(Username::new("alice"), &addr).unwrap();
    let (_bob, _) = Client::connect(Username::new("bob"), &addr).unwrap();

    // Cards going out means the game is running.
    loop {
        if let ServerMessage::Deal { .. } = alice.recv().unwrap() {
            break;
        }
    }

    let error = Client::connect(Username::new("late"), &addr).unwrap_err();
    assert!(error.to_string().contains("GAME_RUNNING"), "{error}");
}

#[test]
fn countdown_cancelled_when_occupancy_drops() {
    let addr = spawn_server(lobby_config());

    let (mut alice, _) = Client::connect(Username::new("alice"), &addr).unwrap();
    let (bob, _) = Client::connect(Username::new("bob"), &addr).unwrap();
    wait_for_waiting_prefix(&mut alice, "game starts in");

    // The broken pipe is noticed on a later countdown broadcast; the
    // countdown cancels and the lobby nags the lone player again.
    drop(bob);
    let table = alice.recv_table().unwrap();
    assert_eq!(table.0.len(), 1);
    wait_for_waiting_prefix(&mut alice, "waiting for more players");
}

//! # Relay Round Example
//!
//! Runs a scripted arson round on a host and a peer, relaying every broadcast
//! through the binary codec the way a real transport would.
//!
//! 1. Both participants build the round from the same roster and agree on the arsonist
//! 2. The arsonist works through the task chain on the host
//! 3. The finale lights a prop, fire spreads, and the peer follows along from relayed bytes
//!
//! Run with: `cargo run --example relay_round`

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use arson_mode::network::codec::encode_message;
use arson_mode::prelude::*;
use arson_mode::{ARSON_TASK_COUNT, BIND_PROP_TASK_INDEX};

/// Always lights the bound prop. No room has a spare prop for spread.
struct AlwaysLit;

impl PropIgniter for AlwaysLit {
    fn ignite_prop_in(&mut self, _room: &RoomId) -> bool {
        false
    }

    fn ignite_prop(&mut self, _prop: &PropId) -> bool {
        true
    }
}

fn build_round() -> Result<ArsonRound, ArsonError> {
    RoundBuilder::new()
        .with_config(ArsonConfig {
            fire_spread_interval: Duration::from_secs(5),
            extinguish_time: Duration::from_secs(10),
            ..ArsonConfig::default()
        })
        .with_room_edges([
            ("Kitchen", "Lobby"),
            ("Kitchen", "Archive"),
            ("Lobby", "Server"),
        ])
        .add_player("alice", PlayerRole::Specialist)?
        .add_player("bob", PlayerRole::Slacker)?
        .add_player("carol", PlayerRole::Specialist)?
        .add_extinguisher("hallway")?
        .start_round()
}

/// Drains `from`, sending its broadcasts to `to`. Returns how many messages crossed.
fn relay(from: &mut ArsonRound, to: &mut ArsonRound) -> Result<usize, ArsonError> {
    let messages: Vec<SyncMessage> = from
        .events()
        .filter_map(|event| match event {
            RoundEvent::Broadcast(message) => Some(message),
            _ => None,
        })
        .collect();
    for message in &messages {
        let bytes = encode_message(message)?;
        to.apply_remote_bytes(&bytes)?;
    }
    // The peer never rebroadcasts what it applied.
    let _ = to.events().count();
    Ok(messages.len())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )?;

    let mut host = build_round()?;
    let mut peer = build_round()?;
    assert_eq!(host.arsonists(), peer.arsonists());
    let arsonist = host.arsonists()[0].clone();
    println!("arsonist: {arsonist}");

    let bin = PropId::from("lobby-bin");
    for index in 0..ARSON_TASK_COUNT {
        host.check_task_start(&arsonist, index)?;
        let prop = (index >= BIND_PROP_TASK_INDEX).then_some(&bin);
        let outcome = host.complete_arson_task(&arsonist, index, prop, &mut AlwaysLit);
        println!("task {index}: {outcome:?}");
    }

    // The host engine reports the bin burning in the lobby.
    let lobby = |_: Position| Some(RoomId::from("Lobby"));
    let origin = host.on_prop_fire(Position::new(0.0, 0.0, 0.0), true, &lobby);
    println!("fire started in {origin:?}");

    let mut sent = relay(&mut host, &mut peer)?;
    while !host.engine().is_won() {
        // Every participant ticks its own copy; relayed state is idempotent.
        host.tick(Duration::from_millis(500), &mut NoProps);
        peer.tick(Duration::from_millis(500), &mut NoProps);
        sent += relay(&mut host, &mut peer)?;
    }

    println!(
        "arsonist won after {:.1}s with {} rooms burning; {sent} messages relayed",
        host.elapsed().as_secs_f32(),
        host.engine().burning_count()
    );
    println!(
        "peer burning rooms: {}, peer won: {}",
        peer.engine().burning_count(),
        peer.engine().is_won()
    );
    Ok(())
}

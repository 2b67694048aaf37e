//! Test doubles for the host collaborators and a few ready-made rounds.

// Not every test binary uses every helper.
#![allow(dead_code)]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::collections::BTreeSet;

use arson_mode::{
    ArsonConfig, ArsonRound, PlayerId, PlayerRole, Position, PropId, PropIgniter, RoomGraph,
    RoomId, RoundBuilder, RoundEvent, SyncMessage,
};
use web_time::Duration;

/// Records every ignition request. Rooms in `props` and props in `lit_props` succeed.
#[derive(Debug, Default)]
pub struct RecordingIgniter {
    pub props: BTreeSet<RoomId>,
    pub lit_props: BTreeSet<PropId>,
    pub room_requests: Vec<RoomId>,
    pub prop_requests: Vec<PropId>,
}

impl RecordingIgniter {
    /// An igniter that can light every prop and finds a prop in every room.
    pub fn with_rooms<I: IntoIterator<Item = &'static str>>(rooms: I) -> Self {
        Self {
            props: rooms.into_iter().map(RoomId::from).collect(),
            ..Self::default()
        }
    }

    pub fn lighting(mut self, prop: &str) -> Self {
        self.lit_props.insert(PropId::from(prop));
        self
    }
}

impl PropIgniter for RecordingIgniter {
    fn ignite_prop_in(&mut self, room: &RoomId) -> bool {
        self.room_requests.push(room.clone());
        self.props.contains(room)
    }

    fn ignite_prop(&mut self, prop: &PropId) -> bool {
        self.prop_requests.push(prop.clone());
        self.lit_props.contains(prop)
    }
}

/// Maps the integer part of `x` to a room: 0 → Archive, 1 → Kitchen, 2 → Lobby,
/// 3 → Server. Anything else is outside.
pub fn strip_resolver(position: Position) -> Option<RoomId> {
    let room = match position.x.floor() as i32 {
        0 => "Archive",
        1 => "Kitchen",
        2 => "Lobby",
        3 => "Server",
        _ => return None,
    };
    Some(RoomId::from(room))
}

/// A position inside `room` for [`strip_resolver`].
pub fn position_in(room: &str) -> Position {
    let x = match room {
        "Archive" => 0.5,
        "Kitchen" => 1.5,
        "Lobby" => 2.5,
        "Server" => 3.5,
        _ => -10.0,
    };
    Position::new(x, 0.0, 0.0)
}

/// Archive - Kitchen - Lobby - Server, plus Kitchen - Server.
pub fn office_graph() -> RoomGraph {
    RoomGraph::build([
        ("Archive", "Kitchen"),
        ("Kitchen", "Lobby"),
        ("Lobby", "Server"),
        ("Kitchen", "Server"),
    ])
}

/// Fast settings: spread every 5 s, 10 s grace period, 3 rooms to win.
pub fn fast_config() -> ArsonConfig {
    ArsonConfig {
        fire_spread_interval: Duration::from_secs(5),
        extinguish_time: Duration::from_secs(10),
        rooms_to_win: 3,
        extinguisher_charges: 2,
        extinguisher_respawn_time: Duration::from_secs(30),
        ..ArsonConfig::default()
    }
}

pub fn arsonist() -> PlayerId {
    PlayerId::from("slacker")
}

pub fn worker() -> PlayerId {
    PlayerId::from("worker")
}

/// One slacker (always the arsonist), two specialists and one extinguisher "hall".
pub fn office_round(config: ArsonConfig) -> ArsonRound {
    RoundBuilder::new()
        .with_config(config)
        .with_room_graph(office_graph())
        .add_player("slacker", PlayerRole::Slacker)
        .unwrap()
        .add_player("worker", PlayerRole::Specialist)
        .unwrap()
        .add_player("manager", PlayerRole::Specialist)
        .unwrap()
        .add_extinguisher("hall")
        .unwrap()
        .start_round()
        .unwrap()
}

/// Drives `player` through tasks 0 to 3, binding `bin` at task 3.
pub fn complete_up_to_finale(round: &mut ArsonRound, player: &PlayerId, bin: &str) {
    let bin = PropId::from(bin);
    let mut igniter = RecordingIgniter::default();
    for index in 0..4 {
        round.check_task_start(player, index).unwrap();
        let prop = (index == 3).then_some(&bin);
        let outcome = round.complete_arson_task(player, index, prop, &mut igniter);
        assert!(outcome.is_accepted(), "task {index} rejected: {outcome:?}");
    }
}

pub fn drain(round: &mut ArsonRound) -> Vec<RoundEvent> {
    round.events().collect()
}

pub fn broadcasts(events: &[RoundEvent]) -> Vec<SyncMessage> {
    events
        .iter()
        .filter_map(|event| match event {
            RoundEvent::Broadcast(message) => Some(message.clone()),
            _ => None,
        })
        .collect()
}

pub fn tick_for(round: &mut ArsonRound, total: Duration, step: Duration) {
    let mut igniter = arson_mode::NoProps;
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        round.tick(step, &mut igniter);
        elapsed += step;
    }
}

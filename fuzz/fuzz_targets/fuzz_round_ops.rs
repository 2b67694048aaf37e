//! Fuzz target for arbitrary sequences of round operations.
//!
//! Drives an `ArsonRound` the way a host would (ticks, prop fires, task
//! completions, meetings, extinguishers) with arbitrary arguments.
//!
//! # Safety Properties Tested
//! - No panics on any call sequence
//! - Engine and chain invariants hold after every call
//! - A won round stays won

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use arson_mode::prelude::Duration;
use arson_mode::telemetry::InvariantChecker;
use arson_mode::{
    ArsonConfig, ExtinguisherId, NoProps, PlayerId, PlayerRole, Position, PropId, RoomId,
    RoundBuilder,
};

const ROOMS: [&str; 4] = ["Archive", "Kitchen", "Lobby", "Server"];
const PLAYERS: [&str; 3] = ["p1", "p2", "p3"];

#[derive(Debug, Arbitrary)]
enum Op {
    Tick { ms: u16 },
    PropFire { room: u8, lit: bool },
    CompleteTask { player: u8, index: u8, prop: Option<u8> },
    BeginMeeting,
    EndMeeting { fired: Option<u8> },
    PickUp { player: u8 },
    PutDown,
    Spray { room: u8 },
    StopSpray,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    spread_secs: u8,
    extinguish_secs: u8,
    rooms_to_win: u8,
    pause_in_meetings: bool,
    ops: Vec<Op>,
}

fn resolve(position: Position) -> Option<RoomId> {
    ROOMS
        .get(position.x as usize)
        .map(|room| RoomId::from(*room))
}

fuzz_target!(|input: FuzzInput| {
    let config = ArsonConfig {
        fire_spread_interval: Duration::from_secs(u64::from(input.spread_secs.max(1))),
        extinguish_time: Duration::from_secs(u64::from(input.extinguish_secs.max(1))),
        rooms_to_win: usize::from(input.rooms_to_win % 4) + 1,
        pause_fire_during_meetings: input.pause_in_meetings,
        ..ArsonConfig::default()
    };

    let mut builder = RoundBuilder::new()
        .with_config(config)
        .with_room_edges([("Archive", "Kitchen"), ("Kitchen", "Lobby"), ("Lobby", "Server")]);
    for (i, player) in PLAYERS.iter().enumerate() {
        let role = if i == 0 {
            PlayerRole::Slacker
        } else {
            PlayerRole::Specialist
        };
        builder = builder.add_player(*player, role).expect("distinct players");
    }
    let mut round = builder
        .add_extinguisher("hall")
        .expect("single extinguisher")
        .start_round()
        .expect("valid config");

    let hall = ExtinguisherId::from("hall");
    let player = |n: u8| PlayerId::from(PLAYERS[usize::from(n) % PLAYERS.len()]);
    let room = |n: u8| RoomId::from(ROOMS[usize::from(n) % ROOMS.len()]);

    for op in input.ops {
        let was_won = round.engine().is_won();
        match op {
            Op::Tick { ms } => round.tick(Duration::from_millis(u64::from(ms)), &mut NoProps),
            Op::PropFire { room, lit } => {
                let x = f32::from(room % 4) + 0.5;
                let _ = round.on_prop_fire(Position::new(x, 0.0, 0.0), lit, &resolve);
            },
            Op::CompleteTask {
                player: who,
                index,
                prop,
            } => {
                let prop = prop.map(|n| PropId::new(format!("bin-{}", n % 3)));
                let _ = round.complete_arson_task(
                    &player(who),
                    usize::from(index % 6),
                    prop.as_ref(),
                    &mut NoProps,
                );
            },
            Op::BeginMeeting => round.begin_meeting(),
            Op::EndMeeting { fired } => {
                let fired = fired.map(player);
                let _ = round.end_meeting(fired.as_ref());
            },
            Op::PickUp { player: who } => {
                let _ = round.pick_up_extinguisher(&hall, &player(who));
            },
            Op::PutDown => {
                let _ = round.put_down_extinguisher(&hall);
            },
            Op::Spray { room: target } => {
                let _ = round.start_extinguishing(&hall, &room(target));
            },
            Op::StopSpray => {
                let _ = round.stop_extinguishing(&hall);
            },
        }

        assert!(round.engine().check_invariants().is_ok());
        assert!(round.chain().check_invariants().is_ok());
        if was_won {
            assert!(round.engine().is_won());
        }
        let _ = round.events().count();
    }
});

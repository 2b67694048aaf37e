//! End-to-end round scenarios driven through `RoundBuilder` and `ArsonRound`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

mod common;

use std::sync::Arc;

use arson_mode::network::codec::encode_message;
use arson_mode::telemetry::{CollectingObserver, ViolationKind};
use arson_mode::{
    assert_violation, ArsonConfig, ArsonError, ChainEvent, EnginePhase, ExtinguisherEvent,
    ExtinguisherId, FireEvent, FireState, InvalidRequestKind, Item, NoProps, PlayerId,
    PlayerRole, PropId, RejectReason, RoomId, RoundBuilder, RoundEvent, SyncMessage,
    TaskOutcome,
};
use common::stubs::*;
use web_time::Duration;

const STEP: Duration = Duration::from_secs(1);

fn room(id: &str) -> RoomId {
    RoomId::from(id)
}

fn light(round: &mut arson_mode::ArsonRound, id: &str) {
    assert_eq!(
        round.on_prop_fire(position_in(id), true, &strip_resolver),
        Some(room(id))
    );
}

// ============================================================================
// Chain to win
// ============================================================================

#[test]
fn finale_lights_the_bound_prop_and_fire_wins() {
    let mut round = office_round(fast_config());
    let p = arsonist();
    assert_eq!(round.arsonists(), &[p.clone()]);

    complete_up_to_finale(&mut round, &p, "bin-1");
    round.check_task_start(&p, 4).unwrap();

    let mut igniter = RecordingIgniter::default().lighting("bin-1");
    let outcome = round.complete_arson_task(&p, 4, Some(&PropId::from("bin-1")), &mut igniter);
    assert_eq!(outcome, TaskOutcome::Ignite);
    assert_eq!(igniter.prop_requests, vec![PropId::from("bin-1")]);
    assert!(round.has_finished_chain(&p));
    assert!(!round.inventory().has(&p, Item::LighterFluid));
    assert_eq!(round.engine().burning_count(), 0);

    let completed: Vec<SyncMessage> = broadcasts(&drain(&mut round));
    assert_eq!(
        completed,
        (0..5)
            .map(|index| SyncMessage::ArsonTaskCompleted {
                player: p.clone(),
                index,
            })
            .collect::<Vec<_>>()
    );

    // The host replicates the prop fire back into the round.
    light(&mut round, "Kitchen");
    assert_eq!(round.engine().origin_room(), Some(&room("Kitchen")));

    let mut ticks = 0;
    while !round.engine().is_won() {
        round.tick(STEP, &mut NoProps);
        ticks += 1;
        assert!(ticks <= 30, "arsonist never won");
    }
    let events = drain(&mut round);
    let relayed = broadcasts(&events);
    assert_eq!(relayed[0], SyncMessage::FireIgnited { room: room("Kitchen") });
    assert!(relayed.contains(&SyncMessage::FireSpread { room: room("Archive") }));
    assert!(relayed.contains(&SyncMessage::FireSpread { room: room("Lobby") }));
    assert_eq!(relayed.last(), Some(&SyncMessage::ArsonistWin));
    assert_eq!(round.engine().phase(), EnginePhase::Won);

    let burning = round.engine().burning_count();
    tick_for(&mut round, Duration::from_secs(30), STEP);
    assert_eq!(round.engine().burning_count(), burning);
    assert!(drain(&mut round).is_empty());
}

#[test]
fn finale_on_a_different_prop_is_rejected() {
    let mut round = office_round(fast_config());
    let p = arsonist();
    complete_up_to_finale(&mut round, &p, "bin-1");
    let mut igniter = RecordingIgniter::default().lighting("bin-1").lighting("bin-2");

    let outcome = round.complete_arson_task(&p, 4, Some(&PropId::from("bin-2")), &mut igniter);
    assert_eq!(outcome, TaskOutcome::Rejected(RejectReason::PropMismatch));
    assert!(igniter.prop_requests.is_empty());
    assert!(round.inventory().has(&p, Item::LighterFluid));
    assert_eq!(round.chain().progress(&p), Some(4));

    let outcome = round.complete_arson_task(&p, 4, Some(&PropId::from("bin-1")), &mut igniter);
    assert!(outcome.should_ignite());
}

#[test]
fn bystander_completions_are_cosmetic() {
    let mut round = office_round(fast_config());
    let outcome = round.complete_arson_task(&worker(), 0, None, &mut NoProps);
    assert_eq!(outcome, TaskOutcome::Rejected(RejectReason::NotSaboteur));
    assert!(round.inventory().is_empty());
    assert!(drain(&mut round).is_empty());
}

#[test]
fn cooldown_uses_the_round_clock() {
    let config = ArsonConfig {
        arson_task_cooldown: Duration::from_secs(20),
        ..fast_config()
    };
    let mut round = office_round(config);
    let p = arsonist();

    assert!(round.complete_arson_task(&p, 0, None, &mut NoProps).is_accepted());
    assert!(matches!(
        round.complete_arson_task(&p, 1, None, &mut NoProps),
        TaskOutcome::Rejected(RejectReason::Cooldown { .. })
    ));

    // Meetings do not stop the cooldown.
    round.begin_meeting();
    tick_for(&mut round, Duration::from_secs(20), STEP);
    assert!(round.complete_arson_task(&p, 1, None, &mut NoProps).is_accepted());
}

#[test]
fn finale_without_a_lightable_prop_is_reported() {
    let collector = Arc::new(CollectingObserver::new());
    let mut round = RoundBuilder::new()
        .with_config(fast_config())
        .with_room_graph(office_graph())
        .add_player("slacker", PlayerRole::Slacker)
        .unwrap()
        .with_violation_observer(collector.clone())
        .start_round()
        .unwrap();
    let p = arsonist();
    complete_up_to_finale(&mut round, &p, "bin-1");

    let outcome = round.complete_arson_task(&p, 4, Some(&PropId::from("bin-1")), &mut NoProps);
    assert_eq!(outcome, TaskOutcome::Ignite);
    assert_violation!(collector, ViolationKind::TaskChain);
    assert_eq!(round.engine().burning_count(), 0);
}

// ============================================================================
// Fire episodes
// ============================================================================

#[test]
fn spread_through_a_prop_is_relayed_as_spread() {
    let mut round = office_round(fast_config());
    light(&mut round, "Kitchen");

    let mut igniter = RecordingIgniter::with_rooms(["Archive"]);
    for _ in 0..5 {
        round.tick(STEP, &mut igniter);
    }
    assert_eq!(igniter.room_requests, vec![room("Archive")]);
    assert_eq!(round.engine().room_state("Archive"), Some(FireState::Safe));

    light(&mut round, "Archive");
    let relayed = broadcasts(&drain(&mut round));
    assert_eq!(
        relayed,
        vec![
            SyncMessage::FireIgnited { room: room("Kitchen") },
            SyncMessage::FireSpread { room: room("Archive") },
        ]
    );
}

#[test]
fn putting_out_the_last_fire_resets_the_arsonist_chain() {
    let mut round = office_round(fast_config());
    let p = arsonist();
    complete_up_to_finale(&mut round, &p, "bin-1");
    let mut igniter = RecordingIgniter::default().lighting("bin-1");
    let _ = round.complete_arson_task(&p, 4, Some(&PropId::from("bin-1")), &mut igniter);
    light(&mut round, "Kitchen");
    light(&mut round, "Lobby");
    drain(&mut round);

    round.on_prop_fire(position_in("Kitchen"), false, &strip_resolver);
    assert_eq!(round.engine().room_state("Kitchen"), Some(FireState::Extinguished));
    assert_eq!(round.chain().progress(&p), Some(5));

    round.on_prop_fire(position_in("Lobby"), false, &strip_resolver);
    let events = drain(&mut round);
    let all_clear = events
        .iter()
        .filter(|e| matches!(e, RoundEvent::Fire(FireEvent::AllClear)))
        .count();
    assert_eq!(all_clear, 1);
    assert!(events.contains(&RoundEvent::Chain(ChainEvent::ChainReset { player: p.clone() })));
    assert_eq!(broadcasts(&events).last(), Some(&SyncMessage::AllFiresOut));
    assert_eq!(round.chain().progress(&p), Some(0));
    assert!(round
        .engine()
        .rooms()
        .all(|r| r.state() == FireState::Safe));
}

#[test]
fn prop_fire_outside_every_room_is_ignored() {
    let mut round = office_round(fast_config());
    assert_eq!(
        round.on_prop_fire(position_in("Parking"), true, &strip_resolver),
        None
    );
    assert_eq!(round.engine().burning_count(), 0);
}

// ============================================================================
// Meetings
// ============================================================================

#[test]
fn meetings_freeze_the_fire() {
    let mut round = office_round(fast_config());
    light(&mut round, "Kitchen");
    tick_for(&mut round, Duration::from_secs(3), STEP);

    round.begin_meeting();
    assert!(round.in_meeting());
    tick_for(&mut round, Duration::from_secs(60), STEP);
    assert_eq!(round.engine().burning_count(), 1);
    assert_eq!(round.engine().spread_timer(), Duration::from_secs(3));

    assert!(!round.end_meeting(Some(&worker())));
    tick_for(&mut round, Duration::from_secs(2), STEP);
    assert_eq!(round.engine().room_state("Archive"), Some(FireState::Burning));
}

#[test]
fn meetings_do_not_freeze_fire_when_disabled() {
    let config = ArsonConfig {
        pause_fire_during_meetings: false,
        ..fast_config()
    };
    let mut round = office_round(config);
    light(&mut round, "Kitchen");
    round.begin_meeting();
    tick_for(&mut round, Duration::from_secs(5), STEP);
    assert_eq!(round.engine().burning_count(), 2);
}

#[test]
fn firing_the_arsonist_suppresses_every_fire() {
    let mut round = office_round(fast_config());
    let p = arsonist();
    complete_up_to_finale(&mut round, &p, "bin-1");
    light(&mut round, "Kitchen");
    light(&mut round, "Server");
    drain(&mut round);

    round.begin_meeting();
    assert!(round.end_meeting(Some(&p)));
    let events = drain(&mut round);
    assert!(events.contains(&RoundEvent::Fire(FireEvent::Suppressed)));
    assert!(!events.contains(&RoundEvent::Fire(FireEvent::AllClear)));
    assert_eq!(round.engine().burning_count(), 0);
    assert_eq!(round.engine().phase(), EnginePhase::Inactive);
    // Suppression is not the natural all-clear path.
    assert_eq!(round.chain().progress(&p), Some(4));
}

// ============================================================================
// Extinguishers
// ============================================================================

#[test]
fn extinguisher_puts_out_rooms_until_depleted_then_respawns() {
    let config = ArsonConfig {
        fire_spread_interval: Duration::from_secs(600),
        ..fast_config()
    };
    let mut round = office_round(config);
    let hall = ExtinguisherId::from("hall");
    light(&mut round, "Kitchen");
    light(&mut round, "Lobby");
    drain(&mut round);

    round.pick_up_extinguisher(&hall, &worker()).unwrap();
    round.start_extinguishing(&hall, &room("Kitchen")).unwrap();
    tick_for(&mut round, Duration::from_secs(10), STEP);
    assert_eq!(round.engine().room_state("Kitchen"), Some(FireState::Extinguished));
    assert_eq!(round.extinguisher(&hall).unwrap().charges(), 1);

    let err = round
        .start_extinguishing(&hall, &room("Archive"))
        .unwrap_err();
    assert_eq!(
        err,
        ArsonError::InvalidRequest {
            kind: InvalidRequestKind::RoomNotBurning { room: room("Archive") }
        }
    );

    round.start_extinguishing(&hall, &room("Lobby")).unwrap();
    tick_for(&mut round, Duration::from_secs(10), STEP);
    assert_eq!(round.engine().burning_count(), 0);
    assert!(round.extinguisher(&hall).unwrap().is_depleted());

    let relayed = broadcasts(&drain(&mut round));
    assert_eq!(
        relayed,
        vec![
            SyncMessage::ExtinguisherPickedUp {
                id: hall.clone(),
                player: worker(),
            },
            SyncMessage::FireExtinguished { room: room("Kitchen") },
            SyncMessage::FireExtinguished { room: room("Lobby") },
            SyncMessage::AllFiresOut,
            SyncMessage::ExtinguisherDepleted { id: hall.clone() },
        ]
    );

    tick_for(&mut round, Duration::from_secs(30), STEP);
    assert!(round.extinguisher(&hall).unwrap().is_available());
    assert_eq!(
        broadcasts(&drain(&mut round)),
        vec![SyncMessage::ExtinguisherRespawned { id: hall }]
    );
}

#[test]
fn only_the_depleting_copy_relays_the_respawn() {
    let config = ArsonConfig {
        fire_spread_interval: Duration::from_secs(600),
        ..fast_config()
    };
    let mut host = office_round(config);
    let mut peer = office_round(config);
    let hall = ExtinguisherId::from("hall");
    light(&mut host, "Kitchen");
    light(&mut host, "Lobby");
    host.pick_up_extinguisher(&hall, &worker()).unwrap();
    for target in ["Kitchen", "Lobby"] {
        host.start_extinguishing(&hall, &room(target)).unwrap();
        tick_for(&mut host, Duration::from_secs(10), STEP);
    }
    assert!(host.extinguisher(&hall).unwrap().is_depleted());

    for message in broadcasts(&drain(&mut host)) {
        peer.apply_remote(message);
    }
    assert!(peer.extinguisher(&hall).unwrap().is_depleted());
    drain(&mut peer);

    tick_for(&mut host, Duration::from_secs(30), STEP);
    tick_for(&mut peer, Duration::from_secs(30), STEP);
    assert!(host.extinguisher(&hall).unwrap().is_available());
    assert!(peer.extinguisher(&hall).unwrap().is_available());
    assert_eq!(
        broadcasts(&drain(&mut host)),
        vec![SyncMessage::ExtinguisherRespawned { id: hall.clone() }]
    );
    let peer_events = drain(&mut peer);
    assert!(peer_events.contains(&RoundEvent::Extinguisher(
        ExtinguisherEvent::Respawned { id: hall }
    )));
    assert!(broadcasts(&peer_events).is_empty());
}

#[test]
fn extinguisher_requests_are_validated() {
    let mut round = office_round(fast_config());
    let hall = ExtinguisherId::from("hall");
    let nope = ExtinguisherId::from("nope");

    assert_eq!(
        round.pick_up_extinguisher(&nope, &worker()),
        Err(ArsonError::InvalidRequest {
            kind: InvalidRequestKind::UnknownExtinguisher { id: nope.clone() }
        })
    );
    assert!(matches!(
        round.pick_up_extinguisher(&hall, &PlayerId::from("ghost")),
        Err(ArsonError::UnknownPlayer { .. })
    ));

    round.pick_up_extinguisher(&hall, &worker()).unwrap();
    assert!(round.pick_up_extinguisher(&hall, &arsonist()).is_err());
    assert_eq!(round.put_down_extinguisher(&hall), Ok(Some(worker())));
    round.stop_extinguishing(&hall).unwrap();
}

// ============================================================================
// Relay between participants
// ============================================================================

#[test]
fn relayed_messages_keep_copies_in_agreement() {
    let mut host = office_round(fast_config());
    let mut peer = office_round(fast_config());
    assert_eq!(host.arsonists(), peer.arsonists());

    light(&mut host, "Kitchen");
    tick_for(&mut host, Duration::from_secs(5), STEP);
    host.on_prop_fire(position_in("Kitchen"), false, &strip_resolver);

    for message in broadcasts(&drain(&mut host)) {
        let bytes = encode_message(&message).unwrap();
        peer.apply_remote_bytes(&bytes).unwrap();
    }

    let host_rooms: Vec<_> = host.engine().rooms().map(|r| (r.id().clone(), r.state())).collect();
    let peer_rooms: Vec<_> = peer.engine().rooms().map(|r| (r.id().clone(), r.state())).collect();
    assert_eq!(host_rooms, peer_rooms);
    assert_eq!(peer.engine().room_state("Archive"), Some(FireState::Burning));
    assert!(broadcasts(&drain(&mut peer)).is_empty());
}

#[test]
fn relayed_all_fires_out_follows_the_natural_path() {
    let mut round = office_round(fast_config());
    light(&mut round, "Kitchen");
    light(&mut round, "Lobby");
    drain(&mut round);

    round.apply_remote(SyncMessage::AllFiresOut);
    let events = drain(&mut round);
    assert!(events.contains(&RoundEvent::Fire(FireEvent::AllClear)));
    assert!(broadcasts(&events).is_empty());
}

#[test]
fn suspicious_relay_messages_are_reported() {
    let collector = Arc::new(CollectingObserver::new());
    let mut round = RoundBuilder::new()
        .with_room_graph(office_graph())
        .add_player("slacker", PlayerRole::Slacker)
        .unwrap()
        .with_violation_observer(collector.clone())
        .start_round()
        .unwrap();

    round.apply_remote(SyncMessage::ArsonistWin);
    round.apply_remote(SyncMessage::ExtinguisherDepleted {
        id: ExtinguisherId::from("ghost"),
    });
    assert_violation!(collector, ViolationKind::Relay);
    assert_eq!(collector.violations_of_kind(ViolationKind::Relay).len(), 2);

    let err = round.apply_remote_bytes(&[0xFF, 0xFF, 0xFF, 0x7F]).unwrap_err();
    assert!(matches!(err, ArsonError::SerializationError { .. }));
    assert_eq!(collector.violations_of_kind(ViolationKind::Relay).len(), 3);
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn builder_rejects_duplicates_and_bad_settings() {
    let err = RoundBuilder::new()
        .add_player("p1", PlayerRole::Slacker)
        .unwrap()
        .add_player("p1", PlayerRole::Specialist)
        .unwrap_err();
    assert_eq!(
        err,
        ArsonError::InvalidRequest {
            kind: InvalidRequestKind::DuplicatePlayer {
                player: PlayerId::from("p1")
            }
        }
    );

    assert!(RoundBuilder::new()
        .add_extinguisher("e1")
        .unwrap()
        .add_extinguisher("e1")
        .is_err());

    let bad = ArsonConfig {
        rooms_to_win: 0,
        ..ArsonConfig::default()
    };
    assert!(RoundBuilder::new().with_config(bad).start_round().is_err());
}

#[test]
fn round_without_slackers_has_no_arsonist() {
    let collector = Arc::new(CollectingObserver::new());
    let round = RoundBuilder::new()
        .with_room_graph(office_graph())
        .add_player("a", PlayerRole::Specialist)
        .unwrap()
        .add_player("b", PlayerRole::Specialist)
        .unwrap()
        .with_violation_observer(collector.clone())
        .start_round()
        .unwrap();
    assert!(round.arsonists().is_empty());
    assert_violation!(collector, ViolationKind::Selection);
    assert_eq!(round.chain().saboteurs().count(), 0);
}

#[test]
fn task_lists_are_parallel_except_for_the_finale() {
    let round = office_round(fast_config());
    let normal = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let saboteur = round.task_list(&arsonist(), normal).unwrap();
    let bystander = round.task_list(&worker(), normal).unwrap();
    assert_eq!(saboteur.len(), bystander.len() + 1);

    for (mine, theirs) in saboteur.iter().zip(&bystander) {
        match (mine.as_arson(), theirs.as_arson()) {
            (Some(real), Some(decoy)) => {
                assert_eq!(real.index, decoy.index);
                assert_eq!(real.duration, decoy.duration);
                assert!(real.is_real_arson && !decoy.is_real_arson);
            },
            (None, None) => {},
            other => panic!("slots diverge: {other:?}"),
        }
    }
    assert!(saboteur.iter().any(|t| t.as_arson().is_some_and(|a| a.index == 4)));
    assert!(!bystander.iter().any(|t| t.as_arson().is_some_and(|a| a.index == 4)));

    assert!(matches!(
        round.task_list(&PlayerId::from("ghost"), normal),
        Err(ArsonError::UnknownPlayer { .. })
    ));
}

#[test]
fn task_start_checks_player_and_index() {
    let round = office_round(fast_config());
    assert!(matches!(
        round.check_task_start(&PlayerId::from("ghost"), 0),
        Err(ArsonError::UnknownPlayer { .. })
    ));
    assert_eq!(
        round.check_task_start(&arsonist(), 5),
        Err(ArsonError::InvalidRequest {
            kind: InvalidRequestKind::TaskIndexOutOfRange { index: 5 }
        })
    );
}

//! Determinism tests.
//!
//! Every participant runs its own copy of the round from the same roster and the
//! same relayed events. These tests pin down that identical inputs produce identical
//! selections, spread order and event streams regardless of input order.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use arson_mode::__internal::derive_seed;
use arson_mode::{
    select_arsonists, ArsonConfig, Candidate, FireEngine, FireEvent, NoProps, PlayerId,
    PlayerRole, RoomGraph, RoomId, RoundBuilder,
};
use web_time::Duration;

fn roster() -> Vec<Candidate> {
    vec![
        Candidate::new("dana", PlayerRole::Slacker),
        Candidate::new("alex", PlayerRole::Specialist),
        Candidate::new("chris", PlayerRole::Slacker),
        Candidate::new("blair", PlayerRole::Slacker),
        Candidate::new("erin", PlayerRole::Specialist),
    ]
}

fn office() -> RoomGraph {
    RoomGraph::build([
        ("Kitchen", "Lobby"),
        ("Kitchen", "Archive"),
        ("Kitchen", "Server"),
        ("Lobby", "Server"),
    ])
}

fn config() -> ArsonConfig {
    ArsonConfig {
        fire_spread_interval: Duration::from_secs(5),
        extinguish_time: Duration::from_secs(10),
        rooms_to_win: 3,
        ..ArsonConfig::default()
    }
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn selection_ignores_roster_order() {
    let forward = roster();
    let mut backward = roster();
    backward.reverse();
    let mut rotated = roster();
    rotated.rotate_left(2);

    for count in 0..=4 {
        let expected = select_arsonists(&forward, count);
        assert_eq!(expected, select_arsonists(&backward, count));
        assert_eq!(expected, select_arsonists(&rotated, count));
    }
}

#[test]
fn selection_draws_only_slackers() {
    let selection = select_arsonists(&roster(), 3);
    assert_eq!(selection.eligible_count(), 3);
    assert_eq!(selection.arsonists().len(), 3);
    for id in ["alex", "erin"] {
        assert!(!selection.contains(&PlayerId::from(id)));
    }
}

#[test]
fn seed_is_folded_from_sorted_ids() {
    let ids: Vec<PlayerId> = ["blair", "chris", "dana"]
        .into_iter()
        .map(PlayerId::from)
        .collect();
    let selection = select_arsonists(&roster(), 1);
    assert_eq!(selection.seed(), derive_seed(&ids));
    assert_eq!(derive_seed(std::iter::empty::<&PlayerId>()), 0);
}

#[test]
fn duplicate_candidates_count_once() {
    let mut doubled = roster();
    doubled.extend(roster());
    assert_eq!(
        select_arsonists(&doubled, 2),
        select_arsonists(&roster(), 2)
    );
}

#[test]
fn every_participant_starts_the_same_round() {
    let build = |order: &[Candidate]| {
        let mut builder = RoundBuilder::new().with_room_graph(office());
        for candidate in order {
            builder = builder
                .add_player(candidate.id.clone(), candidate.role)
                .unwrap();
        }
        builder.start_round().unwrap()
    };
    let mut shuffled = roster();
    shuffled.swap(0, 4);
    shuffled.swap(1, 3);

    let a = build(&roster());
    let b = build(&shuffled);
    assert_eq!(a.selection(), b.selection());
    assert_eq!(a.arsonists().len(), 1);
}

// ============================================================================
// Spread order
// ============================================================================

#[test]
fn spread_picks_the_smallest_safe_neighbor() {
    let mut engine = FireEngine::new(office(), config());
    engine.initialize();
    assert!(engine.ignite(&RoomId::from("Kitchen")).is_ignited());
    assert_eq!(engine.spread_target(), Some(RoomId::from("Archive")));

    engine.tick(Duration::from_secs(5), &mut NoProps);
    assert_eq!(engine.spread_target(), Some(RoomId::from("Lobby")));
    engine.tick(Duration::from_secs(5), &mut NoProps);
    assert_eq!(engine.spread_target(), Some(RoomId::from("Server")));
}

#[test]
fn identical_histories_produce_identical_events() {
    let run = || {
        let mut engine = FireEngine::new(office(), config());
        engine.initialize();
        let _ = engine.ignite(&RoomId::from("Lobby"));
        for _ in 0..7 {
            engine.tick(Duration::from_millis(1500), &mut NoProps);
        }
        engine.extinguish(&RoomId::from("Lobby"));
        for _ in 0..7 {
            engine.tick(Duration::from_millis(1500), &mut NoProps);
        }
        engine.events().collect::<Vec<FireEvent>>()
    };
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn tick_granularity_does_not_change_spread_order() {
    let spread_order = |step: Duration, steps: u32| {
        let mut engine = FireEngine::new(office(), config());
        engine.initialize();
        let _ = engine.ignite(&RoomId::from("Kitchen"));
        for _ in 0..steps {
            engine.tick(step, &mut NoProps);
        }
        engine
            .events()
            .filter_map(|event| match event {
                FireEvent::RoomIgnited { room, .. } => Some(room),
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(
        spread_order(Duration::from_secs(1), 10),
        spread_order(Duration::from_millis(250), 40)
    );
}

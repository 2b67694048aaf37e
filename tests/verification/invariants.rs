//! Tests for the `InvariantChecker` implementations and the win countdown edges.
//!
//! # Invariants Tested
//!
//! ## FireEngine
//! - An episode is active exactly while some room burns
//! - No room is left `Extinguished` outside an episode
//! - The win countdown runs exactly while the burning count is at the threshold
//!
//! ## TaskChain
//! - Progress never passes the finale
//! - Bystanders never accumulate progress
//!
//! ## RoomGraph
//! - Adjacency is symmetric and free of self-loops

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use arson_mode::telemetry::{
    CollectingObserver, InvariantChecker, ViolationKind, ViolationSeverity,
};
use arson_mode::{
    assert_no_violations, ArsonConfig, EnginePhase, FireEngine, FireEvent, FireState, NoProps, PlayerId, PropId,
    RoomGraph, RoomId, TaskChain,
};
use web_time::Duration;

fn line_graph() -> RoomGraph {
    RoomGraph::build([("A", "B"), ("B", "C"), ("C", "D")])
}

fn countdown_config() -> ArsonConfig {
    ArsonConfig {
        fire_spread_interval: Duration::from_secs(600),
        extinguish_time: Duration::from_secs(10),
        rooms_to_win: 3,
        ..ArsonConfig::default()
    }
}

fn engine_with(rooms: &[&str]) -> FireEngine {
    let mut engine = FireEngine::new(line_graph(), countdown_config());
    engine.initialize();
    for room in rooms {
        assert!(engine.ignite(&RoomId::from(*room)).is_ignited());
    }
    engine
}

const STEP: Duration = Duration::from_millis(100);

// ============================================================================
// Win countdown edges
// ============================================================================

#[test]
fn third_room_starts_the_countdown() {
    let mut engine = engine_with(&["A", "B"]);
    assert!(engine.win_countdown().is_none());
    assert!(engine.ignite(&RoomId::from("C")).is_ignited());

    let countdown = engine.win_countdown().unwrap();
    assert_eq!(countdown.elapsed(), Duration::ZERO);
    assert_eq!(countdown.deadline(), Duration::from_secs(10));
    assert_eq!(engine.phase(), EnginePhase::WinPending);
    assert!(engine
        .events()
        .any(|e| matches!(e, FireEvent::WinCountdownStarted { .. })));
    engine.check_invariants().unwrap();
}

#[test]
fn extinguishing_just_before_the_deadline_cancels_the_win() {
    let mut engine = engine_with(&["A", "B", "C"]);
    for _ in 0..99 {
        engine.tick(STEP, &mut NoProps);
    }
    assert_eq!(
        engine.win_countdown().unwrap().elapsed(),
        Duration::from_millis(9900)
    );
    assert!(!engine.is_won());

    assert!(engine.extinguish(&RoomId::from("B")));
    assert!(engine.win_countdown().is_none());
    assert!(engine
        .events()
        .any(|e| e == FireEvent::WinCountdownCancelled));

    for _ in 0..200 {
        engine.tick(STEP, &mut NoProps);
    }
    assert!(!engine.is_won());
    assert_eq!(engine.burning_count(), 2);
    engine.check_invariants().unwrap();
}

#[test]
fn uninterrupted_countdown_wins_at_the_deadline() {
    let mut engine = engine_with(&["A", "B", "C"]);
    for _ in 0..99 {
        engine.tick(STEP, &mut NoProps);
    }
    assert!(!engine.is_won());
    engine.tick(STEP, &mut NoProps);
    assert!(engine.is_won());
    assert_eq!(engine.phase(), EnginePhase::Won);
    let wins = engine
        .events()
        .filter(|e| *e == FireEvent::ArsonistWin)
        .count();
    assert_eq!(wins, 1);

    let elapsed = engine.elapsed();
    for _ in 0..50 {
        engine.tick(STEP, &mut NoProps);
    }
    assert!(!engine.extinguish(&RoomId::from("A")));
    assert!(!engine.ignite(&RoomId::from("D")).is_ignited());
    assert_eq!(engine.elapsed(), elapsed);
    assert_eq!(engine.burning_count(), 3);
    assert_eq!(engine.events().count(), 0);
    engine.check_invariants().unwrap();
}

#[test]
fn countdown_restarts_from_zero_after_dipping_below_threshold() {
    let mut engine = engine_with(&["A", "B", "C"]);
    for _ in 0..50 {
        engine.tick(STEP, &mut NoProps);
    }
    engine.extinguish(&RoomId::from("C"));
    assert!(engine.ignite(&RoomId::from("D")).is_ignited());
    assert_eq!(engine.win_countdown().unwrap().elapsed(), Duration::ZERO);
}

#[test]
fn paused_engine_holds_the_countdown() {
    let mut engine = engine_with(&["A", "B", "C"]);
    engine.tick(Duration::from_secs(4), &mut NoProps);
    engine.pause();
    engine.tick(Duration::from_secs(60), &mut NoProps);
    assert_eq!(
        engine.win_countdown().unwrap().elapsed(),
        Duration::from_secs(4)
    );
    engine.resume();
    engine.tick(Duration::from_secs(6), &mut NoProps);
    assert!(engine.is_won());
}

// ============================================================================
// Episode bookkeeping
// ============================================================================

#[test]
fn all_clear_folds_every_room_back_to_safe() {
    let mut engine = engine_with(&["A", "D"]);
    engine.extinguish(&RoomId::from("A"));
    assert_eq!(engine.room_state("A"), Some(FireState::Extinguished));
    engine.check_invariants().unwrap();

    engine.extinguish(&RoomId::from("D"));
    assert!(engine.rooms().all(|r| r.state() == FireState::Safe));
    assert_eq!(engine.origin_room(), None);
    assert_eq!(engine.phase(), EnginePhase::Inactive);
    engine.check_invariants().unwrap();
}

#[test]
fn extinguished_rooms_can_burn_again() {
    let mut engine = engine_with(&["A", "B"]);
    engine.extinguish(&RoomId::from("A"));
    assert!(engine.ignite(&RoomId::from("A")).is_ignited());
    assert_eq!(engine.burning_count(), 2);
    assert_eq!(engine.origin_room(), Some(&RoomId::from("A")));
    engine.check_invariants().unwrap();
}

#[test]
fn unknown_rooms_are_reported_not_fatal() {
    let collector = Arc::new(CollectingObserver::new());
    let mut engine = FireEngine::new(line_graph(), countdown_config());
    engine.set_violation_observer(collector.clone());
    engine.initialize();

    assert!(!engine.ignite(&RoomId::from("Z")).is_ignited());
    assert!(!engine.extinguish(&RoomId::from("Z")));
    assert_eq!(engine.burning_count(), 0);
    assert_eq!(collector.violations_of_kind(ViolationKind::FireEngine).len(), 2);
    assert!(collector
        .violations_at_severity(ViolationSeverity::Critical)
        .is_empty());
}

#[test]
fn empty_graph_engine_is_inert() {
    let mut engine = FireEngine::new(RoomGraph::new(), countdown_config());
    engine.initialize();
    engine.tick(Duration::from_secs(30), &mut NoProps);
    assert_eq!(engine.rooms().count(), 0);
    assert_eq!(engine.spread_target(), None);
    engine.check_invariants().unwrap();
}

#[test]
fn busy_episode_raises_no_violations() {
    let collector = Arc::new(CollectingObserver::new());
    let graph = RoomGraph::build([("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")]);
    let config = ArsonConfig {
        fire_spread_interval: Duration::from_secs(2),
        rooms_to_win: 4,
        ..countdown_config()
    };
    let mut engine = FireEngine::new(graph, config);
    engine.set_violation_observer(collector.clone());
    engine.initialize();

    let _ = engine.ignite(&RoomId::from("C"));
    for step in 0..40 {
        engine.tick(Duration::from_millis(500), &mut NoProps);
        if step % 7 == 0 {
            let next_burning = engine.burning_rooms().next().cloned();
            if let Some(room) = next_burning {
                engine.extinguish(&room);
            }
        }
        engine.check_invariants().unwrap();
    }
    assert_no_violations!(collector);
}

// ============================================================================
// TaskChain and RoomGraph
// ============================================================================

#[test]
fn chain_invariants_hold_through_a_full_run() {
    let mut chain = TaskChain::new(Duration::ZERO);
    let arsonist = PlayerId::from("slacker");
    let bystander = PlayerId::from("worker");
    chain.register_player(arsonist.clone(), true);
    chain.register_player(bystander.clone(), false);
    let bin = PropId::from("bin-1");

    for index in 0..5 {
        let prop = (index >= 3).then_some(&bin);
        assert!(chain
            .complete_task(&arsonist, index, prop, Duration::ZERO)
            .is_accepted());
        let _ = chain.complete_task(&bystander, index, prop, Duration::ZERO);
        chain.check_invariants().unwrap();
    }
    assert_eq!(chain.progress(&arsonist), Some(5));
    assert_eq!(chain.progress(&bystander), None);

    chain.reset_player(&arsonist);
    assert_eq!(chain.bound_prop(&arsonist), None);
    chain.check_invariants().unwrap();
}

#[test]
fn graph_stays_symmetric_when_built_from_messy_edges() {
    let graph = RoomGraph::build([
        ("A", "B"),
        ("B", "A"),
        ("C", "C"),
        ("", "D"),
        ("B", "C"),
    ]);
    graph.check_invariants().unwrap();
    assert_eq!(graph.edge_count(), 2);
    assert!(!graph.contains("D"));
    assert!(graph.are_adjacent("C", "B"));
}

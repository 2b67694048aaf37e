//! Property-based tests for the fire engine, the task chain and arsonist selection.
//!
//! # Properties Tested
//!
//! - Random ignite/extinguish/tick/suppress sequences keep the engine invariants
//! - A won engine never changes again
//! - At most one `AllClear` per episode, and only when the last fire goes out
//! - Selection is independent of roster order and never picks ineligible players
//! - Arbitrary completion attempts never push a chain out of bounds

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use arson_mode::telemetry::InvariantChecker;
use arson_mode::{
    select_arsonists, ArsonConfig, Candidate, FireEngine, FireEvent, FireState, NoProps,
    PlayerId, PlayerRole, PropId, RoomGraph, RoomId, TaskChain,
};
use proptest::prelude::*;
use web_time::Duration;

const ROOMS: [&str; 6] = ["Archive", "Kitchen", "Lobby", "Reception", "Server", "Storage"];

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum EngineOp {
    Ignite(usize),
    Extinguish(usize),
    Tick(u64),
    ExtinguishAll,
    Pause,
    Resume,
}

fn engine_op() -> impl Strategy<Value = EngineOp> {
    prop_oneof![
        3 => (0..ROOMS.len()).prop_map(EngineOp::Ignite),
        3 => (0..ROOMS.len()).prop_map(EngineOp::Extinguish),
        4 => (1u64..4_000).prop_map(EngineOp::Tick),
        1 => Just(EngineOp::ExtinguishAll),
        1 => Just(EngineOp::Pause),
        1 => Just(EngineOp::Resume),
    ]
}

fn graph_strategy() -> impl Strategy<Value = RoomGraph> {
    prop::collection::vec((0..ROOMS.len(), 0..ROOMS.len()), 0..12).prop_map(|edges| {
        let mut graph = RoomGraph::new();
        for room in ROOMS {
            graph.add_room(room);
        }
        for (a, b) in edges {
            if a != b {
                graph.add_edge(ROOMS[a], ROOMS[b]);
            }
        }
        graph
    })
}

fn config_strategy() -> impl Strategy<Value = ArsonConfig> {
    (1u64..6, 1u64..12, 1usize..=ROOMS.len()).prop_map(|(spread, extinguish, rooms_to_win)| {
        ArsonConfig {
            fire_spread_interval: Duration::from_secs(spread),
            extinguish_time: Duration::from_secs(extinguish),
            rooms_to_win,
            ..ArsonConfig::default()
        }
    })
}

fn roster_strategy() -> impl Strategy<Value = (Vec<Candidate>, Vec<Candidate>)> {
    prop::collection::vec(("[a-z]{1,6}", any::<bool>()), 0..12).prop_flat_map(|entries| {
        let roster: Vec<Candidate> = entries
            .into_iter()
            .map(|(id, slacker)| {
                let role = if slacker {
                    PlayerRole::Slacker
                } else {
                    PlayerRole::Specialist
                };
                Candidate::new(id, role)
            })
            .collect();
        (Just(roster.clone()), Just(roster).prop_shuffle())
    })
}

fn apply(engine: &mut FireEngine, op: &EngineOp) {
    match op {
        EngineOp::Ignite(i) => {
            let _ = engine.ignite(&RoomId::from(ROOMS[*i]));
        },
        EngineOp::Extinguish(i) => {
            engine.extinguish(&RoomId::from(ROOMS[*i]));
        },
        EngineOp::Tick(ms) => engine.tick(Duration::from_millis(*ms), &mut NoProps),
        EngineOp::ExtinguishAll => engine.extinguish_all(),
        EngineOp::Pause => engine.pause(),
        EngineOp::Resume => engine.resume(),
    }
}

// ============================================================================
// Fire engine
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_sequences_keep_engine_invariants(
        graph in graph_strategy(),
        config in config_strategy(),
        ops in prop::collection::vec(engine_op(), 1..80),
    ) {
        let mut engine = FireEngine::new(graph, config);
        engine.initialize();

        for op in &ops {
            apply(&mut engine, op);
            prop_assert!(engine.check_invariants().is_ok(), "after {:?}", op);
            prop_assert!(engine.burning_count() <= ROOMS.len());
            if engine.burning_count() == 0 {
                prop_assert!(engine.rooms().all(|r| r.state() == FireState::Safe));
            }
        }
    }

    #[test]
    fn won_engine_is_frozen(
        config in config_strategy(),
        ops in prop::collection::vec(engine_op(), 1..40),
    ) {
        let graph = RoomGraph::build([
            ("Archive", "Kitchen"),
            ("Kitchen", "Lobby"),
            ("Lobby", "Reception"),
            ("Reception", "Server"),
            ("Server", "Storage"),
        ]);
        let mut engine = FireEngine::new(graph, config);
        engine.initialize();
        for room in ROOMS {
            let _ = engine.ignite(&RoomId::from(room));
        }
        let deadline = config.extinguish_time;
        engine.tick(deadline, &mut NoProps);
        prop_assert!(engine.is_won());
        let _ = engine.events().count();

        let snapshot: Vec<(RoomId, FireState)> =
            engine.rooms().map(|r| (r.id().clone(), r.state())).collect();
        for op in &ops {
            apply(&mut engine, op);
        }
        let after: Vec<(RoomId, FireState)> =
            engine.rooms().map(|r| (r.id().clone(), r.state())).collect();
        prop_assert_eq!(snapshot, after);
        prop_assert_eq!(engine.events().count(), 0);
    }

    #[test]
    fn all_clear_only_follows_the_last_extinguish(
        graph in graph_strategy(),
        config in config_strategy(),
        ops in prop::collection::vec(engine_op(), 1..80),
    ) {
        let mut engine = FireEngine::new(graph, config);
        engine.initialize();

        for op in &ops {
            let burning_before = engine.burning_count();
            apply(&mut engine, op);
            let all_clears = engine
                .events()
                .filter(|e| *e == FireEvent::AllClear)
                .count();
            prop_assert!(all_clears <= 1);
            if all_clears == 1 {
                prop_assert!(matches!(op, EngineOp::Extinguish(_)));
                prop_assert_eq!(burning_before, 1);
                prop_assert_eq!(engine.burning_count(), 0);
            }
        }
    }
}

// ============================================================================
// Selection and chain
// ============================================================================

proptest! {
    #[test]
    fn selection_is_order_independent(
        (roster, shuffled) in roster_strategy(),
        count in 0usize..5,
    ) {
        let selection = select_arsonists(&roster, count);
        prop_assert_eq!(&selection, &select_arsonists(&shuffled, count));

        let eligible: std::collections::BTreeSet<&PlayerId> = roster
            .iter()
            .filter(|c| c.role == PlayerRole::Slacker)
            .map(|c| &c.id)
            .collect();
        prop_assert_eq!(selection.eligible_count(), eligible.len());
        prop_assert_eq!(selection.arsonists().len(), count.min(eligible.len()));
        for id in selection.arsonists() {
            prop_assert!(eligible.contains(id));
        }
        let unique: std::collections::BTreeSet<&PlayerId> =
            selection.arsonists().iter().collect();
        prop_assert_eq!(unique.len(), selection.arsonists().len());
    }

    #[test]
    fn chain_survives_arbitrary_attempts(
        attempts in prop::collection::vec(
            (any::<bool>(), 0usize..7, prop::option::of(0u8..3), 0u64..30),
            0..60,
        ),
    ) {
        let mut chain = TaskChain::new(Duration::from_secs(10));
        let arsonist = PlayerId::from("slacker");
        let bystander = PlayerId::from("worker");
        chain.register_player(arsonist.clone(), true);
        chain.register_player(bystander.clone(), false);

        let mut now = Duration::ZERO;
        for (as_arsonist, index, prop, advance) in attempts {
            now += Duration::from_secs(advance);
            let player = if as_arsonist { &arsonist } else { &bystander };
            let prop = prop.map(|n| PropId::new(format!("bin-{n}")));
            let before = chain.progress(player);
            let outcome = chain.complete_task(player, index, prop.as_ref(), now);

            if outcome.is_accepted() {
                prop_assert!(as_arsonist);
                prop_assert_eq!(before, Some(index));
                prop_assert_eq!(chain.progress(player), Some(index + 1));
            } else {
                prop_assert_eq!(chain.progress(player), before);
            }
            prop_assert!(chain.check_invariants().is_ok());
        }
        prop_assert_eq!(chain.progress(&bystander), None);
    }
}

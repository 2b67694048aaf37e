//! Undirected adjacency between rooms.
//!
//! The graph is built once per round from whatever edge source the host has (door
//! connections, nav-mesh portals, a hand-written table) and never changes afterwards.
//! Both maps are ordered so iteration is identical on every participant.

use std::borrow::Borrow;
use std::collections::btree_map::Keys;
use std::collections::{BTreeMap, BTreeSet};

use crate::{debug_check_invariants, report_violation};
use crate::telemetry::{InvariantChecker, InvariantViolation, ViolationKind, ViolationSeverity};
use crate::RoomId;

static NO_NEIGHBORS: BTreeSet<RoomId> = BTreeSet::new();

/// Symmetric room adjacency with no self-loops.
///
/// Queries for unknown rooms return empty results instead of failing.
///
/// # Examples
///
/// ```
/// use arson_mode::RoomGraph;
///
/// let graph = RoomGraph::build([("Kitchen", "Lobby"), ("Lobby", "Archive")]);
///
/// assert!(graph.neighbors("Lobby").contains("Kitchen"));
/// assert!(graph.neighbors("Kitchen").contains("Lobby"));
/// assert!(graph.neighbors("Basement").is_empty());
/// assert_eq!(graph.room_count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomGraph {
    adjacency: BTreeMap<RoomId, BTreeSet<RoomId>>,
}

impl RoomGraph {
    /// Creates a graph with no rooms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from undirected edges.
    ///
    /// Duplicate edges collapse. Self-loops and edges with an empty room id are
    /// skipped and reported as [`ViolationKind::RoomGraph`] warnings. An empty edge
    /// list yields an empty graph, which the fire engine handles without error.
    #[must_use]
    pub fn build<I, A, B>(edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<RoomId>,
        B: Into<RoomId>,
    {
        let mut graph = Self::new();
        for (a, b) in edges {
            graph.add_edge(a, b);
        }
        debug_check_invariants!(graph, "after build");
        graph
    }

    /// Adds a room with no neighbors. Existing rooms are left untouched.
    ///
    /// Useful for single-room maps, where no edge would ever mention the room.
    pub fn add_room(&mut self, room: impl Into<RoomId>) {
        let room = room.into();
        if room.is_empty() {
            report_violation!(
                ViolationSeverity::Warning,
                ViolationKind::RoomGraph,
                "ignored room with an empty id"
            );
            return;
        }
        self.adjacency.entry(room).or_default();
    }

    /// Adds an undirected edge, inserting both endpoints as needed.
    ///
    /// Returns `false` if the edge was rejected or already present.
    pub fn add_edge(&mut self, a: impl Into<RoomId>, b: impl Into<RoomId>) -> bool {
        let (a, b) = (a.into(), b.into());
        if a.is_empty() || b.is_empty() {
            report_violation!(
                ViolationSeverity::Warning,
                ViolationKind::RoomGraph,
                "ignored edge with an empty room id ({:?} <-> {:?})",
                a.as_str(),
                b.as_str()
            );
            return false;
        }
        if a == b {
            report_violation!(
                ViolationSeverity::Warning,
                ViolationKind::RoomGraph,
                "ignored self-loop on room {}",
                a
            );
            return false;
        }

        let inserted = self.adjacency.entry(a.clone()).or_default().insert(b.clone());
        self.adjacency.entry(b).or_default().insert(a);
        inserted
    }

    /// Returns the neighbors of `room`, or an empty set if the room is unknown.
    #[must_use]
    pub fn neighbors<Q>(&self, room: &Q) -> &BTreeSet<RoomId>
    where
        RoomId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.adjacency.get(room).unwrap_or(&NO_NEIGHBORS)
    }

    /// Iterates over every room in ascending id order.
    pub fn all_rooms(&self) -> Keys<'_, RoomId, BTreeSet<RoomId>> {
        self.adjacency.keys()
    }

    /// Returns `true` if `room` is part of the graph.
    #[must_use]
    pub fn contains<Q>(&self, room: &Q) -> bool
    where
        RoomId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.adjacency.contains_key(room)
    }

    /// Returns `true` if `a` and `b` share an edge.
    #[must_use]
    pub fn are_adjacent<Q>(&self, a: &Q, b: &Q) -> bool
    where
        RoomId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.adjacency
            .get(a)
            .is_some_and(|neighbors| neighbors.contains(b))
    }

    /// Number of rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Returns `true` if the graph has no rooms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

impl InvariantChecker for RoomGraph {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (room, neighbors) in &self.adjacency {
            if neighbors.contains(room) {
                return Err(InvariantViolation::new("RoomGraph", "self-loop present")
                    .with_details(format!("room={room}")));
            }
            for neighbor in neighbors {
                if !self.neighbors(neighbor).contains(room) {
                    return Err(
                        InvariantViolation::new("RoomGraph", "adjacency is not symmetric")
                            .with_details(format!("{room} -> {neighbor} has no reverse edge")),
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_symmetric() {
        let graph = RoomGraph::build([("A", "B"), ("B", "C")]);
        assert!(graph.are_adjacent("A", "B"));
        assert!(graph.are_adjacent("B", "A"));
        assert!(!graph.are_adjacent("A", "C"));
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn duplicate_edges_collapse() {
        let graph = RoomGraph::build([("A", "B"), ("B", "A"), ("A", "B")]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors("A").len(), 1);
    }

    #[test]
    fn self_loops_and_empty_ids_are_skipped() {
        let graph = RoomGraph::build([("A", "A"), ("", "B"), ("C", "D")]);
        assert!(!graph.contains("A"));
        assert!(!graph.contains("B"));
        assert_eq!(graph.room_count(), 2);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn empty_edge_list_builds_empty_graph() {
        let graph = RoomGraph::build(Vec::<(&str, &str)>::new());
        assert!(graph.is_empty());
        assert_eq!(graph.all_rooms().count(), 0);
    }

    #[test]
    fn unknown_room_has_no_neighbors() {
        let graph = RoomGraph::build([("A", "B")]);
        assert!(graph.neighbors("Nowhere").is_empty());
        assert!(!graph.are_adjacent("Nowhere", "A"));
    }

    #[test]
    fn isolated_rooms_are_listed() {
        let mut graph = RoomGraph::new();
        graph.add_room("Vault");
        graph.add_room("Vault");
        graph.add_room("");
        assert_eq!(
            graph.all_rooms().cloned().collect::<Vec<_>>(),
            vec![RoomId::from("Vault")]
        );
        assert!(graph.neighbors("Vault").is_empty());
    }

    #[test]
    fn rooms_iterate_in_id_order() {
        let graph = RoomGraph::build([("Lobby", "Kitchen"), ("Archive", "Lobby")]);
        let rooms: Vec<&str> = graph.all_rooms().map(RoomId::as_str).collect();
        assert_eq!(rooms, vec!["Archive", "Kitchen", "Lobby"]);
    }

    #[test]
    fn asymmetric_adjacency_is_detected() {
        let mut graph = RoomGraph::build([("A", "B")]);
        graph
            .adjacency
            .get_mut("B")
            .unwrap()
            .remove(&RoomId::from("A"));
        assert!(graph.check_invariants().is_err());
    }
}

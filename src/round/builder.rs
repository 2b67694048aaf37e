use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::info;

use crate::report_violation_to;
use crate::{
    error::InvalidRequestKind,
    round::session::ArsonRound,
    select_arsonists,
    telemetry::{ViolationKind, ViolationObserver, ViolationSeverity},
    ArsonConfig, ArsonError, Candidate, ExtinguisherId, PlayerId, PlayerRole, RoomGraph, RoomId,
};

/// The [`RoundBuilder`] collects participants, the room graph and extinguishers, then
/// starts an [`ArsonRound`].
///
/// # Examples
///
/// ```
/// use arson_mode::{PlayerRole, RoundBuilder};
///
/// let round = RoundBuilder::new()
///     .with_room_edges([("Kitchen", "Lobby"), ("Lobby", "Archive")])
///     .add_player("alice", PlayerRole::Specialist)?
///     .add_player("bob", PlayerRole::Slacker)?
///     .add_extinguisher("hallway")?
///     .start_round()?;
///
/// assert_eq!(round.arsonists().len(), 1);
/// assert!(round.is_arsonist(&"bob".into()));
/// # Ok::<(), arson_mode::ArsonError>(())
/// ```
#[must_use = "RoundBuilder must be consumed by calling start_round"]
pub struct RoundBuilder {
    config: ArsonConfig,
    players: BTreeMap<PlayerId, PlayerRole>,
    graph: RoomGraph,
    extinguishers: BTreeSet<ExtinguisherId>,
    /// Optional observer for violations. Defaults to tracing output.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl std::fmt::Debug for RoundBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            config,
            players,
            graph,
            extinguishers,
            violation_observer,
        } = self;

        f.debug_struct("RoundBuilder")
            .field("config", config)
            .field("players", players)
            .field("rooms", &graph.room_count())
            .field("extinguishers", extinguishers)
            .field("has_violation_observer", &violation_observer.is_some())
            .finish()
    }
}

impl Default for RoundBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundBuilder {
    /// Creates a builder with default settings, no players and an empty room graph.
    pub fn new() -> Self {
        Self {
            config: ArsonConfig::default(),
            players: BTreeMap::new(),
            graph: RoomGraph::new(),
            extinguishers: BTreeSet::new(),
            violation_observer: None,
        }
    }

    /// Replaces the round settings.
    pub fn with_config(mut self, config: ArsonConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a participant with the role they hold before arsonist selection.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::DuplicatePlayer`] if `id` was already added.
    pub fn add_player(
        mut self,
        id: impl Into<PlayerId>,
        role: PlayerRole,
    ) -> Result<Self, ArsonError> {
        let id = id.into();
        if self.players.contains_key(&id) {
            return Err(InvalidRequestKind::DuplicatePlayer { player: id }.into());
        }
        self.players.insert(id, role);
        Ok(self)
    }

    /// Builds the room graph from undirected edges.
    pub fn with_room_edges<I, A, B>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<RoomId>,
        B: Into<RoomId>,
    {
        self.graph = RoomGraph::build(edges);
        self
    }

    /// Uses an already built room graph.
    pub fn with_room_graph(mut self, graph: RoomGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Mounts an extinguisher.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::DuplicateExtinguisher`] if `id` was already added.
    pub fn add_extinguisher(mut self, id: impl Into<ExtinguisherId>) -> Result<Self, ArsonError> {
        let id = id.into();
        if self.extinguishers.contains(&id) {
            return Err(InvalidRequestKind::DuplicateExtinguisher { id }.into());
        }
        self.extinguishers.insert(id);
        Ok(self)
    }

    /// Routes violations to `observer`.
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Validates the settings, selects the arsonists and starts the round.
    ///
    /// Every participant is registered with the task chain, the inventory starts
    /// empty and the fire engine is initialized. A round with no eligible
    /// candidates starts without an arsonist.
    ///
    /// # Errors
    ///
    /// Returns [`ArsonError::InvalidRequest`] if the settings fail
    /// [`ArsonConfig::validate`].
    pub fn start_round(self) -> Result<ArsonRound, ArsonError> {
        self.config.validate()?;

        let candidates: Vec<Candidate> = self
            .players
            .iter()
            .map(|(id, role)| Candidate::new(id.clone(), *role))
            .collect();
        let selection = select_arsonists(&candidates, self.config.arsonist_count);
        if selection.is_empty() {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::Selection,
                "round started without an arsonist: {} players, none eligible",
                self.players.len()
            );
        }
        if self.graph.is_empty() {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::RoomGraph,
                "round started with an empty room graph"
            );
        }

        info!(
            players = self.players.len(),
            rooms = self.graph.room_count(),
            arsonists = selection.arsonists().len(),
            extinguishers = self.extinguishers.len(),
            "arson round starting"
        );
        Ok(ArsonRound::new(
            self.config,
            self.graph,
            self.players,
            selection,
            self.extinguishers,
            self.violation_observer,
        ))
    }
}

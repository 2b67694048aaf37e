//! Fire propagation: per-room fire state, timed spread, and the win countdown.
//!
//! # Lifecycle
//!
//! ```text
//! Room:    Safe ──ignite──▶ Burning ──extinguish──▶ Extinguished
//!            ▲                                           │
//!            └──────── burning count reaches zero ───────┘
//!
//! Engine:  Inactive ──ignite──▶ Active ──count ≥ threshold──▶ WinPending ──deadline──▶ Won
//!             ▲                   │  ▲                            │
//!             └── all clear ──────┘  └──── count < threshold ─────┘
//! ```
//!
//! `Won` is terminal until [`FireEngine::initialize`].
//!
//! # Determinism
//!
//! Every participant runs its own engine. Spread always targets the smallest
//! candidate room id, so all copies agree on the target without negotiating.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, trace};
use web_time::Duration;

use crate::telemetry::{
    InvariantChecker, InvariantViolation, ViolationKind, ViolationObserver, ViolationSeverity,
};
use crate::{debug_check_invariants, report_violation_to};
use crate::{ArsonConfig, EventDrain, PropIgniter, RoomGraph, RoomId};

/// Fire state of a single room.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum FireState {
    /// Not burning.
    #[default]
    Safe,
    /// On fire.
    Burning,
    /// Put out while other rooms are still burning. Folds back to [`FireState::Safe`]
    /// once nothing is burning.
    Extinguished,
}

/// Engine-level phase derived from the room states and the win countdown.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EnginePhase {
    /// No room is burning.
    Inactive,
    /// At least one room is burning, below the win threshold.
    Active,
    /// Enough rooms are burning and the win countdown is running.
    WinPending,
    /// The countdown elapsed. Nothing changes until the next `initialize()`.
    Won,
}

/// A room known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: RoomId,
    state: FireState,
    ignited_at: Option<Duration>,
}

impl Room {
    fn new(id: RoomId) -> Self {
        Self {
            id,
            state: FireState::Safe,
            ignited_at: None,
        }
    }

    /// The room id.
    #[must_use]
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Current fire state.
    #[must_use]
    pub fn state(&self) -> FireState {
        self.state
    }

    /// Engine time at which the room last caught fire, while it is burning.
    #[must_use]
    pub fn ignited_at(&self) -> Option<Duration> {
        self.ignited_at
    }

    fn reset(&mut self) {
        self.state = FireState::Safe;
        self.ignited_at = None;
    }
}

/// Result of [`FireEngine::ignite`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[must_use = "check whether the room actually caught fire"]
pub enum IgniteOutcome {
    /// The room transitioned to [`FireState::Burning`].
    Ignited,
    /// The room was already burning. Nothing changed.
    AlreadyBurning,
    /// The room is not part of the graph. Nothing changed.
    UnknownRoom,
    /// The round is won and the engine ignores further fire changes.
    Frozen,
}

impl IgniteOutcome {
    /// Returns `true` for [`IgniteOutcome::Ignited`].
    #[must_use]
    pub const fn is_ignited(self) -> bool {
        matches!(self, Self::Ignited)
    }
}

/// The running win countdown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WinCountdown {
    elapsed: Duration,
    deadline: Duration,
}

impl WinCountdown {
    /// Creates a countdown at zero.
    #[must_use]
    pub const fn new(deadline: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            deadline,
        }
    }

    /// Time accumulated so far.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Time at which the arsonist wins.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Time left before the deadline.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.elapsed)
    }

    /// Returns `true` once `elapsed >= deadline`.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.deadline
    }

    fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }
}

/// Notifications raised by the engine, drained with [`FireEngine::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireEvent {
    /// A room caught fire at engine time `at`.
    RoomIgnited {
        /// The room that caught fire.
        room: RoomId,
        /// Engine time of the ignition.
        at: Duration,
    },
    /// Spread chose `room` as its next target and asked the prop collaborator to light it.
    SpreadTargeted {
        /// The chosen room.
        room: RoomId,
    },
    /// A burning room was put out.
    RoomExtinguished {
        /// The room that was put out.
        room: RoomId,
    },
    /// The last burning room was put out. Every room is back to [`FireState::Safe`].
    AllClear,
    /// Every fire was suppressed at once by [`FireEngine::extinguish_all`].
    Suppressed,
    /// Enough rooms are burning. The arsonist wins after `deadline` unless the count drops.
    WinCountdownStarted {
        /// Grace period before the win.
        deadline: Duration,
    },
    /// The burning count dropped below the threshold before the deadline.
    WinCountdownCancelled,
    /// The countdown elapsed. The round is over.
    ArsonistWin,
}

/// Owns per-room fire state, the spread timer and the win countdown.
///
/// All operations are synchronous and idempotent: calls that do not apply to the
/// current state are ignored. Timestamps use an internal clock that advances with
/// every unpaused [`tick`](Self::tick).
///
/// # Examples
///
/// ```
/// use arson_mode::{ArsonConfig, FireEngine, FireState, NoProps, RoomGraph, RoomId};
/// use web_time::Duration;
///
/// let graph = RoomGraph::build([("Kitchen", "Lobby")]);
/// let config = ArsonConfig {
///     fire_spread_interval: Duration::from_secs(5),
///     ..ArsonConfig::default()
/// };
/// let mut engine = FireEngine::new(graph, config);
///
/// assert!(engine.ignite(&RoomId::from("Kitchen")).is_ignited());
/// engine.tick(Duration::from_secs(5), &mut NoProps);
/// assert_eq!(engine.room_state("Lobby"), Some(FireState::Burning));
/// ```
pub struct FireEngine {
    graph: RoomGraph,
    rooms: BTreeMap<RoomId, Room>,
    spread_interval: Duration,
    extinguish_time: Duration,
    rooms_to_win: usize,
    clock: Duration,
    spread_timer: Duration,
    episode_active: bool,
    origin_room: Option<RoomId>,
    countdown: Option<WinCountdown>,
    paused: bool,
    won: bool,
    events: VecDeque<FireEvent>,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl std::fmt::Debug for FireEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FireEngine")
            .field("rooms", &self.rooms.len())
            .field("burning", &self.burning_count())
            .field("phase", &self.phase())
            .field("spread_timer", &self.spread_timer)
            .field("countdown", &self.countdown)
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl FireEngine {
    /// Creates an engine for `graph`, with every room [`FireState::Safe`].
    ///
    /// Only the fire settings of `config` are used.
    #[must_use]
    pub fn new(graph: RoomGraph, config: ArsonConfig) -> Self {
        let rooms = graph
            .all_rooms()
            .map(|id| (id.clone(), Room::new(id.clone())))
            .collect();
        Self {
            graph,
            rooms,
            spread_interval: config.fire_spread_interval,
            extinguish_time: config.extinguish_time,
            rooms_to_win: config.rooms_to_win,
            clock: Duration::ZERO,
            spread_timer: Duration::ZERO,
            episode_active: false,
            origin_room: None,
            countdown: None,
            paused: false,
            won: false,
            events: VecDeque::new(),
            violation_observer: None,
        }
    }

    /// Routes violations to `observer` instead of the default tracing output.
    pub fn set_violation_observer(&mut self, observer: Arc<dyn ViolationObserver>) {
        self.violation_observer = Some(observer);
    }

    /// Resets every room to [`FireState::Safe`] and clears all timers, flags and the
    /// win state. Room membership is rebuilt from the graph.
    pub fn initialize(&mut self) {
        self.rooms = self
            .graph
            .all_rooms()
            .map(|id| (id.clone(), Room::new(id.clone())))
            .collect();
        self.clock = Duration::ZERO;
        self.spread_timer = Duration::ZERO;
        self.episode_active = false;
        self.origin_room = None;
        self.countdown = None;
        self.paused = false;
        self.won = false;
        debug!(rooms = self.rooms.len(), "fire engine initialized");
        debug_check_invariants!(self, "after initialize");
    }

    /// Sets `room` on fire.
    ///
    /// Restarts the spread timer so the next spread happens one full interval after
    /// this ignition, and starts an episode if none is active.
    pub fn ignite(&mut self, room: &RoomId) -> IgniteOutcome {
        if self.won {
            trace!(%room, "ignite ignored: round already won");
            return IgniteOutcome::Frozen;
        }
        let clock = self.clock;
        let Some(entry) = self.rooms.get_mut(room) else {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::FireEngine,
                room = room,
                "ignite for unknown room ignored"
            );
            return IgniteOutcome::UnknownRoom;
        };
        if entry.state == FireState::Burning {
            trace!(%room, "ignite ignored: already burning");
            return IgniteOutcome::AlreadyBurning;
        }

        entry.state = FireState::Burning;
        entry.ignited_at = Some(clock);

        if !self.episode_active {
            self.episode_active = true;
            self.origin_room = Some(room.clone());
            info!(%room, "fire episode started");
        }
        self.spread_timer = Duration::ZERO;
        self.events.push_back(FireEvent::RoomIgnited {
            room: room.clone(),
            at: clock,
        });
        debug!(%room, burning = self.burning_count(), "room ignited");

        self.sync_win_countdown();
        debug_check_invariants!(self, "after ignite");
        IgniteOutcome::Ignited
    }

    /// Advances the spread timer and the win countdown by `dt`.
    ///
    /// Does nothing while no episode is active, while paused, or once won. When the
    /// spread timer reaches the interval it resets and one spread step runs: the
    /// smallest `Safe` room id adjacent to a burning room is handed to `igniter`. If
    /// the igniter cannot light a prop there, the room is ignited directly so
    /// propagation never stalls.
    pub fn tick<P: PropIgniter + ?Sized>(&mut self, dt: Duration, igniter: &mut P) {
        if self.paused || self.won {
            return;
        }
        self.clock = self.clock.saturating_add(dt);
        if !self.episode_active {
            return;
        }

        self.spread_timer = self.spread_timer.saturating_add(dt);
        if self.spread_timer >= self.spread_interval {
            self.spread_timer = Duration::ZERO;
            self.spread(igniter);
        }

        self.sync_win_countdown();
        if let Some(countdown) = self.countdown.as_mut() {
            countdown.advance(dt);
            if countdown.is_expired() {
                self.won = true;
                self.events.push_back(FireEvent::ArsonistWin);
                info!(
                    burning = self.burning_count(),
                    "win countdown elapsed: arsonist wins"
                );
            }
        }
        debug_check_invariants!(self, "after tick");
    }

    fn spread<P: PropIgniter + ?Sized>(&mut self, igniter: &mut P) {
        let Some(target) = self.spread_target() else {
            trace!("spread step found no candidate rooms");
            return;
        };

        self.events.push_back(FireEvent::SpreadTargeted {
            room: target.clone(),
        });
        if igniter.ignite_prop_in(&target) {
            debug!(room = %target, "spread requested prop ignition");
        } else {
            debug!(room = %target, "no prop in spread target, tracking state only");
            let _ = self.ignite(&target);
        }
    }

    /// The room the next spread step would target: the smallest `Safe` room id
    /// adjacent to any burning room.
    #[must_use]
    pub fn spread_target(&self) -> Option<RoomId> {
        let candidates: BTreeSet<&RoomId> = self
            .rooms
            .values()
            .filter(|room| room.state == FireState::Burning)
            .flat_map(|room| self.graph.neighbors(&room.id))
            .filter(|id| self.room_state(*id) == Some(FireState::Safe))
            .collect();
        candidates.first().map(|id| (*id).clone())
    }

    /// Puts out a burning room. Returns `false` (and does nothing) unless the room
    /// is currently burning.
    ///
    /// If this was the last burning room, every room folds back to `Safe`, the episode
    /// ends and a single [`FireEvent::AllClear`] is queued.
    pub fn extinguish(&mut self, room: &RoomId) -> bool {
        if self.won {
            trace!(%room, "extinguish ignored: round already won");
            return false;
        }
        let Some(entry) = self.rooms.get_mut(room) else {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::FireEngine,
                room = room,
                "extinguish for unknown room ignored"
            );
            return false;
        };
        if entry.state != FireState::Burning {
            trace!(%room, state = ?entry.state, "extinguish ignored: not burning");
            return false;
        }

        entry.state = FireState::Extinguished;
        entry.ignited_at = None;
        self.events.push_back(FireEvent::RoomExtinguished { room: room.clone() });

        let remaining = self.burning_count();
        debug!(%room, remaining, "room extinguished");
        self.sync_win_countdown();

        if remaining == 0 {
            self.end_episode();
            self.events.push_back(FireEvent::AllClear);
            info!("all fires out");
        }
        debug_check_invariants!(self, "after extinguish");
        true
    }

    /// Suppresses every fire at once (the arsonist was caught).
    ///
    /// Rooms fold to `Safe` and timers reset, but [`FireEvent::AllClear`] is not
    /// raised: [`FireEvent::Suppressed`] is queued instead. Graph membership is kept.
    /// Does nothing if no room is burning or the round is already won.
    pub fn extinguish_all(&mut self) {
        if self.won || !self.episode_active {
            return;
        }
        if self.countdown.take().is_some() {
            self.events.push_back(FireEvent::WinCountdownCancelled);
        }
        self.end_episode();
        self.events.push_back(FireEvent::Suppressed);
        info!("all fires suppressed");
        debug_check_invariants!(self, "after extinguish_all");
    }

    fn end_episode(&mut self) {
        for room in self.rooms.values_mut() {
            room.reset();
        }
        self.episode_active = false;
        self.origin_room = None;
        self.spread_timer = Duration::ZERO;
        self.countdown = None;
    }

    /// Starts or cancels the countdown so it runs exactly while the burning count is
    /// at or above the threshold.
    fn sync_win_countdown(&mut self) {
        let above = self.burning_count() >= self.rooms_to_win;
        match (above, self.countdown.is_some()) {
            (true, false) => {
                self.countdown = Some(WinCountdown::new(self.extinguish_time));
                self.events.push_back(FireEvent::WinCountdownStarted {
                    deadline: self.extinguish_time,
                });
                info!(
                    burning = self.burning_count(),
                    deadline_ms = self.extinguish_time.as_millis() as u64,
                    "win countdown started"
                );
            },
            (false, true) => {
                self.countdown = None;
                self.events.push_back(FireEvent::WinCountdownCancelled);
                info!(
                    burning = self.burning_count(),
                    "burning count below threshold, win countdown cancelled"
                );
            },
            _ => {},
        }
    }

    /// Freezes spread and countdown advancement. Timers keep their values.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes timer advancement after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns `true` while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// State of `room`, or `None` if it is not part of the graph.
    #[must_use]
    pub fn room_state<Q>(&self, room: &Q) -> Option<FireState>
    where
        RoomId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rooms.get(room).map(Room::state)
    }

    /// Looks up a room.
    #[must_use]
    pub fn room<Q>(&self, room: &Q) -> Option<&Room>
    where
        RoomId: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.rooms.get(room)
    }

    /// Iterates over every room in id order.
    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Number of rooms currently burning.
    #[must_use]
    pub fn burning_count(&self) -> usize {
        self.rooms
            .values()
            .filter(|room| room.state == FireState::Burning)
            .count()
    }

    /// Ids of the rooms currently burning, in id order.
    pub fn burning_rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms
            .values()
            .filter(|room| room.state == FireState::Burning)
            .map(Room::id)
    }

    /// The current engine phase.
    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        if self.won {
            EnginePhase::Won
        } else if self.countdown.is_some() {
            EnginePhase::WinPending
        } else if self.episode_active {
            EnginePhase::Active
        } else {
            EnginePhase::Inactive
        }
    }

    /// Returns `true` while at least one room is burning.
    #[must_use]
    pub fn is_episode_active(&self) -> bool {
        self.episode_active
    }

    /// Returns `true` once the arsonist has won.
    #[must_use]
    pub fn is_won(&self) -> bool {
        self.won
    }

    /// The room that started the current episode.
    #[must_use]
    pub fn origin_room(&self) -> Option<&RoomId> {
        self.origin_room.as_ref()
    }

    /// The running win countdown, if any.
    #[must_use]
    pub fn win_countdown(&self) -> Option<&WinCountdown> {
        self.countdown.as_ref()
    }

    /// Time accumulated towards the next spread step.
    #[must_use]
    pub fn spread_timer(&self) -> Duration {
        self.spread_timer
    }

    /// Unpaused time passed to [`tick`](Self::tick) since the last `initialize()`.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    /// The room graph this engine was built with.
    #[must_use]
    pub fn graph(&self) -> &RoomGraph {
        &self.graph
    }

    /// Number of burning rooms needed to start the win countdown.
    #[must_use]
    pub fn rooms_to_win(&self) -> usize {
        self.rooms_to_win
    }

    /// Drains pending events in the order they were raised.
    pub fn events(&mut self) -> EventDrain<'_, FireEvent> {
        EventDrain::from_drain(self.events.drain(..))
    }
}

impl InvariantChecker for FireEngine {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let burning = self.burning_count();

        if self.episode_active != (burning > 0) {
            return Err(
                InvariantViolation::new("FireEngine", "episode flag disagrees with burning count")
                    .with_details(format!(
                        "episode_active={}, burning={}",
                        self.episode_active, burning
                    )),
            );
        }
        if !self.episode_active && self.rooms.values().any(|r| r.state != FireState::Safe) {
            return Err(InvariantViolation::new(
                "FireEngine",
                "inactive episode with a non-safe room",
            ));
        }
        if self.origin_room.is_some() != self.episode_active {
            return Err(InvariantViolation::new(
                "FireEngine",
                "origin room set outside an episode",
            ));
        }
        if !self.won && self.countdown.is_some() != (burning >= self.rooms_to_win) {
            return Err(
                InvariantViolation::new("FireEngine", "win countdown out of sync with threshold")
                    .with_details(format!(
                        "countdown={:?}, burning={}, threshold={}",
                        self.countdown, burning, self.rooms_to_win
                    )),
            );
        }
        if self.rooms.len() != self.graph.room_count() {
            return Err(InvariantViolation::new(
                "FireEngine",
                "room table does not match graph",
            ));
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
    use crate::telemetry::CollectingObserver;
    use crate::{NoProps, PropId};

    /// Records spread requests and reports success for rooms listed in `with_props`.
    #[derive(Default)]
    struct RecordingIgniter {
        with_props: Vec<RoomId>,
        requested: Vec<RoomId>,
    }

    impl PropIgniter for RecordingIgniter {
        fn ignite_prop_in(&mut self, room: &RoomId) -> bool {
            self.requested.push(room.clone());
            self.with_props.contains(room)
        }

        fn ignite_prop(&mut self, _prop: &PropId) -> bool {
            false
        }
    }

    fn id(s: &str) -> RoomId {
        RoomId::from(s)
    }

    fn config(rooms_to_win: usize, spread_secs: u64, extinguish_secs: u64) -> ArsonConfig {
        ArsonConfig {
            rooms_to_win,
            fire_spread_interval: Duration::from_secs(spread_secs),
            extinguish_time: Duration::from_secs(extinguish_secs),
            ..ArsonConfig::default()
        }
    }

    fn star_engine(rooms_to_win: usize) -> FireEngine {
        let graph = RoomGraph::build([
            ("Hall", "Kitchen"),
            ("Hall", "Lobby"),
            ("Hall", "Archive"),
            ("Lobby", "Office"),
        ]);
        FireEngine::new(graph, config(rooms_to_win, 20, 10))
    }

    #[test]
    fn new_engine_is_inactive_and_safe() {
        let engine = star_engine(3);
        assert_eq!(engine.phase(), EnginePhase::Inactive);
        assert_eq!(engine.burning_count(), 0);
        assert!(engine.rooms().all(|r| r.state() == FireState::Safe));
        assert!(engine.check_invariants().is_ok());
    }

    #[test]
    fn ignite_is_idempotent() {
        let mut engine = star_engine(3);
        engine.tick(Duration::from_secs(1), &mut NoProps);
        assert_eq!(engine.ignite(&id("Hall")), IgniteOutcome::Ignited);
        let first = engine.room("Hall").unwrap().ignited_at();
        let _ = engine.events().count();

        engine.tick(Duration::from_secs(2), &mut NoProps);
        assert_eq!(engine.ignite(&id("Hall")), IgniteOutcome::AlreadyBurning);
        assert_eq!(engine.room("Hall").unwrap().ignited_at(), first);
        assert_eq!(engine.events().count(), 0);
        assert_eq!(engine.burning_count(), 1);
    }

    #[test]
    fn ignite_unknown_room_is_reported_and_ignored() {
        let observer = Arc::new(CollectingObserver::new());
        let mut engine = star_engine(3);
        engine.set_violation_observer(observer.clone());

        assert_eq!(engine.ignite(&id("Attic")), IgniteOutcome::UnknownRoom);
        assert_eq!(engine.phase(), EnginePhase::Inactive);
        assert!(observer.has_violation(ViolationKind::FireEngine));
        assert_eq!(observer.violations()[0].room, Some(id("Attic")));
    }

    #[test]
    fn first_ignition_sets_origin() {
        let mut engine = star_engine(3);
        let _ = engine.ignite(&id("Lobby"));
        let _ = engine.ignite(&id("Hall"));
        assert_eq!(engine.origin_room(), Some(&id("Lobby")));
    }

    #[test]
    fn tick_is_noop_without_episode() {
        let mut engine = star_engine(3);
        let mut igniter = RecordingIgniter::default();
        engine.tick(Duration::from_secs(100), &mut igniter);
        assert!(igniter.requested.is_empty());
        assert_eq!(engine.spread_timer(), Duration::ZERO);
    }

    #[test]
    fn spread_targets_smallest_safe_neighbor() {
        let mut engine = star_engine(5);
        let _ = engine.ignite(&id("Hall"));
        assert_eq!(engine.spread_target(), Some(id("Archive")));

        let mut igniter = RecordingIgniter::default();
        engine.tick(Duration::from_secs(20), &mut igniter);
        assert_eq!(igniter.requested, vec![id("Archive")]);
        assert_eq!(engine.room_state("Archive"), Some(FireState::Burning));
    }

    #[test]
    fn spread_waits_for_prop_ignition_when_prop_exists() {
        let mut engine = star_engine(5);
        let _ = engine.ignite(&id("Hall"));
        let mut igniter = RecordingIgniter {
            with_props: vec![id("Archive")],
            ..RecordingIgniter::default()
        };

        engine.tick(Duration::from_secs(20), &mut igniter);
        assert_eq!(igniter.requested, vec![id("Archive")]);
        assert_eq!(engine.room_state("Archive"), Some(FireState::Safe));

        // The host's prop fire signal arrives later.
        assert!(engine.ignite(&id("Archive")).is_ignited());
    }

    #[test]
    fn spread_timer_restarts_on_ignition() {
        let mut engine = star_engine(5);
        let _ = engine.ignite(&id("Hall"));
        engine.tick(Duration::from_secs(15), &mut NoProps);
        let _ = engine.ignite(&id("Office"));
        assert_eq!(engine.spread_timer(), Duration::ZERO);

        engine.tick(Duration::from_secs(15), &mut NoProps);
        assert_eq!(engine.burning_count(), 2);
        engine.tick(Duration::from_secs(5), &mut NoProps);
        assert_eq!(engine.burning_count(), 3);
    }

    #[test]
    fn spread_with_no_candidates_does_nothing() {
        let graph = RoomGraph::build([("A", "B")]);
        let mut engine = FireEngine::new(graph, config(5, 1, 10));
        let _ = engine.ignite(&id("A"));
        let _ = engine.ignite(&id("B"));
        let _ = engine.events().count();

        engine.tick(Duration::from_secs(1), &mut NoProps);
        assert!(engine.events().all(|e| !matches!(e, FireEvent::SpreadTargeted { .. })));
    }

    #[test]
    fn extinguished_rooms_are_not_spread_targets() {
        let graph = RoomGraph::build([("A", "B"), ("A", "C")]);
        let mut engine = FireEngine::new(graph, config(5, 1, 10));
        let _ = engine.ignite(&id("A"));
        let _ = engine.ignite(&id("B"));
        assert!(engine.extinguish(&id("B")));
        assert_eq!(engine.spread_target(), Some(id("C")));
    }

    #[test]
    fn countdown_starts_on_threshold_and_wins_at_deadline() {
        let mut engine = star_engine(3);
        for room in ["Hall", "Kitchen", "Lobby"] {
            let _ = engine.ignite(&id(room));
        }
        assert_eq!(engine.phase(), EnginePhase::WinPending);
        assert!(engine
            .events()
            .any(|e| e == FireEvent::WinCountdownStarted {
                deadline: Duration::from_secs(10)
            }));

        for _ in 0..99 {
            engine.tick(Duration::from_millis(100), &mut NoProps);
        }
        assert!(!engine.is_won());
        engine.tick(Duration::from_millis(100), &mut NoProps);
        assert!(engine.is_won());
        assert_eq!(engine.phase(), EnginePhase::Won);
        assert!(engine.events().any(|e| e == FireEvent::ArsonistWin));
    }

    #[test]
    fn extinguish_below_threshold_cancels_countdown() {
        let mut engine = star_engine(3);
        for room in ["Hall", "Kitchen", "Lobby"] {
            let _ = engine.ignite(&id(room));
        }
        for _ in 0..99 {
            engine.tick(Duration::from_millis(100), &mut NoProps);
        }
        assert!(engine.extinguish(&id("Kitchen")));
        assert!(engine.win_countdown().is_none());
        assert_eq!(engine.phase(), EnginePhase::Active);

        engine.tick(Duration::from_secs(5), &mut NoProps);
        assert!(!engine.is_won());
    }

    #[test]
    fn won_engine_is_frozen_until_initialize() {
        let graph = RoomGraph::build([("A", "B"), ("B", "C")]);
        let mut engine = FireEngine::new(graph, config(1, 1, 1));
        let _ = engine.ignite(&id("A"));
        engine.tick(Duration::from_millis(500), &mut NoProps);
        engine.tick(Duration::from_millis(500), &mut NoProps);
        assert!(engine.is_won());
        let burning_before = engine.burning_count();
        let _ = engine.events().count();

        engine.tick(Duration::from_secs(30), &mut NoProps);
        assert_eq!(engine.ignite(&id("C")), IgniteOutcome::Frozen);
        assert!(!engine.extinguish(&id("A")));
        engine.extinguish_all();
        assert_eq!(engine.burning_count(), burning_before);
        assert_eq!(engine.events().count(), 0);

        engine.initialize();
        assert_eq!(engine.phase(), EnginePhase::Inactive);
        assert!(engine.ignite(&id("C")).is_ignited());
    }

    #[test]
    fn last_extinguish_folds_to_safe_with_single_all_clear() {
        let mut engine = star_engine(5);
        let _ = engine.ignite(&id("Hall"));
        let _ = engine.ignite(&id("Lobby"));
        assert!(engine.extinguish(&id("Hall")));
        assert_eq!(engine.room_state("Hall"), Some(FireState::Extinguished));
        assert!(engine.extinguish(&id("Lobby")));

        assert!(engine.rooms().all(|r| r.state() == FireState::Safe));
        assert_eq!(engine.phase(), EnginePhase::Inactive);
        assert_eq!(engine.origin_room(), None);
        let all_clear = engine
            .events()
            .filter(|e| *e == FireEvent::AllClear)
            .count();
        assert_eq!(all_clear, 1);
    }

    #[test]
    fn extinguish_non_burning_is_noop() {
        let mut engine = star_engine(3);
        assert!(!engine.extinguish(&id("Hall")));
        let _ = engine.ignite(&id("Hall"));
        let _ = engine.ignite(&id("Lobby"));
        assert!(engine.extinguish(&id("Hall")));
        assert!(!engine.extinguish(&id("Hall")));
        assert!(!engine.extinguish(&id("Kitchen")));
    }

    #[test]
    fn extinguish_all_suppresses_without_all_clear() {
        let mut engine = star_engine(2);
        let _ = engine.ignite(&id("Hall"));
        let _ = engine.ignite(&id("Lobby"));
        let _ = engine.events().count();

        engine.extinguish_all();
        let events: Vec<_> = engine.events().collect();
        assert_eq!(
            events,
            vec![FireEvent::WinCountdownCancelled, FireEvent::Suppressed]
        );
        assert!(engine.rooms().all(|r| r.state() == FireState::Safe));
        assert_eq!(engine.graph().room_count(), 5);
    }

    #[test]
    fn pause_freezes_timers() {
        let mut engine = star_engine(2);
        let _ = engine.ignite(&id("Hall"));
        let _ = engine.ignite(&id("Lobby"));
        engine.tick(Duration::from_secs(4), &mut NoProps);
        engine.pause();
        engine.tick(Duration::from_secs(60), &mut NoProps);
        assert_eq!(
            engine.win_countdown().unwrap().elapsed(),
            Duration::from_secs(4)
        );
        assert_eq!(engine.spread_timer(), Duration::from_secs(4));
        assert!(!engine.is_won());

        engine.resume();
        engine.tick(Duration::from_secs(6), &mut NoProps);
        assert!(engine.is_won());
    }

    #[test]
    fn empty_graph_is_tolerated() {
        let mut engine = FireEngine::new(RoomGraph::new(), ArsonConfig::default());
        engine.initialize();
        assert_eq!(engine.ignite(&id("Anywhere")), IgniteOutcome::UnknownRoom);
        engine.tick(Duration::from_secs(60), &mut NoProps);
        engine.extinguish_all();
        assert_eq!(engine.phase(), EnginePhase::Inactive);
    }

    #[test]
    fn spread_can_start_countdown_and_advance_same_tick() {
        let graph = RoomGraph::build([("A", "B")]);
        let mut engine = FireEngine::new(graph, config(2, 1, 10));
        let _ = engine.ignite(&id("A"));
        engine.tick(Duration::from_secs(1), &mut NoProps);
        assert_eq!(
            engine.win_countdown().unwrap().elapsed(),
            Duration::from_secs(1)
        );
    }
}

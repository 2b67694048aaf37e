//! The arson task chain: five fixed tasks the arsonist completes in order, the last
//! of which ignites the room.
//!
//! Every participant gets the same task slots. The arsonist sees the real labels,
//! everyone else sees a harmless decoy at the same position with the same duration,
//! so watching someone work at the printer proves nothing. The finale has no decoy and
//! only appears on the arsonist's list.
//!
//! [`TaskChain::complete_task`] is the only gate. It enforces strict order, the
//! optional cooldown, and that the finale targets the same prop that was stuffed at
//! [`BIND_PROP_TASK_INDEX`]. Item requirements are checked earlier, before the
//! interaction starts (see [`ArsonRound::check_task_start`](crate::ArsonRound::check_task_start)).

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, trace};
use web_time::Duration;

use crate::telemetry::{InvariantChecker, InvariantViolation};
use crate::{debug_check_invariants, EventDrain, Item, PlayerId, PropId};

/// Number of tasks in the chain.
pub const ARSON_TASK_COUNT: usize = 5;

/// Index of the task that binds a prop for the finale.
pub const BIND_PROP_TASK_INDEX: usize = 3;

/// Index of the finale task, whose completion ignites the bound prop.
pub const FINALE_TASK_INDEX: usize = 4;

/// Ordinary tasks placed before each arson task in a generated list.
pub const TASKS_BETWEEN_ARSON: usize = 2;

/// Where a task is performed.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum TaskLocation {
    /// A ceiling smoke detector.
    SmokeDetector,
    /// An office printer.
    Printer,
    /// The supply closet.
    SupplyCloset,
    /// A trash bin.
    TrashBin,
}

/// How suspicious a task looks to a bystander.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum SuspicionLevel {
    /// Blends in with ordinary work.
    Low,
    /// Odd if watched closely.
    Medium,
    /// Obvious if witnessed.
    High,
}

/// Static description of one arson task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArsonTaskDefinition {
    /// Position in the chain.
    pub index: usize,
    /// Label shown to the arsonist.
    pub arsonist_label: &'static str,
    /// Label shown to everyone else. `None` means the task is never offered to them.
    pub decoy_label: Option<&'static str>,
    /// Where the task takes place.
    pub location: TaskLocation,
    /// How long the interaction lasts.
    pub duration: Duration,
    /// How suspicious the interaction looks.
    pub suspicion: SuspicionLevel,
    /// Item that must be held before the interaction may start.
    pub requires_item: Option<Item>,
    /// Item handed out on completion.
    pub grants_item: Option<Item>,
    /// Whether completing the task visibly changes the prop.
    pub causes_visual_change: bool,
    /// Whether completing the task ignites a room.
    pub is_finale: bool,
    /// Whether the task must target the prop bound at [`BIND_PROP_TASK_INDEX`].
    pub must_match_bound_prop: bool,
}

impl ArsonTaskDefinition {
    /// Label for a participant, or `None` if the task is not offered to them.
    #[must_use]
    pub const fn label_for(&self, is_saboteur: bool) -> Option<&'static str> {
        if is_saboteur {
            Some(self.arsonist_label)
        } else {
            self.decoy_label
        }
    }
}

static DEFINITIONS: [ArsonTaskDefinition; ARSON_TASK_COUNT] = [
    ArsonTaskDefinition {
        index: 0,
        arsonist_label: "Jam the smoke detector",
        decoy_label: Some("Inspect the smoke detector"),
        location: TaskLocation::SmokeDetector,
        duration: Duration::from_secs(4),
        suspicion: SuspicionLevel::Low,
        requires_item: None,
        grants_item: None,
        causes_visual_change: false,
        is_finale: false,
        must_match_bound_prop: false,
    },
    ArsonTaskDefinition {
        index: 1,
        arsonist_label: "Print excessive documents",
        decoy_label: Some("Print compliance documents"),
        location: TaskLocation::Printer,
        duration: Duration::from_secs(5),
        suspicion: SuspicionLevel::Low,
        requires_item: None,
        grants_item: Some(Item::PaperStack),
        causes_visual_change: false,
        is_finale: false,
        must_match_bound_prop: false,
    },
    ArsonTaskDefinition {
        index: 2,
        arsonist_label: "Steal lighter fluid from supply closet",
        decoy_label: Some("Organize the supply closet"),
        location: TaskLocation::SupplyCloset,
        duration: Duration::from_secs(4),
        suspicion: SuspicionLevel::Medium,
        requires_item: None,
        grants_item: Some(Item::LighterFluid),
        causes_visual_change: false,
        is_finale: false,
        must_match_bound_prop: false,
    },
    ArsonTaskDefinition {
        index: 3,
        arsonist_label: "Stuff trash bin with printed documents",
        decoy_label: Some("Empty the recycling bin"),
        location: TaskLocation::TrashBin,
        duration: Duration::from_secs(3),
        suspicion: SuspicionLevel::Medium,
        requires_item: Some(Item::PaperStack),
        grants_item: None,
        causes_visual_change: true,
        is_finale: false,
        must_match_bound_prop: false,
    },
    ArsonTaskDefinition {
        index: 4,
        arsonist_label: "Toss lit cigarette into the trash bin",
        decoy_label: None,
        location: TaskLocation::TrashBin,
        duration: Duration::from_secs(3),
        suspicion: SuspicionLevel::High,
        requires_item: Some(Item::LighterFluid),
        grants_item: None,
        causes_visual_change: false,
        is_finale: true,
        must_match_bound_prop: true,
    },
];

/// All five task definitions, in chain order.
#[must_use]
pub fn definitions() -> &'static [ArsonTaskDefinition; ARSON_TASK_COUNT] {
    &DEFINITIONS
}

/// The definition at `index`, or `None` outside `0..ARSON_TASK_COUNT`.
#[must_use]
pub fn definition_at(index: usize) -> Option<&'static ArsonTaskDefinition> {
    DEFINITIONS.get(index)
}

/// An arson task slot in a participant's task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArsonTask {
    /// Stable task id, `arson_{index}`.
    pub task_id: String,
    /// Position in the chain.
    pub index: usize,
    /// Label shown to this participant.
    pub label: &'static str,
    /// Where the task takes place.
    pub location: TaskLocation,
    /// How long the interaction lasts.
    pub duration: Duration,
    /// `true` for the arsonist's real task.
    pub is_real_arson: bool,
    /// `true` for decoys: the participant must finish it to unlock later tasks.
    pub is_mandatory_gate: bool,
    /// Item required to start. Only set for the arsonist.
    pub requires_item: Option<Item>,
    /// Item granted on completion. Only set for the arsonist.
    pub grants_item: Option<Item>,
}

impl ArsonTask {
    fn from_definition(def: &ArsonTaskDefinition, is_saboteur: bool) -> Option<Self> {
        let label = def.label_for(is_saboteur)?;
        Some(Self {
            task_id: format!("arson_{}", def.index),
            index: def.index,
            label,
            location: def.location,
            duration: def.duration,
            is_real_arson: is_saboteur,
            is_mandatory_gate: !is_saboteur,
            requires_item: def.requires_item.filter(|_| is_saboteur),
            grants_item: def.grants_item.filter(|_| is_saboteur),
        })
    }
}

/// One entry of a generated task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEntry<T> {
    /// A task from the host's ordinary rotation.
    Normal(T),
    /// An arson task or its decoy.
    Arson(ArsonTask),
}

impl<T> TaskEntry<T> {
    /// The arson task, if this entry is one.
    #[must_use]
    pub fn as_arson(&self) -> Option<&ArsonTask> {
        match self {
            Self::Arson(task) => Some(task),
            Self::Normal(_) => None,
        }
    }
}

/// Interleaves the arson tasks into `normal_tasks`, [`TASKS_BETWEEN_ARSON`] ordinary
/// tasks before each arson slot.
///
/// Saboteur and non-saboteur lists built from the same ordinary tasks have arson
/// slots 0 to 3 at identical positions. The finale is appended only for the saboteur.
/// When the ordinary tasks run out, the remaining arson slots follow back to back.
///
/// # Examples
///
/// ```
/// use arson_mode::chain::generate_task_list;
///
/// let saboteur = generate_task_list(true, ["a", "b", "c", "d"]);
/// let bystander = generate_task_list(false, ["a", "b", "c", "d"]);
///
/// assert_eq!(saboteur.len(), 9);
/// assert_eq!(bystander.len(), 8);
/// assert_eq!(saboteur[2].as_arson().map(|t| t.index), Some(0));
/// assert_eq!(bystander[2].as_arson().map(|t| t.index), Some(0));
/// ```
pub fn generate_task_list<T, I>(is_saboteur: bool, normal_tasks: I) -> Vec<TaskEntry<T>>
where
    I: IntoIterator<Item = T>,
{
    let mut normal = normal_tasks.into_iter().peekable();
    let mut list = Vec::new();
    let mut arson = DEFINITIONS.iter();

    loop {
        list.extend(normal.by_ref().take(TASKS_BETWEEN_ARSON).map(TaskEntry::Normal));
        match arson.next() {
            Some(def) => {
                if let Some(task) = ArsonTask::from_definition(def, is_saboteur) {
                    list.push(TaskEntry::Arson(task));
                }
            },
            None if normal.peek().is_none() => break,
            None => {},
        }
    }
    list
}

/// Chain-wide status mirroring the most recently advanced (or reset) player.
///
/// For display only. Per-player progress is authoritative.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum ChainState {
    /// No task accepted yet.
    #[default]
    NotStarted,
    /// At least one task accepted, finale not yet reached.
    InProgress,
    /// A finale was accepted.
    Completed,
    /// A player's chain was reset after the fire was put out.
    Reset,
}

/// Why [`TaskChain::complete_task`] ignored a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The player was never registered.
    UnknownPlayer,
    /// The player is not an arsonist. Their completion is cosmetic.
    NotSaboteur,
    /// The index is not the one the player must complete next.
    OutOfOrder {
        /// The index the chain expects.
        expected: usize,
        /// The index that was submitted.
        got: usize,
    },
    /// The previous accepted task was too recent.
    Cooldown {
        /// Time until the next task may be accepted.
        remaining: Duration,
    },
    /// The finale targeted a different prop than the one bound earlier.
    PropMismatch,
    /// The player already completed the finale.
    ChainComplete,
}

/// Result of [`TaskChain::complete_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an Ignite outcome must be acted upon"]
pub enum TaskOutcome {
    /// Nothing changed.
    Rejected(RejectReason),
    /// The task was accepted. `next_index` is the task now expected.
    Advanced {
        /// Index now expected from this player.
        next_index: usize,
    },
    /// The finale was accepted. The caller must ignite the bound prop.
    Ignite,
}

impl TaskOutcome {
    /// Returns `true` unless the call was rejected.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    /// Returns `true` for [`TaskOutcome::Ignite`].
    #[must_use]
    pub fn should_ignite(&self) -> bool {
        matches!(self, Self::Ignite)
    }
}

/// Notifications raised by the chain, drained with [`TaskChain::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A task was accepted. Relay this to the other participants.
    TaskCompleted {
        /// Who completed it.
        player: PlayerId,
        /// Which task.
        index: usize,
    },
    /// A player's chain went back to the first task.
    ChainReset {
        /// The player whose chain was reset.
        player: PlayerId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlayerArsonState {
    is_saboteur: bool,
    next_index: usize,
    last_completed_at: Option<Duration>,
    bound_prop: Option<PropId>,
}

impl PlayerArsonState {
    fn new(is_saboteur: bool) -> Self {
        Self {
            is_saboteur,
            next_index: 0,
            last_completed_at: None,
            bound_prop: None,
        }
    }
}

/// Per-player arson progress.
///
/// # Examples
///
/// ```
/// use arson_mode::{PlayerId, PropId, TaskChain, TaskOutcome};
/// use web_time::Duration;
///
/// let mut chain = TaskChain::new(Duration::ZERO);
/// let arsonist = PlayerId::from("p1");
/// chain.register_player(arsonist.clone(), true);
///
/// let now = Duration::ZERO;
/// for index in 0..3 {
///     assert!(chain.complete_task(&arsonist, index, None, now).is_accepted());
/// }
/// let bin = PropId::from("bin-7");
/// let _ = chain.complete_task(&arsonist, 3, Some(&bin), now);
/// assert_eq!(chain.complete_task(&arsonist, 4, Some(&bin), now), TaskOutcome::Ignite);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TaskChain {
    players: BTreeMap<PlayerId, PlayerArsonState>,
    cooldown: Duration,
    state: ChainState,
    events: VecDeque<ChainEvent>,
}

impl TaskChain {
    /// Creates an empty chain. A zero `cooldown` disables the cooldown check.
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            ..Self::default()
        }
    }

    /// Registers `player` with progress at the first task.
    ///
    /// Registering an existing player again resets their progress and role.
    pub fn register_player(&mut self, player: PlayerId, is_saboteur: bool) {
        trace!(%player, is_saboteur, "registered for arson chain");
        self.players
            .insert(player, PlayerArsonState::new(is_saboteur));
    }

    /// Returns `true` if `player` was registered.
    #[must_use]
    pub fn is_registered(&self, player: &PlayerId) -> bool {
        self.players.contains_key(player)
    }

    /// Returns `true` if `player` is registered as an arsonist.
    #[must_use]
    pub fn is_saboteur(&self, player: &PlayerId) -> bool {
        self.players.get(player).is_some_and(|s| s.is_saboteur)
    }

    /// Registered arsonists, in id order.
    pub fn saboteurs(&self) -> impl Iterator<Item = &PlayerId> {
        self.players
            .iter()
            .filter(|(_, s)| s.is_saboteur)
            .map(|(id, _)| id)
    }

    /// Submits a completed task.
    ///
    /// `bound_prop` is the prop the player interacted with; it is recorded at
    /// [`BIND_PROP_TASK_INDEX`] and must match at [`FINALE_TASK_INDEX`]. `now` is the
    /// caller's clock, used for the cooldown.
    ///
    /// Rejections never change state or raise events.
    pub fn complete_task(
        &mut self,
        player: &PlayerId,
        index: usize,
        bound_prop: Option<&PropId>,
        now: Duration,
    ) -> TaskOutcome {
        let outcome = self.try_complete(player, index, bound_prop, now);
        match &outcome {
            TaskOutcome::Rejected(reason) => {
                debug!(%player, index, ?reason, "arson task rejected");
            },
            TaskOutcome::Advanced { next_index } => {
                debug!(%player, index, next_index, "arson task accepted");
            },
            TaskOutcome::Ignite => info!(%player, "arson finale accepted"),
        }
        outcome
    }

    fn try_complete(
        &mut self,
        player: &PlayerId,
        index: usize,
        bound_prop: Option<&PropId>,
        now: Duration,
    ) -> TaskOutcome {
        let cooldown = self.cooldown;
        let Some(state) = self.players.get_mut(player) else {
            return TaskOutcome::Rejected(RejectReason::UnknownPlayer);
        };
        if !state.is_saboteur {
            return TaskOutcome::Rejected(RejectReason::NotSaboteur);
        }
        if state.next_index >= ARSON_TASK_COUNT {
            return TaskOutcome::Rejected(RejectReason::ChainComplete);
        }
        if index != state.next_index {
            return TaskOutcome::Rejected(RejectReason::OutOfOrder {
                expected: state.next_index,
                got: index,
            });
        }
        if !cooldown.is_zero() {
            if let Some(last) = state.last_completed_at {
                let since = now.saturating_sub(last);
                if since < cooldown {
                    return TaskOutcome::Rejected(RejectReason::Cooldown {
                        remaining: cooldown - since,
                    });
                }
            }
        }
        let Some(def) = definition_at(index) else {
            return TaskOutcome::Rejected(RejectReason::ChainComplete);
        };
        if def.must_match_bound_prop {
            let matches = matches!(
                (bound_prop, state.bound_prop.as_ref()),
                (Some(submitted), Some(bound)) if submitted == bound
            );
            if !matches {
                return TaskOutcome::Rejected(RejectReason::PropMismatch);
            }
        }

        state.next_index += 1;
        state.last_completed_at = Some(now);
        if index == BIND_PROP_TASK_INDEX {
            state.bound_prop = bound_prop.cloned();
        }
        let next_index = state.next_index;

        self.events.push_back(ChainEvent::TaskCompleted {
            player: player.clone(),
            index,
        });
        let outcome = if def.is_finale {
            self.state = ChainState::Completed;
            TaskOutcome::Ignite
        } else {
            self.state = ChainState::InProgress;
            TaskOutcome::Advanced { next_index }
        };
        debug_check_invariants!(self, "after complete_task");
        outcome
    }

    /// Sends `player` back to the first task and forgets their bound prop and
    /// cooldown. Unknown players are ignored.
    pub fn reset_player(&mut self, player: &PlayerId) {
        let Some(state) = self.players.get_mut(player) else {
            return;
        };
        state.next_index = 0;
        state.last_completed_at = None;
        state.bound_prop = None;
        self.state = ChainState::Reset;
        self.events.push_back(ChainEvent::ChainReset {
            player: player.clone(),
        });
        debug!(%player, "arson chain reset");
    }

    /// Index the arsonist must complete next (`ARSON_TASK_COUNT` once finished), or
    /// `None` for unknown players and non-arsonists.
    #[must_use]
    pub fn progress(&self, player: &PlayerId) -> Option<usize> {
        self.players
            .get(player)
            .filter(|s| s.is_saboteur)
            .map(|s| s.next_index)
    }

    /// The prop recorded at [`BIND_PROP_TASK_INDEX`], if any.
    #[must_use]
    pub fn bound_prop(&self, player: &PlayerId) -> Option<&PropId> {
        self.players.get(player).and_then(|s| s.bound_prop.as_ref())
    }

    /// Chain-wide display state.
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Forgets every player. Used for a full round reset.
    pub fn clear(&mut self) {
        self.players.clear();
        self.state = ChainState::NotStarted;
    }

    /// Drains pending events in the order they were raised.
    pub fn events(&mut self) -> EventDrain<'_, ChainEvent> {
        EventDrain::from_drain(self.events.drain(..))
    }
}

impl InvariantChecker for TaskChain {
    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (player, state) in &self.players {
            if state.next_index > ARSON_TASK_COUNT {
                return Err(InvariantViolation::new("TaskChain", "progress past the finale")
                    .with_details(format!("player={player}, next={}", state.next_index)));
            }
            if !state.is_saboteur && (state.next_index != 0 || state.bound_prop.is_some()) {
                return Err(InvariantViolation::new(
                    "TaskChain",
                    "non-arsonist has chain progress",
                )
                .with_details(format!("player={player}")));
            }
            if state.bound_prop.is_some() && state.next_index <= BIND_PROP_TASK_INDEX {
                return Err(InvariantViolation::new(
                    "TaskChain",
                    "prop bound before the binding task",
                )
                .with_details(format!("player={player}, next={}", state.next_index)));
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

    const T0: Duration = Duration::ZERO;

    fn chain_with(player: &str, is_saboteur: bool) -> (TaskChain, PlayerId) {
        let mut chain = TaskChain::new(Duration::ZERO);
        let id = PlayerId::from(player);
        chain.register_player(id.clone(), is_saboteur);
        (chain, id)
    }

    fn advance_to(chain: &mut TaskChain, player: &PlayerId, target: usize, prop: &PropId) {
        for index in 0..target {
            let outcome = chain.complete_task(player, index, Some(prop), T0);
            assert!(outcome.is_accepted(), "index {index}: {outcome:?}");
        }
    }

    #[test]
    fn definitions_are_ordered_and_only_finale_lacks_decoy() {
        for (i, def) in definitions().iter().enumerate() {
            assert_eq!(def.index, i);
            assert_eq!(def.decoy_label.is_none(), i == FINALE_TASK_INDEX);
            assert_eq!(def.is_finale, i == FINALE_TASK_INDEX);
        }
        assert!(definition_at(ARSON_TASK_COUNT).is_none());
        assert_eq!(definitions()[1].grants_item, Some(Item::PaperStack));
        assert_eq!(definitions()[2].grants_item, Some(Item::LighterFluid));
        assert_eq!(definitions()[3].requires_item, Some(Item::PaperStack));
        assert_eq!(definitions()[4].requires_item, Some(Item::LighterFluid));
    }

    #[test]
    fn task_lists_are_parallel_except_finale() {
        let normal: Vec<u32> = (0..10).collect();
        let saboteur = generate_task_list(true, normal.clone());
        let bystander = generate_task_list(false, normal);

        let slots = |list: &[TaskEntry<u32>]| -> Vec<(usize, usize, Duration)> {
            list.iter()
                .enumerate()
                .filter_map(|(pos, e)| e.as_arson().map(|t| (pos, t.index, t.duration)))
                .collect()
        };
        let s = slots(&saboteur);
        let b = slots(&bystander);
        assert_eq!(s.len(), 5);
        assert_eq!(b.len(), 4);
        assert_eq!(&s[..4], &b[..]);
        assert_eq!(saboteur.len(), 15);
        assert_eq!(bystander.len(), 14);
    }

    #[test]
    fn decoy_entries_hide_items_and_gate_progress() {
        let list = generate_task_list(false, Vec::<u8>::new());
        let tasks: Vec<&ArsonTask> = list.iter().filter_map(TaskEntry::as_arson).collect();
        assert_eq!(tasks.len(), 4);
        for task in tasks {
            assert!(!task.is_real_arson);
            assert!(task.is_mandatory_gate);
            assert!(task.requires_item.is_none());
            assert!(task.grants_item.is_none());
            assert_eq!(task.task_id, format!("arson_{}", task.index));
        }
    }

    #[test]
    fn generated_list_keeps_every_normal_task_in_order() {
        let list = generate_task_list(true, ["a", "b", "c"]);
        let normals: Vec<&str> = list
            .iter()
            .filter_map(|e| match e {
                TaskEntry::Normal(n) => Some(*n),
                TaskEntry::Arson(_) => None,
            })
            .collect();
        assert_eq!(normals, vec!["a", "b", "c"]);
        assert!(matches!(list[0], TaskEntry::Normal("a")));
        assert!(matches!(list[2], TaskEntry::Arson(_)));
    }

    #[test]
    fn unknown_player_is_rejected() {
        let mut chain = TaskChain::new(Duration::ZERO);
        assert_eq!(
            chain.complete_task(&PlayerId::from("ghost"), 0, None, T0),
            TaskOutcome::Rejected(RejectReason::UnknownPlayer)
        );
        assert_eq!(chain.events().len(), 0);
    }

    #[test]
    fn non_saboteur_never_advances() {
        let (mut chain, p) = chain_with("p", false);
        assert_eq!(
            chain.complete_task(&p, 0, None, T0),
            TaskOutcome::Rejected(RejectReason::NotSaboteur)
        );
        assert_eq!(chain.progress(&p), None);
        assert_eq!(chain.state(), ChainState::NotStarted);
        assert_eq!(chain.events().len(), 0);
    }

    #[test]
    fn skip_ahead_and_replay_are_rejected() {
        let (mut chain, p) = chain_with("p", true);
        assert_eq!(
            chain.complete_task(&p, 2, None, T0),
            TaskOutcome::Rejected(RejectReason::OutOfOrder {
                expected: 0,
                got: 2
            })
        );
        assert_eq!(chain.progress(&p), Some(0));

        assert_eq!(
            chain.complete_task(&p, 0, None, T0),
            TaskOutcome::Advanced { next_index: 1 }
        );
        assert!(!chain.complete_task(&p, 0, None, T0).is_accepted());
        assert_eq!(chain.progress(&p), Some(1));
    }

    #[test]
    fn cooldown_applies_only_after_first_completion() {
        let mut chain = TaskChain::new(Duration::from_secs(30));
        let p = PlayerId::from("p");
        chain.register_player(p.clone(), true);

        assert!(chain
            .complete_task(&p, 0, None, Duration::from_secs(1))
            .is_accepted());
        assert_eq!(
            chain.complete_task(&p, 1, None, Duration::from_secs(11)),
            TaskOutcome::Rejected(RejectReason::Cooldown {
                remaining: Duration::from_secs(20)
            })
        );
        assert!(chain
            .complete_task(&p, 1, None, Duration::from_secs(31))
            .is_accepted());
    }

    #[test]
    fn finale_requires_the_bound_prop() {
        let (mut chain, p) = chain_with("p", true);
        let bin_a = PropId::from("A");
        let bin_b = PropId::from("B");
        advance_to(&mut chain, &p, 3, &bin_a);
        assert!(chain.complete_task(&p, 3, Some(&bin_a), T0).is_accepted());
        assert_eq!(chain.bound_prop(&p), Some(&bin_a));
        let _ = chain.events().count();

        assert_eq!(
            chain.complete_task(&p, 4, Some(&bin_b), T0),
            TaskOutcome::Rejected(RejectReason::PropMismatch)
        );
        assert_eq!(
            chain.complete_task(&p, 4, None, T0),
            TaskOutcome::Rejected(RejectReason::PropMismatch)
        );
        assert_eq!(chain.progress(&p), Some(4));
        assert_eq!(chain.events().len(), 0);

        assert_eq!(chain.complete_task(&p, 4, Some(&bin_a), T0), TaskOutcome::Ignite);
        assert_eq!(chain.state(), ChainState::Completed);
        assert_eq!(chain.progress(&p), Some(ARSON_TASK_COUNT));
        assert_eq!(
            chain.complete_task(&p, 4, Some(&bin_a), T0),
            TaskOutcome::Rejected(RejectReason::ChainComplete)
        );
    }

    #[test]
    fn finale_without_binding_can_never_ignite() {
        let (mut chain, p) = chain_with("p", true);
        for index in 0..4 {
            assert!(chain.complete_task(&p, index, None, T0).is_accepted());
        }
        assert_eq!(
            chain.complete_task(&p, 4, Some(&PropId::from("A")), T0),
            TaskOutcome::Rejected(RejectReason::PropMismatch)
        );
    }

    #[test]
    fn accepted_tasks_raise_events_and_mirror_state() {
        let (mut chain, p) = chain_with("p", true);
        let _ = chain.complete_task(&p, 0, None, T0);
        assert_eq!(chain.state(), ChainState::InProgress);
        let events: Vec<_> = chain.events().collect();
        assert_eq!(
            events,
            vec![ChainEvent::TaskCompleted {
                player: p.clone(),
                index: 0
            }]
        );
    }

    #[test]
    fn reset_clears_progress_prop_and_cooldown() {
        let mut chain = TaskChain::new(Duration::from_secs(60));
        let p = PlayerId::from("p");
        chain.register_player(p.clone(), true);
        let bin = PropId::from("bin");
        for (i, t) in (0..4).zip([0u64, 60, 120, 180]) {
            assert!(chain
                .complete_task(&p, i, Some(&bin), Duration::from_secs(t))
                .is_accepted());
        }

        chain.reset_player(&p);
        assert_eq!(chain.progress(&p), Some(0));
        assert_eq!(chain.bound_prop(&p), None);
        assert_eq!(chain.state(), ChainState::Reset);
        assert!(chain
            .complete_task(&p, 0, None, Duration::from_secs(181))
            .is_accepted());
    }

    #[test]
    fn reregistering_resets_progress() {
        let (mut chain, p) = chain_with("p", true);
        let _ = chain.complete_task(&p, 0, None, T0);
        chain.register_player(p.clone(), true);
        assert_eq!(chain.progress(&p), Some(0));
    }

    #[test]
    fn clear_forgets_everyone() {
        let (mut chain, p) = chain_with("p", true);
        chain.clear();
        assert!(!chain.is_registered(&p));
        assert_eq!(chain.saboteurs().count(), 0);
    }
}

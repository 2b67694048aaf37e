use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, trace};
use web_time::Duration;

use crate::chain::{definition_at, generate_task_list, TaskEntry};
use crate::network::codec::decode_message;
use crate::report_violation_to;
use crate::telemetry::{ViolationKind, ViolationObserver, ViolationSeverity};
use crate::{
    error::InvalidRequestKind, ArsonConfig, ArsonError, ChainEvent, EventDrain, Extinguisher,
    ExtinguisherEvent, ExtinguisherId, FireEngine, FireEvent, Inventory, PlayerId, PlayerRole,
    Position, PropId, PropIgniter, RoomGraph, RoomId, RoomResolver, Selection, SyncMessage,
    TaskChain, TaskOutcome, ARSON_TASK_COUNT,
};

/// Everything a round reports to its host, drained with [`ArsonRound::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    /// A fire engine notification.
    Fire(FireEvent),
    /// A task chain notification.
    Chain(ChainEvent),
    /// An extinguisher notification.
    Extinguisher(ExtinguisherEvent),
    /// A message the host should relay to the other participants.
    ///
    /// Never raised while applying a message received from another participant.
    Broadcast(SyncMessage),
}

/// One participant's copy of an arson round.
///
/// Wires the [`FireEngine`], the [`TaskChain`], the shared [`Inventory`] and the
/// extinguishers together:
///
/// - item grants and consumption follow accepted task completions;
/// - a finale asks the prop collaborator to light the bound prop;
/// - putting the last fire out sends every arsonist back to the first task;
/// - meetings pause the fire when configured to, and firing an arsonist suppresses
///   every fire.
///
/// Created by [`RoundBuilder::start_round`](crate::RoundBuilder::start_round).
pub struct ArsonRound {
    config: ArsonConfig,
    engine: FireEngine,
    chain: TaskChain,
    inventory: Inventory,
    players: BTreeMap<PlayerId, PlayerRole>,
    selection: Selection,
    extinguishers: BTreeMap<ExtinguisherId, Extinguisher>,
    clock: Duration,
    in_meeting: bool,
    spread_targets: BTreeSet<RoomId>,
    /// Extinguishers whose depletion this participant relayed. Only these relay
    /// their respawn.
    depleted_here: BTreeSet<ExtinguisherId>,
    events: VecDeque<RoundEvent>,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl std::fmt::Debug for ArsonRound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArsonRound")
            .field("engine", &self.engine)
            .field("players", &self.players.len())
            .field("arsonists", &self.selection.arsonists())
            .field("extinguishers", &self.extinguishers.len())
            .field("clock", &self.clock)
            .field("in_meeting", &self.in_meeting)
            .finish_non_exhaustive()
    }
}

impl ArsonRound {
    pub(crate) fn new(
        config: ArsonConfig,
        graph: RoomGraph,
        players: BTreeMap<PlayerId, PlayerRole>,
        selection: Selection,
        extinguisher_ids: BTreeSet<ExtinguisherId>,
        violation_observer: Option<Arc<dyn ViolationObserver>>,
    ) -> Self {
        let mut engine = FireEngine::new(graph, config);
        if let Some(observer) = &violation_observer {
            engine.set_violation_observer(observer.clone());
        }
        engine.initialize();

        let mut chain = TaskChain::new(config.arson_task_cooldown);
        for id in players.keys() {
            chain.register_player(id.clone(), selection.contains(id));
        }

        let extinguishers = extinguisher_ids
            .into_iter()
            .map(|id| (id.clone(), Extinguisher::new(id, &config)))
            .collect();

        Self {
            config,
            engine,
            chain,
            inventory: Inventory::new(),
            players,
            selection,
            extinguishers,
            clock: Duration::ZERO,
            in_meeting: false,
            spread_targets: BTreeSet::new(),
            depleted_here: BTreeSet::new(),
            events: VecDeque::new(),
            violation_observer,
        }
    }

    /// Advances the fire engine and every extinguisher by `dt`.
    ///
    /// The round clock used for the task cooldown keeps running during meetings.
    pub fn tick<P: PropIgniter + ?Sized>(&mut self, dt: Duration, igniter: &mut P) {
        self.clock = self.clock.saturating_add(dt);
        self.engine.tick(dt, igniter);
        for extinguisher in self.extinguishers.values_mut() {
            extinguisher.tick(dt, &mut self.engine);
        }
        self.pump(true);
    }

    /// Reports that a prop at `position` caught fire (`lit`) or was put out.
    ///
    /// Resolves the room through `resolver` and ignites or extinguishes it. Returns
    /// the resolved room, or `None` if the position is outside every room.
    pub fn on_prop_fire<R: RoomResolver + ?Sized>(
        &mut self,
        position: Position,
        lit: bool,
        resolver: &R,
    ) -> Option<RoomId> {
        let Some(room) = resolver.room_at(position) else {
            trace!(?position, lit, "prop fire outside every room ignored");
            return None;
        };
        if lit {
            let _ = self.engine.ignite(&room);
        } else {
            self.engine.extinguish(&room);
        }
        self.pump(true);
        Some(room)
    }

    /// Checks whether `player` may start the arson task at `index`.
    ///
    /// Call this before letting the interaction begin. Only arsonists need the item a
    /// task requires; decoys never do.
    ///
    /// # Errors
    ///
    /// - [`ArsonError::UnknownPlayer`] if `player` is not in the round.
    /// - [`InvalidRequestKind::TaskIndexOutOfRange`] for an index past the finale.
    /// - [`ArsonError::MissingItem`] if the arsonist lacks the required item.
    pub fn check_task_start(&self, player: &PlayerId, index: usize) -> Result<(), ArsonError> {
        if !self.players.contains_key(player) {
            return Err(ArsonError::UnknownPlayer {
                player: player.clone(),
            });
        }
        let Some(def) = definition_at(index) else {
            return Err(InvalidRequestKind::TaskIndexOutOfRange { index }.into());
        };
        if !self.chain.is_saboteur(player) {
            return Ok(());
        }
        match def.requires_item {
            Some(item) if !self.inventory.has(player, item) => Err(ArsonError::MissingItem {
                player: player.clone(),
                item,
            }),
            _ => Ok(()),
        }
    }

    /// Submits a finished arson task.
    ///
    /// On acceptance the task's item is consumed and its reward granted. An accepted
    /// finale asks `igniter` to light `prop`; the room catches fire once the host
    /// reports the prop fire through [`on_prop_fire`](Self::on_prop_fire).
    pub fn complete_arson_task<P: PropIgniter + ?Sized>(
        &mut self,
        player: &PlayerId,
        index: usize,
        prop: Option<&PropId>,
        igniter: &mut P,
    ) -> TaskOutcome {
        let outcome = self.chain.complete_task(player, index, prop, self.clock);
        if !outcome.is_accepted() {
            return outcome;
        }

        if let Some(def) = definition_at(index) {
            if let Some(item) = def.requires_item {
                self.inventory.remove(player, item);
            }
            if let Some(item) = def.grants_item {
                self.inventory.add(player, item);
                debug!(%player, %item, "item granted");
            }
        }

        if outcome.should_ignite() {
            match prop {
                Some(prop) if igniter.ignite_prop(prop) => {
                    info!(%player, %prop, "arson finale lit its prop");
                },
                _ => {
                    report_violation_to!(
                        &self.violation_observer,
                        ViolationSeverity::Warning,
                        ViolationKind::TaskChain,
                        player = player,
                        "finale accepted but prop {:?} could not be lit",
                        prop.map(PropId::as_str)
                    );
                },
            }
        }
        self.pump(true);
        outcome
    }

    /// Starts a meeting. Pauses the fire if the round is configured to.
    pub fn begin_meeting(&mut self) {
        self.in_meeting = true;
        if self.config.pause_fire_during_meetings {
            self.engine.pause();
        }
        debug!("meeting started");
    }

    /// Ends a meeting and resumes the fire.
    ///
    /// If `fired` names an arsonist every fire is suppressed. Returns `true` when an
    /// arsonist was caught.
    pub fn end_meeting(&mut self, fired: Option<&PlayerId>) -> bool {
        self.in_meeting = false;
        self.engine.resume();

        let caught = fired.is_some_and(|player| self.chain.is_saboteur(player));
        if caught {
            info!(player = ?fired, "arsonist fired, suppressing every fire");
            self.engine.extinguish_all();
        }
        self.pump(true);
        caught
    }

    /// Applies a message relayed from another participant.
    ///
    /// Messages that do not fit the local state are ignored. Remote task completions
    /// are informational: each participant's chain only advances through its own
    /// [`complete_arson_task`](Self::complete_arson_task) calls.
    pub fn apply_remote(&mut self, message: SyncMessage) {
        trace!(?message, "applying relayed message");
        match message {
            SyncMessage::FireIgnited { room } | SyncMessage::FireSpread { room } => {
                let _ = self.engine.ignite(&room);
            },
            SyncMessage::FireExtinguished { room } => {
                self.engine.extinguish(&room);
            },
            SyncMessage::AllFiresOut => {
                let burning: Vec<RoomId> = self.engine.burning_rooms().cloned().collect();
                for room in &burning {
                    self.engine.extinguish(room);
                }
            },
            SyncMessage::ExtinguisherPickedUp { id, player } => {
                if let Some(extinguisher) = self.remote_extinguisher(&id) {
                    if let Err(err) = extinguisher.pick_up(&player) {
                        debug!(%id, %err, "relayed pickup ignored");
                    }
                }
            },
            SyncMessage::ExtinguisherDepleted { id } => {
                if let Some(extinguisher) = self.remote_extinguisher(&id) {
                    extinguisher.deplete();
                }
            },
            SyncMessage::ExtinguisherRespawned { id } => {
                if let Some(extinguisher) = self.remote_extinguisher(&id) {
                    extinguisher.respawn();
                }
            },
            SyncMessage::ArsonTaskCompleted { player, index } => {
                if !self.players.contains_key(&player) {
                    report_violation_to!(
                        &self.violation_observer,
                        ViolationSeverity::Warning,
                        ViolationKind::Relay,
                        player = player,
                        "relayed task completion for unknown player"
                    );
                } else {
                    debug!(%player, index, "remote arson task completed");
                }
            },
            SyncMessage::ArsonistWin => {
                if !self.engine.is_won() {
                    report_violation_to!(
                        &self.violation_observer,
                        ViolationSeverity::Error,
                        ViolationKind::Relay,
                        "relayed win that the local engine has not reached ({} burning)",
                        self.engine.burning_count()
                    );
                }
            },
        }
        self.pump(false);
    }

    /// Decodes and applies a relayed message.
    ///
    /// # Errors
    ///
    /// Returns [`ArsonError::SerializationError`] if `bytes` is not a valid message.
    pub fn apply_remote_bytes(&mut self, bytes: &[u8]) -> Result<(), ArsonError> {
        let message = decode_message(bytes).map_err(|err| {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::Relay,
                "undecodable relay message: {}",
                err
            );
            ArsonError::from(err)
        })?;
        self.apply_remote(message);
        Ok(())
    }

    fn remote_extinguisher(&mut self, id: &ExtinguisherId) -> Option<&mut Extinguisher> {
        if !self.extinguishers.contains_key(id) {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Warning,
                ViolationKind::Relay,
                "relayed message for unknown extinguisher {}",
                id
            );
        }
        self.extinguishers.get_mut(id)
    }

    /// Hands extinguisher `id` to `player`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::UnknownExtinguisher`] for an unknown id, or the
    /// error of [`Extinguisher::pick_up`].
    pub fn pick_up_extinguisher(
        &mut self,
        id: &ExtinguisherId,
        player: &PlayerId,
    ) -> Result<(), ArsonError> {
        if !self.players.contains_key(player) {
            return Err(ArsonError::UnknownPlayer {
                player: player.clone(),
            });
        }
        self.extinguisher_mut(id)?.pick_up(player)?;
        self.pump(true);
        Ok(())
    }

    /// Returns extinguisher `id` to its wall mount.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::UnknownExtinguisher`] for an unknown id.
    pub fn put_down_extinguisher(
        &mut self,
        id: &ExtinguisherId,
    ) -> Result<Option<PlayerId>, ArsonError> {
        let player = self.extinguisher_mut(id)?.put_down();
        self.pump(true);
        Ok(player)
    }

    /// Starts spraying extinguisher `id` at `room`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::UnknownExtinguisher`] for an unknown id, or the
    /// error of [`Extinguisher::start_using`].
    pub fn start_extinguishing(
        &mut self,
        id: &ExtinguisherId,
        room: &RoomId,
    ) -> Result<(), ArsonError> {
        let extinguisher = self
            .extinguishers
            .get_mut(id)
            .ok_or_else(|| InvalidRequestKind::UnknownExtinguisher { id: id.clone() })?;
        extinguisher.start_using(room, &self.engine)
    }

    /// Stops spraying extinguisher `id`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::UnknownExtinguisher`] for an unknown id.
    pub fn stop_extinguishing(&mut self, id: &ExtinguisherId) -> Result<(), ArsonError> {
        self.extinguisher_mut(id)?.stop_using();
        Ok(())
    }

    fn extinguisher_mut(&mut self, id: &ExtinguisherId) -> Result<&mut Extinguisher, ArsonError> {
        self.extinguishers
            .get_mut(id)
            .ok_or_else(|| InvalidRequestKind::UnknownExtinguisher { id: id.clone() }.into())
    }

    /// Builds `player`'s task list with the arson tasks woven into `normal_tasks`.
    ///
    /// # Errors
    ///
    /// Returns [`ArsonError::UnknownPlayer`] if `player` is not in the round.
    pub fn task_list<T, I>(
        &self,
        player: &PlayerId,
        normal_tasks: I,
    ) -> Result<Vec<TaskEntry<T>>, ArsonError>
    where
        I: IntoIterator<Item = T>,
    {
        if !self.players.contains_key(player) {
            return Err(ArsonError::UnknownPlayer {
                player: player.clone(),
            });
        }
        Ok(generate_task_list(
            self.chain.is_saboteur(player),
            normal_tasks,
        ))
    }

    /// Moves queued engine, extinguisher and chain events into the round queue,
    /// applying their cross-component effects. `relay` controls whether
    /// [`RoundEvent::Broadcast`] messages are raised.
    fn pump(&mut self, relay: bool) {
        let fire_events: Vec<FireEvent> = self.engine.events().collect();
        for event in fire_events {
            let message = match &event {
                FireEvent::SpreadTargeted { room } => {
                    self.spread_targets.insert(room.clone());
                    None
                },
                FireEvent::RoomIgnited { room, .. } => {
                    if self.spread_targets.remove(room) {
                        Some(SyncMessage::FireSpread { room: room.clone() })
                    } else {
                        Some(SyncMessage::FireIgnited { room: room.clone() })
                    }
                },
                FireEvent::RoomExtinguished { room } => {
                    Some(SyncMessage::FireExtinguished { room: room.clone() })
                },
                FireEvent::AllClear => {
                    self.spread_targets.clear();
                    self.reset_saboteurs();
                    Some(SyncMessage::AllFiresOut)
                },
                FireEvent::Suppressed => {
                    self.spread_targets.clear();
                    None
                },
                FireEvent::ArsonistWin => Some(SyncMessage::ArsonistWin),
                FireEvent::WinCountdownStarted { .. } | FireEvent::WinCountdownCancelled => None,
            };
            self.events.push_back(RoundEvent::Fire(event));
            if let Some(message) = message.filter(|_| relay) {
                self.events.push_back(RoundEvent::Broadcast(message));
            }
        }

        let mut extinguisher_events = Vec::new();
        for extinguisher in self.extinguishers.values_mut() {
            extinguisher_events.extend(extinguisher.events());
        }
        for event in extinguisher_events {
            let message = match &event {
                ExtinguisherEvent::PickedUp { id, player } => {
                    Some(SyncMessage::ExtinguisherPickedUp {
                        id: id.clone(),
                        player: player.clone(),
                    })
                },
                ExtinguisherEvent::Depleted { id } => {
                    if relay {
                        self.depleted_here.insert(id.clone());
                    } else {
                        self.depleted_here.remove(id);
                    }
                    Some(SyncMessage::ExtinguisherDepleted { id: id.clone() })
                },
                ExtinguisherEvent::Respawned { id } => self
                    .depleted_here
                    .remove(id)
                    .then(|| SyncMessage::ExtinguisherRespawned { id: id.clone() }),
                ExtinguisherEvent::PutDown { .. } | ExtinguisherEvent::RoomPutOut { .. } => None,
            };
            self.events.push_back(RoundEvent::Extinguisher(event));
            if let Some(message) = message.filter(|_| relay) {
                self.events.push_back(RoundEvent::Broadcast(message));
            }
        }

        let chain_events: Vec<ChainEvent> = self.chain.events().collect();
        for event in chain_events {
            let message = match &event {
                ChainEvent::TaskCompleted { player, index } => {
                    Some(SyncMessage::ArsonTaskCompleted {
                        player: player.clone(),
                        index: u8::try_from(*index).unwrap_or(u8::MAX),
                    })
                },
                ChainEvent::ChainReset { .. } => None,
            };
            self.events.push_back(RoundEvent::Chain(event));
            if let Some(message) = message.filter(|_| relay) {
                self.events.push_back(RoundEvent::Broadcast(message));
            }
        }
    }

    fn reset_saboteurs(&mut self) {
        let saboteurs: Vec<PlayerId> = self.chain.saboteurs().cloned().collect();
        for player in &saboteurs {
            self.chain.reset_player(player);
        }
    }

    /// Drains pending events in the order they were raised.
    pub fn events(&mut self) -> EventDrain<'_, RoundEvent> {
        EventDrain::from_drain(self.events.drain(..))
    }

    /// The selected arsonists.
    #[must_use]
    pub fn arsonists(&self) -> &[PlayerId] {
        self.selection.arsonists()
    }

    /// Returns `true` if `player` is an arsonist this round.
    #[must_use]
    pub fn is_arsonist(&self, player: &PlayerId) -> bool {
        self.selection.contains(player)
    }

    /// The role `player` held before selection.
    #[must_use]
    pub fn role(&self, player: &PlayerId) -> Option<PlayerRole> {
        self.players.get(player).copied()
    }

    /// Participants in id order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.players.keys()
    }

    /// The arsonist draw.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The fire engine.
    #[must_use]
    pub fn engine(&self) -> &FireEngine {
        &self.engine
    }

    /// The task chain.
    #[must_use]
    pub fn chain(&self) -> &TaskChain {
        &self.chain
    }

    /// The shared inventory.
    #[must_use]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// An extinguisher by id.
    #[must_use]
    pub fn extinguisher(&self, id: &ExtinguisherId) -> Option<&Extinguisher> {
        self.extinguishers.get(id)
    }

    /// Every extinguisher in id order.
    pub fn extinguishers(&self) -> impl Iterator<Item = &Extinguisher> {
        self.extinguishers.values()
    }

    /// The round settings.
    #[must_use]
    pub fn config(&self) -> &ArsonConfig {
        &self.config
    }

    /// Time passed to [`tick`](Self::tick) since the round started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    /// Returns `true` between [`begin_meeting`](Self::begin_meeting) and
    /// [`end_meeting`](Self::end_meeting).
    #[must_use]
    pub fn in_meeting(&self) -> bool {
        self.in_meeting
    }

    /// Returns `true` once `player` has finished every arson task.
    #[must_use]
    pub fn has_finished_chain(&self, player: &PlayerId) -> bool {
        self.chain.progress(player) == Some(ARSON_TASK_COUNT)
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
    use crate::{Item, NoProps, RoundBuilder};

    fn round() -> ArsonRound {
        RoundBuilder::new()
            .with_room_edges([("Archive", "Kitchen"), ("Kitchen", "Lobby")])
            .add_player("arsonist", PlayerRole::Slacker)
            .unwrap()
            .add_player("worker", PlayerRole::Specialist)
            .unwrap()
            .add_extinguisher("e1")
            .unwrap()
            .start_round()
            .unwrap()
    }

    fn broadcasts(round: &mut ArsonRound) -> Vec<SyncMessage> {
        round
            .events()
            .filter_map(|event| match event {
                RoundEvent::Broadcast(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn only_slacker_is_selected() {
        let round = round();
        assert_eq!(round.arsonists(), &[PlayerId::from("arsonist")]);
        assert!(round.chain().is_saboteur(&PlayerId::from("arsonist")));
        assert!(!round.chain().is_saboteur(&PlayerId::from("worker")));
    }

    #[test]
    fn items_are_granted_and_consumed() {
        let mut round = round();
        let p = PlayerId::from("arsonist");
        let bin = PropId::from("bin");
        for index in 0..3 {
            round.check_task_start(&p, index).unwrap();
            let _ = round.complete_arson_task(&p, index, None, &mut NoProps);
        }
        assert!(round.inventory().has(&p, Item::PaperStack));
        assert!(round.inventory().has(&p, Item::LighterFluid));

        let _ = round.complete_arson_task(&p, 3, Some(&bin), &mut NoProps);
        assert!(!round.inventory().has(&p, Item::PaperStack));
        round.check_task_start(&p, 4).unwrap();
    }

    #[test]
    fn missing_item_blocks_task_start() {
        let round = round();
        let err = round
            .check_task_start(&PlayerId::from("arsonist"), 3)
            .unwrap_err();
        assert_eq!(
            err,
            ArsonError::MissingItem {
                player: PlayerId::from("arsonist"),
                item: Item::PaperStack,
            }
        );
        round.check_task_start(&PlayerId::from("worker"), 3).unwrap();
    }

    #[test]
    fn remote_messages_are_not_rebroadcast() {
        let mut round = round();
        round.apply_remote(SyncMessage::FireIgnited {
            room: RoomId::from("Kitchen"),
        });
        assert_eq!(round.engine().burning_count(), 1);
        assert!(broadcasts(&mut round).is_empty());
    }

    #[test]
    fn local_prop_fire_is_broadcast() {
        let mut round = round();
        let resolver = |_: Position| Some(RoomId::from("Kitchen"));
        round.on_prop_fire(Position::default(), true, &resolver);
        assert_eq!(
            broadcasts(&mut round),
            vec![SyncMessage::FireIgnited {
                room: RoomId::from("Kitchen")
            }]
        );
    }
}

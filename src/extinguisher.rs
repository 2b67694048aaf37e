//! Wall-mounted fire extinguishers.
//!
//! ```text
//! Mounted ──pick_up──▶ Held ──start_using──▶ InUse ──hold for extinguish_time──▶ Held
//!    ▲                  │  ▲                  │                                   │
//!    └──── put_down ────┘  └──── stop_using ──┘                       last charge │
//!    ▲                                                                            ▼
//!    └───────────────────── respawn_time elapsed ───────────────────────── Depleted
//! ```

use std::collections::VecDeque;

use tracing::{debug, info, trace};
use web_time::Duration;

use crate::error::{ArsonError, InvalidRequestKind};
use crate::{ArsonConfig, EventDrain, ExtinguisherId, FireEngine, FireState, PlayerId, RoomId};

/// What an extinguisher is currently doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtinguisherState {
    /// On the wall, available for pickup.
    Mounted,
    /// Carried by `player`.
    Held {
        /// The carrier.
        player: PlayerId,
    },
    /// Being sprayed at a burning room.
    InUse {
        /// The carrier.
        player: PlayerId,
        /// The room being put out.
        room: RoomId,
        /// How long the spray has been held.
        held_for: Duration,
    },
    /// Out of charges. Returns to the wall after the respawn time.
    Depleted {
        /// Time spent depleted so far.
        elapsed: Duration,
    },
}

impl ExtinguisherState {
    const fn label(&self) -> &'static str {
        match self {
            Self::Mounted => "mounted",
            Self::Held { .. } => "held",
            Self::InUse { .. } => "in use",
            Self::Depleted { .. } => "depleted",
        }
    }
}

/// Notifications raised by an extinguisher, drained with [`Extinguisher::events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtinguisherEvent {
    /// `player` took the extinguisher off the wall.
    PickedUp {
        /// Extinguisher id.
        id: ExtinguisherId,
        /// The carrier.
        player: PlayerId,
    },
    /// The extinguisher went back on the wall.
    PutDown {
        /// Extinguisher id.
        id: ExtinguisherId,
    },
    /// A full hold finished and the engine was asked to put out `room`.
    RoomPutOut {
        /// Extinguisher id.
        id: ExtinguisherId,
        /// The carrier.
        player: PlayerId,
        /// The room.
        room: RoomId,
    },
    /// The last charge was used.
    Depleted {
        /// Extinguisher id.
        id: ExtinguisherId,
    },
    /// The extinguisher is back on the wall with full charges.
    Respawned {
        /// Extinguisher id.
        id: ExtinguisherId,
    },
}

/// A fire extinguisher with a limited number of charges.
///
/// Putting out a room takes one charge and requires holding the spray for the
/// configured `extinguish_time`. An empty extinguisher is dropped and reappears on
/// the wall after `extinguisher_respawn_time`.
///
/// # Examples
///
/// ```
/// use arson_mode::{ArsonConfig, Extinguisher, FireEngine, NoProps, RoomGraph, RoomId};
/// use web_time::Duration;
///
/// let config = ArsonConfig::default();
/// let mut engine = FireEngine::new(RoomGraph::build([("Kitchen", "Lobby")]), config);
/// let kitchen = RoomId::from("Kitchen");
/// let _ = engine.ignite(&kitchen);
///
/// let mut extinguisher = Extinguisher::new("hallway", &config);
/// extinguisher.pick_up(&"p1".into())?;
/// extinguisher.start_using(&kitchen, &engine)?;
/// extinguisher.tick(config.extinguish_time, &mut engine);
///
/// assert_eq!(engine.burning_count(), 0);
/// assert_eq!(extinguisher.charges(), config.extinguisher_charges - 1);
/// # Ok::<(), arson_mode::ArsonError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Extinguisher {
    id: ExtinguisherId,
    charges: u32,
    max_charges: u32,
    hold_time: Duration,
    respawn_time: Duration,
    state: ExtinguisherState,
    events: VecDeque<ExtinguisherEvent>,
}

impl Extinguisher {
    /// Creates a mounted extinguisher with full charges.
    #[must_use]
    pub fn new(id: impl Into<ExtinguisherId>, config: &ArsonConfig) -> Self {
        Self {
            id: id.into(),
            charges: config.extinguisher_charges,
            max_charges: config.extinguisher_charges,
            hold_time: config.extinguish_time,
            respawn_time: config.extinguisher_respawn_time,
            state: ExtinguisherState::Mounted,
            events: VecDeque::new(),
        }
    }

    /// The extinguisher id.
    #[must_use]
    pub fn id(&self) -> &ExtinguisherId {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ExtinguisherState {
        &self.state
    }

    /// Charges left.
    #[must_use]
    pub fn charges(&self) -> u32 {
        self.charges
    }

    /// The player carrying the extinguisher, if any.
    #[must_use]
    pub fn holder(&self) -> Option<&PlayerId> {
        match &self.state {
            ExtinguisherState::Held { player } | ExtinguisherState::InUse { player, .. } => {
                Some(player)
            },
            ExtinguisherState::Mounted | ExtinguisherState::Depleted { .. } => None,
        }
    }

    /// Returns `true` if the extinguisher is on the wall and can be picked up.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == ExtinguisherState::Mounted && self.charges > 0
    }

    /// Returns `true` while depleted.
    #[must_use]
    pub fn is_depleted(&self) -> bool {
        matches!(self.state, ExtinguisherState::Depleted { .. })
    }

    /// Fraction of charges left, in `0.0..=1.0`.
    #[must_use]
    pub fn charge_ratio(&self) -> f32 {
        if self.max_charges == 0 {
            return 0.0;
        }
        self.charges as f32 / self.max_charges as f32
    }

    /// Progress of the current spray, in `0.0..=1.0`. Zero unless in use.
    #[must_use]
    pub fn use_progress(&self) -> f32 {
        match &self.state {
            ExtinguisherState::InUse { held_for, .. } if !self.hold_time.is_zero() => {
                (held_for.as_secs_f32() / self.hold_time.as_secs_f32()).min(1.0)
            },
            _ => 0.0,
        }
    }

    /// Takes the extinguisher off the wall.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRequestKind::ExtinguisherUnavailable`] unless the extinguisher
    /// is mounted with charges left.
    pub fn pick_up(&mut self, player: &PlayerId) -> Result<(), ArsonError> {
        if !self.is_available() {
            return Err(self.unavailable());
        }
        self.state = ExtinguisherState::Held {
            player: player.clone(),
        };
        self.events.push_back(ExtinguisherEvent::PickedUp {
            id: self.id.clone(),
            player: player.clone(),
        });
        debug!(id = %self.id, %player, "extinguisher picked up");
        Ok(())
    }

    /// Returns a carried extinguisher to the wall, stopping any spray.
    ///
    /// Returns the player who was carrying it, or `None` if nobody was.
    pub fn put_down(&mut self) -> Option<PlayerId> {
        let player = self.holder()?.clone();
        self.state = ExtinguisherState::Mounted;
        self.events.push_back(ExtinguisherEvent::PutDown {
            id: self.id.clone(),
        });
        debug!(id = %self.id, %player, "extinguisher put down");
        Some(player)
    }

    /// Starts spraying at `room`. Retargeting while already in use restarts the hold.
    ///
    /// # Errors
    ///
    /// - [`ArsonError::UnknownRoom`] if the engine does not know `room`.
    /// - [`InvalidRequestKind::RoomNotBurning`] if `room` is not burning.
    /// - [`InvalidRequestKind::ExtinguisherUnavailable`] unless the extinguisher is
    ///   carried and has charges left.
    pub fn start_using(&mut self, room: &RoomId, engine: &FireEngine) -> Result<(), ArsonError> {
        let Some(player) = self.holder().cloned() else {
            return Err(self.unavailable());
        };
        if self.charges == 0 {
            return Err(self.unavailable());
        }
        match engine.room_state(room) {
            None => return Err(ArsonError::UnknownRoom { room: room.clone() }),
            Some(FireState::Burning) => {},
            Some(_) => {
                return Err(InvalidRequestKind::RoomNotBurning { room: room.clone() }.into());
            },
        }

        trace!(id = %self.id, %room, "extinguisher spraying");
        self.state = ExtinguisherState::InUse {
            player,
            room: room.clone(),
            held_for: Duration::ZERO,
        };
        Ok(())
    }

    /// Stops spraying. Progress is lost; the extinguisher stays in hand.
    pub fn stop_using(&mut self) {
        if let ExtinguisherState::InUse { player, .. } = &self.state {
            self.state = ExtinguisherState::Held {
                player: player.clone(),
            };
        }
    }

    /// Advances the spray hold or the respawn timer by `dt`.
    ///
    /// A hold that reaches `extinguish_time` puts the room out through
    /// [`FireEngine::extinguish`] and consumes a charge. If the room stops burning
    /// before the hold completes, or the engine refuses the put out once the round
    /// is won, the spray stops without using a charge.
    pub fn tick(&mut self, dt: Duration, engine: &mut FireEngine) {
        match &mut self.state {
            ExtinguisherState::Mounted | ExtinguisherState::Held { .. } => {},
            ExtinguisherState::Depleted { elapsed } => {
                *elapsed = elapsed.saturating_add(dt);
                if *elapsed >= self.respawn_time {
                    self.respawn();
                }
            },
            ExtinguisherState::InUse {
                player,
                room,
                held_for,
            } => {
                if engine.room_state(&*room) != Some(FireState::Burning) {
                    trace!(id = %self.id, %room, "spray target stopped burning");
                    let player = player.clone();
                    self.state = ExtinguisherState::Held { player };
                    return;
                }
                *held_for = held_for.saturating_add(dt);
                if *held_for < self.hold_time {
                    return;
                }

                let (player, room) = (player.clone(), room.clone());
                if !engine.extinguish(&room) {
                    trace!(id = %self.id, %room, "engine refused the put out");
                    self.state = ExtinguisherState::Held { player };
                    return;
                }
                self.charges = self.charges.saturating_sub(1);
                self.events.push_back(ExtinguisherEvent::RoomPutOut {
                    id: self.id.clone(),
                    player: player.clone(),
                    room: room.clone(),
                });
                debug!(id = %self.id, %room, charges = self.charges, "room put out");
                self.state = ExtinguisherState::Held { player };
                if self.charges == 0 {
                    self.deplete();
                }
            },
        }
    }

    /// Marks the extinguisher empty and drops it. Idempotent.
    pub fn deplete(&mut self) {
        if self.is_depleted() {
            return;
        }
        self.put_down();
        self.charges = 0;
        self.state = ExtinguisherState::Depleted {
            elapsed: Duration::ZERO,
        };
        self.events.push_back(ExtinguisherEvent::Depleted {
            id: self.id.clone(),
        });
        info!(id = %self.id, "extinguisher depleted");
    }

    /// Puts a depleted extinguisher back on the wall with full charges. Idempotent.
    pub fn respawn(&mut self) {
        if !self.is_depleted() {
            return;
        }
        self.charges = self.max_charges;
        self.state = ExtinguisherState::Mounted;
        self.events.push_back(ExtinguisherEvent::Respawned {
            id: self.id.clone(),
        });
        info!(id = %self.id, "extinguisher respawned");
    }

    /// Drains pending events in the order they were raised.
    pub fn events(&mut self) -> EventDrain<'_, ExtinguisherEvent> {
        EventDrain::from_drain(self.events.drain(..))
    }

    fn unavailable(&self) -> ArsonError {
        InvalidRequestKind::ExtinguisherUnavailable {
            id: self.id.clone(),
            reason: if self.charges == 0 && !self.is_depleted() {
                "empty"
            } else {
                self.state.label()
            },
        }
        .into()
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
    use crate::{FireEvent, RoomGraph};

    fn config() -> ArsonConfig {
        ArsonConfig {
            extinguish_time: Duration::from_secs(4),
            extinguisher_charges: 2,
            extinguisher_respawn_time: Duration::from_secs(30),
            ..ArsonConfig::default()
        }
    }

    fn burning_engine(rooms: &[&str]) -> FireEngine {
        let mut engine = FireEngine::new(
            RoomGraph::build([("Archive", "Kitchen"), ("Kitchen", "Lobby")]),
            config(),
        );
        for room in rooms {
            assert!(engine.ignite(&RoomId::from(*room)).is_ignited());
        }
        engine.events().for_each(drop);
        engine
    }

    fn p1() -> PlayerId {
        PlayerId::from("p1")
    }

    #[test]
    fn pick_up_requires_mounted() {
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();
        assert_eq!(ext.holder(), Some(&p1()));

        let err = ext.pick_up(&PlayerId::from("p2")).unwrap_err();
        assert_eq!(
            err,
            ArsonError::InvalidRequest {
                kind: InvalidRequestKind::ExtinguisherUnavailable {
                    id: ExtinguisherId::from("e1"),
                    reason: "held",
                }
            }
        );
    }

    #[test]
    fn start_using_requires_burning_room() {
        let engine = burning_engine(&["Kitchen"]);
        let mut ext = Extinguisher::new("e1", &config());

        assert!(ext.start_using(&RoomId::from("Kitchen"), &engine).is_err());

        ext.pick_up(&p1()).unwrap();
        let err = ext.start_using(&RoomId::from("Lobby"), &engine).unwrap_err();
        assert!(matches!(
            err,
            ArsonError::InvalidRequest {
                kind: InvalidRequestKind::RoomNotBurning { .. }
            }
        ));
        let err = ext.start_using(&RoomId::from("Attic"), &engine).unwrap_err();
        assert!(matches!(err, ArsonError::UnknownRoom { .. }));

        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();
        assert!(matches!(ext.state(), ExtinguisherState::InUse { .. }));
    }

    #[test]
    fn full_hold_puts_room_out_and_uses_a_charge() {
        let mut engine = burning_engine(&["Kitchen", "Lobby"]);
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();
        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();

        ext.tick(Duration::from_secs(2), &mut engine);
        assert!((ext.use_progress() - 0.5).abs() < f32::EPSILON);
        assert_eq!(engine.room_state("Kitchen"), Some(FireState::Burning));

        ext.tick(Duration::from_secs(2), &mut engine);
        assert_eq!(engine.room_state("Kitchen"), Some(FireState::Extinguished));
        assert_eq!(ext.charges(), 1);
        assert!((ext.charge_ratio() - 0.5).abs() < f32::EPSILON);
        assert_eq!(ext.state(), &ExtinguisherState::Held { player: p1() });
        assert_eq!(ext.use_progress(), 0.0);
    }

    #[test]
    fn stop_using_discards_progress() {
        let mut engine = burning_engine(&["Kitchen"]);
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();
        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();
        ext.tick(Duration::from_secs(3), &mut engine);
        ext.stop_using();
        assert_eq!(ext.use_progress(), 0.0);

        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();
        ext.tick(Duration::from_secs(3), &mut engine);
        assert_eq!(engine.burning_count(), 1);
        assert_eq!(ext.charges(), 2);
    }

    #[test]
    fn target_put_out_elsewhere_keeps_the_charge() {
        let mut engine = burning_engine(&["Kitchen", "Lobby"]);
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();
        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();
        assert!(engine.extinguish(&RoomId::from("Kitchen")));

        ext.tick(Duration::from_secs(4), &mut engine);
        assert_eq!(ext.charges(), 2);
        assert_eq!(ext.state(), &ExtinguisherState::Held { player: p1() });
    }

    #[test]
    fn won_engine_keeps_the_charge() {
        let config = ArsonConfig {
            extinguish_time: Duration::from_secs(1),
            rooms_to_win: 1,
            ..config()
        };
        let mut engine = FireEngine::new(RoomGraph::build([("A", "B")]), config);
        assert!(engine.ignite(&RoomId::from("A")).is_ignited());
        engine.tick(Duration::from_secs(1), &mut crate::NoProps);
        assert!(engine.is_won());

        let mut ext = Extinguisher::new("e1", &config);
        ext.pick_up(&p1()).unwrap();
        ext.start_using(&RoomId::from("A"), &engine).unwrap();
        ext.tick(Duration::from_secs(1), &mut engine);

        assert_eq!(engine.room_state("A"), Some(FireState::Burning));
        assert_eq!(ext.charges(), 2);
        assert_eq!(ext.state(), &ExtinguisherState::Held { player: p1() });
        let events: Vec<_> = ext.events().collect();
        assert!(matches!(
            events.as_slice(),
            [ExtinguisherEvent::PickedUp { .. }]
        ));
    }

    #[test]
    fn last_charge_depletes_and_respawns() {
        let mut engine = burning_engine(&["Archive", "Kitchen", "Lobby"]);
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();

        for room in ["Archive", "Kitchen"] {
            ext.start_using(&RoomId::from(room), &engine).unwrap();
            ext.tick(Duration::from_secs(4), &mut engine);
        }
        assert!(ext.is_depleted());
        assert_eq!(ext.holder(), None);
        assert!(ext.pick_up(&p1()).is_err());
        assert_eq!(engine.burning_count(), 1);

        ext.tick(Duration::from_secs(29), &mut engine);
        assert!(ext.is_depleted());
        ext.tick(Duration::from_secs(1), &mut engine);
        assert!(ext.is_available());
        assert_eq!(ext.charges(), 2);

        let events: Vec<_> = ext.events().collect();
        assert!(matches!(
            events.as_slice(),
            [
                ExtinguisherEvent::PickedUp { .. },
                ExtinguisherEvent::RoomPutOut { .. },
                ExtinguisherEvent::RoomPutOut { .. },
                ExtinguisherEvent::PutDown { .. },
                ExtinguisherEvent::Depleted { .. },
                ExtinguisherEvent::Respawned { .. },
            ]
        ));
    }

    #[test]
    fn last_room_put_out_raises_all_clear() {
        let mut engine = burning_engine(&["Kitchen"]);
        let mut ext = Extinguisher::new("e1", &config());
        ext.pick_up(&p1()).unwrap();
        ext.start_using(&RoomId::from("Kitchen"), &engine).unwrap();
        ext.tick(Duration::from_secs(4), &mut engine);

        let events: Vec<_> = engine.events().collect();
        assert_eq!(events.last(), Some(&FireEvent::AllClear));
        assert_eq!(engine.room_state("Kitchen"), Some(FireState::Safe));
    }

    #[test]
    fn put_down_returns_to_wall() {
        let mut ext = Extinguisher::new("e1", &config());
        assert_eq!(ext.put_down(), None);
        ext.pick_up(&p1()).unwrap();
        assert_eq!(ext.put_down(), Some(p1()));
        assert!(ext.is_available());
    }

    #[test]
    fn deplete_and_respawn_are_idempotent() {
        let mut ext = Extinguisher::new("e1", &config());
        ext.deplete();
        ext.deplete();
        ext.respawn();
        ext.respawn();
        let events: Vec<_> = ext.events().collect();
        assert_eq!(events.len(), 2);
    }
}

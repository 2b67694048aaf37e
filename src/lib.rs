//! # Arson Mode
//!
//! A deterministic simulation core for a timed social-deduction game mode: a hidden
//! saboteur (the *arsonist*) works through a secret chain of cover tasks that ends in
//! igniting a room, after which fire spreads across a room graph on a timer. The
//! arsonist wins if enough rooms burn simultaneously for long enough before the group
//! puts them out.
//!
//! Every participant in a multiplayer session runs its own copy of these state machines.
//! Correctness depends on every copy reaching the same decision from the same inputs,
//! so all selection steps use fixed tie-breaks (lexicographic room order, sorted-seed
//! arsonist draw) and the only way state changes is through explicit, idempotent entry
//! points. Instead of registering callbacks, the crate queues events for the host to
//! drain and relay over whatever transport it already has.
//!
//! The main entry point is [`RoundBuilder`], which produces an [`ArsonRound`]. The
//! individual state machines ([`FireEngine`], [`TaskChain`], [`RoomGraph`]) can also be
//! driven directly.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::borrow::Borrow;
use std::fmt;

pub use chain::{
    ArsonTask, ArsonTaskDefinition, ChainEvent, ChainState, RejectReason, SuspicionLevel,
    TaskChain, TaskEntry, TaskLocation, TaskOutcome, ARSON_TASK_COUNT, FINALE_TASK_INDEX,
    TASKS_BETWEEN_ARSON, BIND_PROP_TASK_INDEX,
};
pub use config::ArsonConfig;
pub use error::{ArsonError, InvalidRequestKind};
pub use event_drain::EventDrain;
pub use extinguisher::{Extinguisher, ExtinguisherEvent, ExtinguisherState};
pub use fire::{EnginePhase, FireEngine, FireEvent, FireState, IgniteOutcome, Room};
pub use inventory::{Inventory, Item};
pub use network::codec::{CodecError, CodecOperation};
pub use network::messages::SyncMessage;
pub use room_graph::RoomGraph;
pub use round::builder::RoundBuilder;
pub use round::{ArsonRound, RoundEvent};
pub use selection::{select_arsonists, ArsonistVec, Candidate, Selection};

pub mod chain;
pub mod config;
#[doc(hidden)]
pub mod error;
pub mod event_drain;
pub mod extinguisher;
pub mod fire;
pub mod hash;
pub mod inventory;
pub mod prelude;
/// Deterministic random number generator based on PCG32.
///
/// Every participant must draw the same sequence from the same seed, so the
/// crate carries its own generator instead of depending on `rand`.
pub mod rng;
pub mod room_graph;
#[doc(hidden)]
pub mod round {
    #[doc(hidden)]
    pub mod builder;
    mod session;

    pub use session::{ArsonRound, RoundEvent};
}
pub mod selection;
pub mod telemetry;
#[doc(hidden)]
pub mod network {
    /// Binary codec for relay messages.
    ///
    /// Encodes [`SyncMessage`](crate::SyncMessage) values with bincode so the host can
    /// ship them over its own transport.
    pub mod codec;
    #[doc(hidden)]
    pub mod messages;
}

/// Internal module exposing implementation details for testing and fuzzing.
///
/// **This module is NOT part of the public API.** Nothing here is covered by semver.
#[doc(hidden)]
pub mod __internal {
    pub use crate::fire::WinCountdown;
    pub use crate::network::codec::{decode, encode};
    pub use crate::rng::Pcg32;
    pub use crate::selection::derive_seed;
}

// #############
// # ID TYPES  #
// #############

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from anything string-like.
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the identifier is the empty string.
            #[inline]
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a room in the map.
    ///
    /// Room ids are ordered lexicographically. Spread selection relies on this ordering
    /// so that every participant picks the same target room.
    ///
    /// # Examples
    ///
    /// ```
    /// use arson_mode::RoomId;
    ///
    /// let archive = RoomId::from("Archive");
    /// let kitchen = RoomId::new("Kitchen");
    /// assert!(archive < kitchen);
    /// assert_eq!(kitchen.as_str(), "Kitchen");
    /// ```
    RoomId
);

string_id!(
    /// Identifier of a participant, stable for the whole session.
    PlayerId
);

string_id!(
    /// Identifier of a physical prop instance (a trash bin, for example).
    ///
    /// The arson chain binds a prop at the "stuff the bin" step and the finale must
    /// target the same instance.
    PropId
);

string_id!(
    /// Identifier of a wall-mounted fire extinguisher.
    ExtinguisherId
);

/// A world-space location, used only to ask a [`RoomResolver`] which room contains it.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate (up).
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Position {
    /// Creates a new position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The game role a participant holds before arsonist selection.
///
/// Only [`PlayerRole::Slacker`] players are eligible to become the arsonist.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PlayerRole {
    /// A regular worker. Receives decoy versions of the arson tasks.
    Specialist,
    /// The underperforming role the arsonist is drawn from.
    Slacker,
}

impl PlayerRole {
    /// Returns `true` if holders of this role can be selected as arsonist.
    #[inline]
    #[must_use]
    pub const fn is_arsonist_eligible(self) -> bool {
        matches!(self, Self::Slacker)
    }
}

// ###########################
// # COLLABORATOR TRAITS     #
// ###########################

/// Performs the physical side of an ignition: lighting a prop in the host game.
///
/// The engine only ever *requests* ignition through this trait. When a request
/// succeeds, the host is expected to report the resulting fire back through
/// [`FireEngine::ignite`] (or [`ArsonRound::on_prop_fire`]) once its own replication
/// delivers the event.
pub trait PropIgniter {
    /// Tries to set an eligible, not-yet-burning prop in `room` on fire.
    ///
    /// Returns `false` if the room has no such prop.
    fn ignite_prop_in(&mut self, room: &RoomId) -> bool;

    /// Tries to set a specific prop on fire. Used by the arson finale.
    ///
    /// Returns `false` if the prop cannot be lit.
    fn ignite_prop(&mut self, prop: &PropId) -> bool;
}

/// A [`PropIgniter`] for hosts with no physical props. Every request fails, so spread
/// falls back to state-only ignition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProps;

impl PropIgniter for NoProps {
    fn ignite_prop_in(&mut self, _room: &RoomId) -> bool {
        false
    }

    fn ignite_prop(&mut self, _prop: &PropId) -> bool {
        false
    }
}

/// Resolves a world location to the room containing it.
pub trait RoomResolver {
    /// Returns the room containing `position`, or `None` if it is outside every room.
    fn room_at(&self, position: Position) -> Option<RoomId>;
}

impl<F> RoomResolver for F
where
    F: Fn(Position) -> Option<RoomId>,
{
    fn room_at(&self, position: Position) -> Option<RoomId> {
        self(position)
    }
}

// ###################
// # UNIT TESTS      #
// ###################

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn room_ids_order_lexicographically() {
        let mut rooms = vec![
            RoomId::from("Lobby"),
            RoomId::from("Kitchen"),
            RoomId::from("Archive"),
        ];
        rooms.sort();
        assert_eq!(
            rooms,
            vec![
                RoomId::from("Archive"),
                RoomId::from("Kitchen"),
                RoomId::from("Lobby")
            ]
        );
    }

    #[test]
    fn string_ids_support_str_lookup() {
        let mut map = BTreeMap::new();
        map.insert(RoomId::from("Kitchen"), 1);
        assert_eq!(map.get("Kitchen"), Some(&1));
        assert_eq!(map.get("Lobby"), None);
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let json = serde_json::to_string(&PlayerId::from("p1")).unwrap();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn only_slackers_are_eligible() {
        assert!(PlayerRole::Slacker.is_arsonist_eligible());
        assert!(!PlayerRole::Specialist.is_arsonist_eligible());
    }

    #[test]
    fn closure_resolves_rooms() {
        let resolver = |p: Position| (p.x < 0.0).then(|| RoomId::from("West"));
        assert_eq!(
            resolver.room_at(Position::new(-1.0, 0.0, 0.0)),
            Some(RoomId::from("West"))
        );
        assert_eq!(resolver.room_at(Position::new(1.0, 0.0, 0.0)), None);
    }

    #[test]
    fn no_props_never_ignites() {
        let mut props = NoProps;
        assert!(!props.ignite_prop_in(&RoomId::from("Kitchen")));
        assert!(!props.ignite_prop(&PropId::from("bin")));
    }
}

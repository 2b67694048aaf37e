use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{ExtinguisherId, Item, PlayerId, RoomId};

/// This enum contains all error messages this library can return.
///
/// Core state-machine operations never return errors: invalid calls are silent no-ops
/// so that independent copies of the simulation cannot diverge on error paths. Errors
/// only appear at the edges, when building a round, validating configuration, or when
/// the interaction layer asks whether a player may begin an interaction at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ArsonError {
    /// You made an invalid request, usually by using wrong parameters for function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        kind: InvalidRequestKind,
    },
    /// The player does not hold the item required to start a task.
    MissingItem {
        /// The player attempting the task.
        player: PlayerId,
        /// The item the task requires.
        item: Item,
    },
    /// The player id was never registered for this round.
    UnknownPlayer {
        /// The unknown player.
        player: PlayerId,
    },
    /// The room id is not part of this round's room graph.
    UnknownRoom {
        /// The unknown room.
        room: RoomId,
    },
    /// Serialization or deserialization of a relay message failed.
    SerializationError {
        /// A description of what failed to serialize/deserialize.
        context: String,
    },
}

/// Structured reasons for [`ArsonError::InvalidRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidRequestKind {
    /// A numeric configuration value is outside its accepted range.
    ConfigValueOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
        /// The value that was supplied.
        actual: u64,
    },
    /// A duration configuration value is outside its accepted range.
    DurationConfigOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value in milliseconds.
        min_ms: u64,
        /// Largest accepted value in milliseconds.
        max_ms: u64,
        /// The value that was supplied, in milliseconds.
        actual_ms: u64,
    },
    /// The task index does not name one of the fixed arson tasks.
    TaskIndexOutOfRange {
        /// The supplied index.
        index: usize,
    },
    /// The same player id was added to the round twice.
    DuplicatePlayer {
        /// The duplicated id.
        player: PlayerId,
    },
    /// An extinguisher with this id is already mounted.
    DuplicateExtinguisher {
        /// The duplicated id.
        id: ExtinguisherId,
    },
    /// No extinguisher with this id exists.
    UnknownExtinguisher {
        /// The unknown id.
        id: ExtinguisherId,
    },
    /// The extinguisher is held, depleted, or otherwise not in the requested state.
    ExtinguisherUnavailable {
        /// The extinguisher id.
        id: ExtinguisherId,
        /// What the extinguisher is currently doing.
        reason: &'static str,
    },
    /// The target room is not burning, so there is nothing to put out.
    RoomNotBurning {
        /// The room that was targeted.
        room: RoomId,
    },
}

impl Display for InvalidRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigValueOutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{} must be between {} and {}, got {}",
                field, min, max, actual
            ),
            Self::DurationConfigOutOfRange {
                field,
                min_ms,
                max_ms,
                actual_ms,
            } => write!(
                f,
                "{} must be between {}ms and {}ms, got {}ms",
                field, min_ms, max_ms, actual_ms
            ),
            Self::TaskIndexOutOfRange { index } => {
                write!(f, "arson task index {} is out of range", index)
            },
            Self::DuplicatePlayer { player } => {
                write!(f, "player {} was added more than once", player)
            },
            Self::DuplicateExtinguisher { id } => {
                write!(f, "extinguisher {} is already mounted", id)
            },
            Self::UnknownExtinguisher { id } => write!(f, "no extinguisher named {}", id),
            Self::ExtinguisherUnavailable { id, reason } => {
                write!(f, "extinguisher {} is unavailable: {}", id, reason)
            },
            Self::RoomNotBurning { room } => write!(f, "room {} is not burning", room),
        }
    }
}

impl From<InvalidRequestKind> for ArsonError {
    fn from(kind: InvalidRequestKind) -> Self {
        Self::InvalidRequest { kind }
    }
}

impl Display for ArsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest { kind } => write!(f, "Invalid Request: {}", kind),
            Self::MissingItem { player, item } => {
                write!(f, "Player {} must hold {} to start this task", player, item)
            },
            Self::UnknownPlayer { player } => write!(f, "Unknown player {}", player),
            Self::UnknownRoom { room } => write!(f, "Unknown room {}", room),
            Self::SerializationError { context } => {
                write!(f, "Serialization error: {}", context)
            },
        }
    }
}

impl Error for ArsonError {}

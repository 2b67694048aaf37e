use serde::{Deserialize, Serialize};

use crate::{ExtinguisherId, PlayerId, RoomId};

/// A state change relayed between participants over the host's transport.
///
/// Relay is fire-and-forget: applying a message that does not fit the local state is
/// a no-op, so duplicates and late arrivals are harmless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMessage {
    /// A room caught fire through the arson finale or a prop fire.
    FireIgnited {
        /// The room.
        room: RoomId,
    },
    /// A room caught fire by spreading.
    FireSpread {
        /// The room.
        room: RoomId,
    },
    /// A room was put out.
    FireExtinguished {
        /// The room.
        room: RoomId,
    },
    /// The last fire went out.
    AllFiresOut,
    /// An extinguisher was taken off the wall.
    ExtinguisherPickedUp {
        /// The extinguisher.
        id: ExtinguisherId,
        /// The carrier.
        player: PlayerId,
    },
    /// An extinguisher ran out of charges.
    ExtinguisherDepleted {
        /// The extinguisher.
        id: ExtinguisherId,
    },
    /// An extinguisher is back on the wall.
    ExtinguisherRespawned {
        /// The extinguisher.
        id: ExtinguisherId,
    },
    /// A saboteur completed an arson task.
    ArsonTaskCompleted {
        /// The saboteur.
        player: PlayerId,
        /// The completed task index.
        index: u8,
    },
    /// The win countdown elapsed.
    ArsonistWin,
}

impl SyncMessage {
    /// The room this message concerns, if any.
    #[must_use]
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            Self::FireIgnited { room } | Self::FireSpread { room } | Self::FireExtinguished { room } => {
                Some(room)
            },
            _ => None,
        }
    }
}

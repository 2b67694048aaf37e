//! Convenient re-exports for common usage.
//!
//! ```rust
//! use arson_mode::prelude::*;
//!
//! let mut round = RoundBuilder::new()
//!     .with_room_edges([("Kitchen", "Lobby")])
//!     .add_player("p1", PlayerRole::Slacker)?
//!     .start_round()?;
//!
//! round.tick(Duration::from_millis(16), &mut NoProps);
//! for event in round.events() {
//!     if let RoundEvent::Broadcast(message) = event {
//!         let _bytes = arson_mode::network::codec::encode_message(&message)?;
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Round orchestration
pub use crate::{ArsonRound, RoundBuilder, RoundEvent};

// State machines
pub use crate::{FireEngine, FireEvent, FireState, IgniteOutcome, RoomGraph};
pub use crate::{ChainEvent, RejectReason, TaskChain, TaskOutcome};
pub use crate::{Extinguisher, ExtinguisherEvent};

// Identifiers and collaborators
pub use crate::{
    ExtinguisherId, NoProps, PlayerId, PlayerRole, Position, PropId, PropIgniter, RoomId,
    RoomResolver,
};

// Configuration, items, relay
pub use crate::{ArsonConfig, Inventory, Item, SyncMessage};

// Error handling
pub use crate::{ArsonError, InvalidRequestKind};

pub use web_time::Duration;

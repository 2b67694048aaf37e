//! Items handed out and consumed by the arson chain.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::PlayerId;

/// An arson chain item. Players hold at most one of each.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    /// Printed documents, granted by task 1 and stuffed into the bin at task 3.
    PaperStack,
    /// Granted by task 2 and required to start the finale.
    LighterFluid,
}

impl Item {
    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaperStack => "paper_stack",
            Self::LighterFluid => "lighter_fluid",
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-player item sets. No quantities.
///
/// # Examples
///
/// ```
/// use arson_mode::{Inventory, Item, PlayerId};
///
/// let mut inventory = Inventory::new();
/// let p1 = PlayerId::from("p1");
///
/// inventory.add(&p1, Item::PaperStack);
/// assert!(inventory.has(&p1, Item::PaperStack));
/// assert!(inventory.remove(&p1, Item::PaperStack));
/// assert!(!inventory.remove(&p1, Item::PaperStack));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: BTreeMap<PlayerId, BTreeSet<Item>>,
}

impl Inventory {
    /// Creates an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `item` to `player`. Returns `false` if they already held it.
    pub fn add(&mut self, player: &PlayerId, item: Item) -> bool {
        self.items.entry(player.clone()).or_default().insert(item)
    }

    /// Returns `true` if `player` holds `item`.
    #[must_use]
    pub fn has(&self, player: &PlayerId, item: Item) -> bool {
        self.items
            .get(player)
            .is_some_and(|held| held.contains(&item))
    }

    /// Takes `item` from `player`. Returns `false` if they did not hold it.
    pub fn remove(&mut self, player: &PlayerId, item: Item) -> bool {
        let Some(held) = self.items.get_mut(player) else {
            return false;
        };
        let removed = held.remove(&item);
        if held.is_empty() {
            self.items.remove(player);
        }
        removed
    }

    /// Items held by `player`, in a stable order.
    pub fn items_of(&self, player: &PlayerId) -> impl Iterator<Item = Item> + '_ {
        self.items.get(player).into_iter().flatten().copied()
    }

    /// Returns `true` if no player holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

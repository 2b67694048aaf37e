//! Deterministic arsonist draw.
//!
//! Every participant runs the draw locally from the same roster and must reach the
//! same result, so nothing here depends on iteration order, process state or wall time:
//!
//! 1. keep only [`PlayerRole::Slacker`] candidates, sorted and deduplicated by id;
//! 2. fold each id's FNV-1a hash into a seed, `seed = seed * 31 + hash`, in sorted order;
//! 3. draw without replacement from a [`Pcg32`] seeded with that value.

use std::collections::BTreeSet;

use smallvec::SmallVec;
use tracing::{info, warn};

use crate::hash::str_hash;
use crate::rng::{Pcg32, Rng, SeedableRng};
use crate::{PlayerId, PlayerRole};

/// Selected arsonists. Rounds rarely have more than a couple.
pub type ArsonistVec = SmallVec<[PlayerId; 4]>;

/// A participant entering the draw.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Participant id.
    pub id: PlayerId,
    /// Role held before selection.
    pub role: PlayerRole,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(id: impl Into<PlayerId>, role: PlayerRole) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Outcome of [`select_arsonists`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    arsonists: ArsonistVec,
    eligible: usize,
    seed: u64,
}

impl Selection {
    /// Chosen arsonists, in draw order.
    #[must_use]
    pub fn arsonists(&self) -> &[PlayerId] {
        &self.arsonists
    }

    /// Returns `true` if `player` was chosen.
    #[must_use]
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.arsonists.contains(player)
    }

    /// Returns `true` if nobody was chosen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arsonists.is_empty()
    }

    /// Number of candidates that were eligible.
    #[must_use]
    pub fn eligible_count(&self) -> usize {
        self.eligible
    }

    /// Seed the draw used.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Consumes the selection, returning the chosen ids.
    #[must_use]
    pub fn into_arsonists(self) -> ArsonistVec {
        self.arsonists
    }
}

/// Folds id hashes into a seed, `seed = seed * 31 + fnv1a(id)`, with wrapping arithmetic.
///
/// Callers must pass ids in sorted order for the result to be order-independent.
#[must_use]
pub fn derive_seed<'a, I>(sorted_ids: I) -> u64
where
    I: IntoIterator<Item = &'a PlayerId>,
{
    sorted_ids.into_iter().fold(0u64, |seed, id| {
        seed.wrapping_mul(31).wrapping_add(str_hash(id.as_str()))
    })
}

/// Draws up to `count` arsonists from the eligible candidates.
///
/// Fewer are returned when fewer are eligible. No eligible candidates yields an empty
/// selection, which is a valid outcome.
///
/// # Examples
///
/// ```
/// use arson_mode::{select_arsonists, Candidate, PlayerRole};
///
/// let roster = [
///     Candidate::new("carol", PlayerRole::Slacker),
///     Candidate::new("alice", PlayerRole::Specialist),
///     Candidate::new("bob", PlayerRole::Slacker),
/// ];
/// let first = select_arsonists(&roster, 1);
/// let mut reversed = roster.clone();
/// reversed.reverse();
///
/// assert_eq!(first.eligible_count(), 2);
/// assert_eq!(first, select_arsonists(&reversed, 1));
/// assert!(!first.contains(&"alice".into()));
/// ```
#[must_use]
pub fn select_arsonists<'a, I>(candidates: I, count: usize) -> Selection
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let eligible: BTreeSet<&PlayerId> = candidates
        .into_iter()
        .filter(|c| c.role.is_arsonist_eligible())
        .map(|c| &c.id)
        .collect();
    let mut pool: Vec<&PlayerId> = eligible.into_iter().collect();
    let eligible = pool.len();

    if pool.is_empty() {
        warn!("no eligible candidates, round has no arsonist");
        return Selection::default();
    }

    let seed = derive_seed(pool.iter().copied());
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut arsonists = ArsonistVec::new();
    for _ in 0..count.min(eligible) {
        let pick = rng.gen_range_usize(0..pool.len());
        arsonists.push(pool.remove(pick).clone());
    }

    info!(
        eligible,
        selected = arsonists.len(),
        seed,
        "arsonists selected"
    );
    Selection {
        arsonists,
        eligible,
        seed,
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

    fn slackers(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate::new(*id, PlayerRole::Slacker))
            .collect()
    }

    #[test]
    fn empty_roster_selects_nobody() {
        let selection = select_arsonists(&[], 2);
        assert!(selection.is_empty());
        assert_eq!(selection.eligible_count(), 0);
    }

    #[test]
    fn specialists_are_never_selected() {
        let roster = vec![
            Candidate::new("a", PlayerRole::Specialist),
            Candidate::new("b", PlayerRole::Specialist),
        ];
        assert!(select_arsonists(&roster, 1).is_empty());
    }

    #[test]
    fn count_is_capped_by_eligible_pool() {
        let roster = slackers(&["a", "b", "c"]);
        let selection = select_arsonists(&roster, 10);
        assert_eq!(selection.arsonists().len(), 3);
        let unique: BTreeSet<_> = selection.arsonists().iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn zero_count_selects_nobody() {
        assert!(select_arsonists(&slackers(&["a", "b"]), 0).is_empty());
    }

    #[test]
    fn input_order_and_duplicates_do_not_matter() {
        let a = slackers(&["p3", "p1", "p2", "p4"]);
        let b = slackers(&["p4", "p2", "p1", "p3", "p1"]);
        assert_eq!(select_arsonists(&a, 2), select_arsonists(&b, 2));
    }

    #[test]
    fn seed_folds_in_sorted_order() {
        let ids = [PlayerId::from("a"), PlayerId::from("b")];
        let expected = str_hash("a").wrapping_mul(31).wrapping_add(str_hash("b"));
        assert_eq!(derive_seed(&ids), expected);
        assert_eq!(derive_seed(std::iter::empty()), 0);
    }

    #[test]
    fn different_rosters_can_pick_different_players() {
        let picks: BTreeSet<PlayerId> = (0..40)
            .map(|n| {
                let roster = slackers(&[&format!("x{n}"), &format!("y{n}")]);
                select_arsonists(&roster, 1).arsonists()[0].clone()
            })
            .map(|id| PlayerId::from(&id.as_str()[..1]))
            .collect();
        assert_eq!(picks.len(), 2);
    }
}

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque Tidal track identifier. Two ids name the same track iff they are equal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for TrackId {
    fn from(id: u64) -> Self {
        TrackId(id)
    }
}

/// A duplicate-free set of track ids that remembers first-seen order.
///
/// Paginated fetches can return the same track on two pages (the remote
/// collection may reorder mid-fetch), so insertion drops later duplicates
/// rather than treating them as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSet {
    order: Vec<TrackId>,
    seen: HashSet<TrackId>,
}

impl TrackSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an id, keeping the first occurrence. Returns whether it was new.
    pub fn insert(&mut self, id: TrackId) -> bool {
        if self.seen.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = TrackId> + '_ {
        self.order.iter().copied()
    }

    /// Ids in `self` that are not in `other`, keeping `self`'s order.
    pub fn difference(&self, other: &TrackSet) -> TrackSet {
        self.iter().filter(|id| !other.contains(*id)).collect()
    }
}

impl FromIterator<TrackId> for TrackSet {
    fn from_iter<I: IntoIterator<Item = TrackId>>(iter: I) -> Self {
        let mut set = TrackSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Extend<TrackId> for TrackSet {
    fn extend<I: IntoIterator<Item = TrackId>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

/// The minimal add/remove delta between a playlist's current contents and the
/// desired membership set.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub to_add: TrackSet,
    pub to_remove: TrackSet,
}

impl Diff {
    /// Compute `to_add = desired \ current` and `to_remove = current \ desired`.
    ///
    /// By construction no id can land on both sides; an overlap would make the
    /// engine flap (add then remove the same track on every run), so it is
    /// guarded anyway and the offending id dropped from both sides.
    pub fn between(current: &TrackSet, desired: &TrackSet) -> Self {
        let to_add = desired.difference(current);
        let to_remove = current.difference(desired);

        let overlap: Vec<TrackId> = to_add.iter().filter(|id| to_remove.contains(*id)).collect();
        debug_assert!(overlap.is_empty(), "diff overlap: {overlap:?}");
        if overlap.is_empty() {
            return Self { to_add, to_remove };
        }

        tracing::error!(?overlap, "diff produced ids on both sides; dropping them");
        let skip: HashSet<TrackId> = overlap.into_iter().collect();
        Self {
            to_add: to_add.iter().filter(|id| !skip.contains(id)).collect(),
            to_remove: to_remove.iter().filter(|id| !skip.contains(id)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[u64]) -> TrackSet {
        ids.iter().map(|&id| TrackId(id)).collect()
    }

    #[test]
    fn test_insert_drops_later_duplicates() {
        let mut tracks = TrackSet::new();
        assert!(tracks.insert(TrackId(1)));
        assert!(tracks.insert(TrackId(2)));
        assert!(!tracks.insert(TrackId(1)));

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks.iter().collect::<Vec<_>>(), vec![TrackId(1), TrackId(2)]);
    }

    #[test]
    fn test_difference_keeps_left_order() {
        let left = set(&[5, 3, 9, 1]);
        let right = set(&[3, 1]);

        let diff = left.difference(&right);
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![TrackId(5), TrackId(9)]);
    }

    #[test]
    fn test_diff_between_current_and_desired() {
        // current = {1,4}, desired = {1,3} => remove {4}, add {3}
        let current = set(&[1, 4]);
        let desired = set(&[1, 3]);

        let diff = Diff::between(&current, &desired);
        assert_eq!(diff.to_add.iter().collect::<Vec<_>>(), vec![TrackId(3)]);
        assert_eq!(diff.to_remove.iter().collect::<Vec<_>>(), vec![TrackId(4)]);
    }

    #[test]
    fn test_diff_minimality_invariants() {
        let current = set(&[1, 2, 3, 4]);
        let desired = set(&[3, 4, 5, 6]);

        let diff = Diff::between(&current, &desired);
        for id in diff.to_add.iter() {
            assert!(!current.contains(id), "to_add must be disjoint from current");
        }
        for id in diff.to_remove.iter() {
            assert!(current.contains(id), "to_remove must be a subset of current");
        }
    }

    #[test]
    fn test_diff_is_idempotent() {
        let current = set(&[1, 4, 7]);
        let desired = set(&[1, 3]);

        // Apply the diff to current, then recompute: both sides must be empty.
        let diff = Diff::between(&current, &desired);
        let post: TrackSet = current
            .iter()
            .filter(|id| !diff.to_remove.contains(*id))
            .chain(diff.to_add.iter())
            .collect();

        let rerun = Diff::between(&post, &desired);
        assert!(rerun.is_empty());
        assert_eq!(post, desired);
    }

    #[test]
    fn test_diff_of_identical_sets_is_empty() {
        let tracks = set(&[1, 2, 3]);
        assert!(Diff::between(&tracks, &tracks).is_empty());
    }
}

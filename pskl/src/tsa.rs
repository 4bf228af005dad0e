//! TimeStampedArray: an immutable, timestamped snapshot of one node's
//! forward pointers.

use pskl_core::Timestamp;

use crate::node::NodeId;

/// An immutable snapshot of a node's forward-pointer array as of one
/// specific timestamp.
///
/// A node's `forward_history` is a sequence of these, one per time its
/// forward pointers changed. Only the *last* TSA in a history may still be
/// unlocked; every earlier one is frozen the moment its successor is
/// appended (or the present moves past it).
#[derive(Debug, Clone)]
pub struct TimeStampedArray {
    time: Timestamp,
    slots: Vec<Option<NodeId>>,
    locked: bool,
}

impl TimeStampedArray {
    /// Creates a new, unlocked array of `h` absent slots, timestamped `t`.
    pub fn new(t: Timestamp, h: usize) -> Self {
        Self {
            time: t,
            slots: vec![None; h],
            locked: false,
        }
    }

    /// Creates a new, unlocked array at time `t` with the same length and
    /// contents as `other` — the starting point for a splice or a
    /// node-copy, before the caller overwrites the levels that actually
    /// change.
    pub fn copy_of(t: Timestamp, other: &TimeStampedArray) -> Self {
        Self {
            time: t,
            slots: other.slots.clone(),
            locked: false,
        }
    }

    /// Creates a new, unlocked array at time `t` with `new_len` slots,
    /// carrying `other`'s contents into the lower levels and leaving the
    /// rest absent. Used when a taller node (or the head growing to admit
    /// one) needs more levels than the array it's superseding had.
    pub fn grown(t: Timestamp, new_len: usize, other: &TimeStampedArray) -> Self {
        debug_assert!(new_len >= other.size());
        let mut slots = other.slots.clone();
        slots.resize(new_len, None);
        Self {
            time: t,
            slots,
            locked: false,
        }
    }

    /// Sets the forward pointer at level `l`.
    ///
    /// Calling this after [`lock`](Self::lock) is a caller bug: the array is
    /// meant to be immutable for every level above `h` once it has an
    /// immediate successor in its owner's history.
    pub fn set(&mut self, l: usize, node: Option<NodeId>) {
        debug_assert!(!self.locked, "attempted to mutate a locked TSA");
        self.slots[l] = node;
    }

    /// Returns the forward pointer at level `l`, or `None` if level `l` has
    /// no target (past the top of this array, or not yet linked).
    pub fn get(&self, l: usize) -> Option<NodeId> {
        self.slots.get(l).copied().flatten()
    }

    /// The timestamp at which this array became the current forward-pointer
    /// array of its owning node.
    pub fn time(&self) -> Timestamp {
        self.time
    }

    /// The number of levels this array covers.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Whether this array is still mutable.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Freezes the array. After this, `set` is a bug (caught in debug
    /// builds via `debug_assert!`).
    pub fn lock(&mut self) {
        self.locked = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_array_is_all_absent() {
        let tsa = TimeStampedArray::new(3, 4);
        assert_eq!(tsa.time(), 3);
        assert_eq!(tsa.size(), 4);
        for l in 0..4 {
            assert!(tsa.get(l).is_none());
        }
    }

    #[test]
    fn copy_of_preserves_contents_but_unlocks() {
        let mut original = TimeStampedArray::new(1, 2);
        original.set(0, Some(NodeId::new(7)));
        original.lock();

        let copy = TimeStampedArray::copy_of(2, &original);
        assert_eq!(copy.time(), 2);
        assert_eq!(copy.get(0), Some(NodeId::new(7)));
        assert!(!copy.is_locked());
    }

    #[test]
    fn lock_prevents_further_logical_mutation() {
        let mut tsa = TimeStampedArray::new(0, 1);
        tsa.lock();
        assert!(tsa.is_locked());
    }

    #[test]
    fn get_past_size_returns_none() {
        let tsa = TimeStampedArray::new(0, 1);
        assert_eq!(tsa.get(5), None);
    }

    #[test]
    fn grown_preserves_lower_levels_and_extends() {
        let mut original = TimeStampedArray::new(1, 2);
        original.set(0, Some(NodeId::new(3)));
        original.set(1, Some(NodeId::new(4)));

        let grown = TimeStampedArray::grown(2, 4, &original);
        assert_eq!(grown.size(), 4);
        assert_eq!(grown.get(0), Some(NodeId::new(3)));
        assert_eq!(grown.get(1), Some(NodeId::new(4)));
        assert_eq!(grown.get(2), None);
        assert_eq!(grown.get(3), None);
        assert!(!grown.is_locked());
    }
}

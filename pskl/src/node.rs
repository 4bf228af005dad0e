//! Node: one skip-list entry, its back-pointers, and its history of
//! forward-pointer snapshots.

use std::cmp::Ordering;

use log::trace;
use pskl_core::Timestamp;

use crate::tsa::TimeStampedArray;

/// A non-owning index into a [`PersistentSkipList`](crate::PersistentSkipList)'s
/// arena.
///
/// Nodes are never freed individually — the arena, and therefore every node
/// in it, lives exactly as long as the owning list (Design Notes §9: "store
/// all nodes in a central arena ... use indices ... for both forward targets
/// and back-predecessors"). A `NodeId` is `Copy` and carries no lifetime, so
/// the forward/back pointer cycle costs nothing to express and nothing to
/// tear down: dropping the arena's `Vec` drops every node at once.
///
/// The `−∞`/`+∞` sentinels from the specification are not materialized as
/// arena entries: a node always holds a real datum, and both bounds are
/// realized as the absence of a reference. A forward slot of `None` behaves
/// as `+∞` (nothing follows, so it compares greater than every key); a
/// back-pointer of `None` behaves as `−∞` (the virtual head precedes
/// everything). This is the same "carries no datum" sentinel contract the
/// specification describes, expressed as `Option<NodeId>` instead of a
/// pointer to a dedicated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Outcome of [`Node::append_forward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new TSA was pushed onto the history.
    Appended,
    /// The last TSA (same timestamp) was replaced in place — the
    /// equal-timestamp coalescing rule.
    Replaced,
    /// The history is at capacity (`fat`); the caller must allocate a
    /// replacement node (DSST node-copying) instead of appending here.
    Overflow,
}

/// One skip-list entry.
///
/// `height` is fixed at creation. `forward_history` is append-only except
/// that its last entry may be replaced (equal-timestamp coalescing) or,
/// once appending would exceed `fat`, forces the caller to copy this node
/// instead of growing its history further (§4.2 node overflow).
#[derive(Debug, Clone)]
pub struct Node<T> {
    data: T,
    height: usize,
    forward_history: Vec<TimeStampedArray>,
    back: Vec<Option<NodeId>>,
    fat: usize,
}

impl<T> Node<T> {
    pub(crate) fn new(data: T, height: usize, fat: usize) -> Self {
        Self {
            data,
            height,
            forward_history: Vec::new(),
            back: vec![None; height],
            fat,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn get_height(&self) -> usize {
        self.height
    }

    pub(crate) fn fat(&self) -> usize {
        self.fat
    }

    /// Binary search in `forward_history` for the largest index `i` with
    /// `history[i].time <= t`. Returns `None` if no such index exists
    /// (this node had no forward pointers yet at `t`). On an exact
    /// timestamp hit, that index is returned.
    pub fn forward_change_index(&self, t: Timestamp) -> Option<usize> {
        if self.forward_history.is_empty() {
            return None;
        }
        // First index whose time is strictly greater than t.
        let idx = self.forward_history.partition_point(|tsa| tsa.time() <= t);
        if idx == 0 {
            None
        } else {
            Some(idx - 1)
        }
    }

    /// Returns the TSA in force at time `t`, or `None` if this node had no
    /// forward pointers yet at `t`.
    pub fn forward_at(&self, t: Timestamp) -> Option<&TimeStampedArray> {
        self.forward_change_index(t)
            .map(|i| &self.forward_history[i])
    }

    /// Convenience: the forward target at level `l` as of time `t`. `None`
    /// means nothing follows at that level as of `t` (the `+∞` bound).
    pub fn forward_at_level(&self, t: Timestamp, l: usize) -> Option<NodeId> {
        self.forward_at(t).and_then(|tsa| tsa.get(l))
    }

    /// The TSA currently being written to (the last one, if any).
    pub fn current_forward(&self) -> Option<&TimeStampedArray> {
        self.forward_history.last()
    }

    /// Whether appending another TSA right now (at a genuinely new
    /// timestamp) would exceed this node's fatness.
    pub fn would_overflow(&self) -> bool {
        self.forward_history.len() >= self.fat
    }

    /// Appends (or, for a same-timestamp update, replaces) a forward-pointer
    /// snapshot, locking the previous TSA first so the past stays frozen.
    /// Returns `Overflow` without mutating anything if the history is
    /// already at capacity for a genuinely new timestamp — the caller must
    /// node-copy first and retry against the replacement.
    pub fn append_forward(&mut self, tsa: TimeStampedArray) -> AppendOutcome {
        if let Some(last) = self.forward_history.last() {
            debug_assert!(
                tsa.time() >= last.time(),
                "forward history timestamps must be non-decreasing"
            );
            if tsa.time() == last.time() {
                trace!("coalescing forward update at t={}", tsa.time());
                *self.forward_history.last_mut().unwrap() = tsa;
                return AppendOutcome::Replaced;
            }
        }
        if self.would_overflow() {
            return AppendOutcome::Overflow;
        }
        if let Some(last) = self.forward_history.last_mut() {
            last.lock();
        }
        self.forward_history.push(tsa);
        AppendOutcome::Appended
    }

    /// Sets the back-pointer at level `l`. `None` means the virtual head
    /// (`−∞`) is this node's predecessor at that level.
    pub fn set_back(&mut self, l: usize, node: Option<NodeId>) {
        self.back[l] = node;
    }

    pub fn get_back(&self, l: usize) -> Option<NodeId> {
        self.back.get(l).copied().flatten()
    }

    pub fn clear_back(&mut self, l: usize) {
        if l < self.back.len() {
            self.back[l] = None;
        }
    }

    pub fn lt_key(&self, key: &T) -> bool
    where
        T: Ord,
    {
        self.data.cmp(key) == Ordering::Less
    }

    pub fn gt_key(&self, key: &T) -> bool
    where
        T: Ord,
    {
        self.data.cmp(key) == Ordering::Greater
    }
}

//! Read-only views over a [`PersistentSkipList`] at a fixed timestamp.

use pskl_core::Timestamp;

use crate::node::NodeId;
use crate::psl::PersistentSkipList;

/// The result of [`PersistentSkipList::locate`]: the finite node with the
/// greatest datum strictly less than the query key as of some timestamp, or
/// nothing if no such node existed yet.
pub struct Predecessor<'a, T> {
    pub(crate) list: &'a PersistentSkipList<T>,
    pub(crate) id: Option<NodeId>,
}

impl<'a, T> Predecessor<'a, T> {
    /// The predecessor's datum, or `None` if the query key was less than
    /// everything live at the queried timestamp (the `−∞` bound).
    pub fn data(&self) -> Option<&'a T> {
        self.id.map(|id| self.list.node_data(id))
    }
}

/// A lazy, forward-only iterator over every datum live at a fixed timestamp,
/// in ascending order.
///
/// Obtained from [`PersistentSkipList::iter_at`]. Each step re-reads the
/// level-0 forward pointer at the iterator's timestamp, so it reflects
/// exactly the state of the list at that moment — later writes to the
/// present never affect an iterator over an earlier timestamp, and the
/// iterator cannot be rewound or restarted at a different timestamp.
pub struct IterAt<'a, T> {
    pub(crate) list: &'a PersistentSkipList<T>,
    pub(crate) t: Timestamp,
    pub(crate) cur: Option<NodeId>,
    pub(crate) started: bool,
}

impl<'a, T> Iterator for IterAt<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let next_id = if !self.started {
            self.started = true;
            self.list.head_at(self.t).and_then(|h| h.get(0))
        } else {
            self.cur
                .and_then(|id| self.list.node_forward_at_level(id, self.t, 0))
        };
        self.cur = next_id;
        next_id.map(|id| self.list.node_data(id))
    }
}

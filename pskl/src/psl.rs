//! The persistent skip list itself: arena, head history, and the
//! insert/remove/locate/tick operations that keep every past version of the
//! dictionary queryable.

use std::collections::BTreeSet;

use log::{debug, warn};
use pskl_core::{Error, Result, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PslConfig;
use crate::node::{AppendOutcome, Node, NodeId};
use crate::query::{IterAt, Predecessor};
use crate::tsa::TimeStampedArray;

/// A partially persistent ordered dictionary.
///
/// Every mutation (`insert`, `remove`) happens at the current `present`.
/// Advancing the present with `tick` freezes everything written so far:
/// every query at a timestamp `t <= present` — no matter how long ago `t`
/// was ticked past — keeps returning exactly what was live at `t`, forever.
///
/// Writers and readers are not meant to run concurrently; this structure
/// carries no internal locking (see the module documentation for why).
///
/// # Example
///
/// ```
/// use pskl::PersistentSkipList;
///
/// let mut list = PersistentSkipList::new();
/// list.insert(5).unwrap();
/// list.insert(2).unwrap();
/// let past = list.present();
/// list.tick().unwrap();
/// list.insert(8).unwrap();
///
/// assert_eq!(list.locate(past, &5).unwrap().data(), Some(&2));
/// assert_eq!(list.locate(list.present(), &9).unwrap().data(), Some(&8));
/// ```
pub struct PersistentSkipList<T> {
    arena: Vec<Node<T>>,
    head_history: Vec<TimeStampedArray>,
    data_set: BTreeSet<T>,
    present: Timestamp,
    max_height: usize,
    config: PslConfig,
    rng: StdRng,
}

impl<T> PersistentSkipList<T> {
    /// Creates an empty list with default configuration.
    pub fn new() -> Self {
        Self::with_config(PslConfig::default())
    }

    /// Creates an empty list with the given configuration.
    pub fn with_config(config: PslConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            arena: Vec::new(),
            head_history: Vec::new(),
            data_set: BTreeSet::new(),
            present: 0,
            max_height: 0,
            config,
            rng,
        }
    }

    /// The current present timestamp.
    pub fn present(&self) -> Timestamp {
        self.present
    }

    /// The greatest height any node has had since this list was created
    /// (spec §3's `max_height`). A high-water mark, not a live recount: a
    /// node's height never changes once drawn, so removing the tallest
    /// live node cannot be detected here without rescanning the arena, and
    /// this accessor doesn't do that — it only ever grows, on insertion of
    /// a node taller than anything seen so far.
    pub fn max_height(&self) -> usize {
        self.max_height
    }

    /// Advances the present by one, freezing every TSA written so far.
    ///
    /// Returns `Error::OutOfRange` if the configured `max_timestamp` would
    /// be exceeded, leaving the list unchanged.
    pub fn tick(&mut self) -> Result<Timestamp> {
        let next = self
            .present
            .checked_add(1)
            .filter(|&n| n <= self.config.max_timestamp)
            .ok_or(Error::OutOfRange {
                t: self.present.saturating_add(1),
                present: self.present,
            })?;

        if let Some(last) = self.head_history.last_mut() {
            last.lock();
            let copy = TimeStampedArray::copy_of(next, last);
            self.head_history.push(copy);
        }
        self.present = next;
        debug!("tick -> present={}", self.present);
        Ok(self.present)
    }

    fn push_node(&mut self, node: Node<T>) -> NodeId {
        let id = NodeId::new(self.arena.len());
        self.arena.push(node);
        id
    }

    /// Coalescing append to the head history: replaces the last entry if
    /// it's already timestamped at `tsa`'s time, otherwise locks it and
    /// pushes. The head history carries no fatness bound — it grows one
    /// entry per timestamp at which the top-of-list pointers actually
    /// changed, which the rest of the structure's workload bounds on its
    /// own.
    fn push_head(&mut self, tsa: TimeStampedArray) {
        if let Some(last) = self.head_history.last() {
            if last.time() == tsa.time() {
                *self.head_history.last_mut().unwrap() = tsa;
                return;
            }
        }
        if let Some(last) = self.head_history.last_mut() {
            last.lock();
        }
        self.head_history.push(tsa);
    }

    pub(crate) fn head_at(&self, t: Timestamp) -> Option<&TimeStampedArray> {
        if self.head_history.is_empty() {
            return None;
        }
        let idx = self.head_history.partition_point(|tsa| tsa.time() <= t);
        if idx == 0 {
            None
        } else {
            Some(&self.head_history[idx - 1])
        }
    }

    pub(crate) fn node_data(&self, id: NodeId) -> &T {
        self.arena[id.index()].data()
    }

    pub(crate) fn node_forward_at_level(&self, id: NodeId, t: Timestamp, l: usize) -> Option<NodeId> {
        self.arena[id.index()].forward_at_level(t, l)
    }

    fn check_timestamp(&self, t: Timestamp) -> Result<()> {
        if t > self.present {
            return Err(Error::OutOfRange {
                t,
                present: self.present,
            });
        }
        Ok(())
    }

    fn draw_height(&mut self) -> usize {
        1 + self.rng.gen::<u64>().trailing_ones() as usize
    }
}

impl<T> Default for PersistentSkipList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Clone> PersistentSkipList<T> {
    /// Inserts `data` at the present.
    ///
    /// Returns `Error::Duplicate` without mutating the list if `data` is
    /// already live at the present.
    pub fn insert(&mut self, data: T) -> Result<()> {
        if self.data_set.contains(&data) {
            debug!("insert: duplicate rejected");
            return Err(Error::Duplicate);
        }

        let t = self.present;
        let height = self.draw_height();

        if self.head_history.is_empty() {
            self.bootstrap_insert(data, height, t);
            debug_assert!(
                self.check_invariants(self.present).is_ok(),
                "insert (bootstrap) left an invariant violated at t={t}"
            );
            return Ok(());
        }

        let head_snapshot = self.head_at(t).cloned();
        let mut preds: Vec<Option<NodeId>> = vec![None; height];
        let mut succs: Vec<Option<NodeId>> = vec![None; height];
        let mut cur: Option<NodeId> = None;
        for l in (0..height).rev() {
            loop {
                let next = match cur {
                    None => head_snapshot.as_ref().and_then(|h| h.get(l)),
                    Some(id) => self.arena[id.index()].forward_at_level(t, l),
                };
                match next {
                    Some(candidate) if self.arena[candidate.index()].lt_key(&data) => {
                        cur = Some(candidate);
                    }
                    other => {
                        succs[l] = other;
                        break;
                    }
                }
            }
            preds[l] = cur;
        }

        let fat = self.config.fat_for_height(height);
        let new_id = self.push_node(Node::new(data.clone(), height, fat));

        let mut new_forward = TimeStampedArray::new(t, height);
        for l in 0..height {
            new_forward.set(l, succs[l]);
            if let Some(succ) = succs[l] {
                self.arena[succ.index()].set_back(l, Some(new_id));
            }
            self.arena[new_id.index()].set_back(l, preds[l]);
        }

        let mut hi = height as isize - 1;
        while hi >= 0 {
            let l = hi as usize;
            let pred = preds[l];
            let mut lo = l;
            while lo > 0 && preds[lo - 1] == pred {
                lo -= 1;
            }
            self.rewrite_predecessor(pred, lo, l, t, |_lvl| Some(new_id));
            if lo == 0 {
                break;
            }
            hi = lo as isize - 1;
        }

        self.arena[new_id.index()].append_forward(new_forward);
        self.max_height = self.max_height.max(height);
        self.data_set.insert(data);
        debug!("insert committed at t={t}, height={height}");
        debug_assert!(
            self.check_invariants(self.present).is_ok(),
            "insert left an invariant violated at t={t}"
        );
        Ok(())
    }

    fn bootstrap_insert(&mut self, data: T, height: usize, t: Timestamp) {
        let fat = self.config.fat_for_height(height);
        let new_id = self.push_node(Node::new(data.clone(), height, fat));

        let mut head_tsa = TimeStampedArray::new(t, height);
        for l in 0..height {
            head_tsa.set(l, Some(new_id));
        }
        self.push_head(head_tsa);

        let forward = TimeStampedArray::new(t, height);
        self.arena[new_id.index()].append_forward(forward);

        self.max_height = height;
        self.data_set.insert(data);
        debug!("insert (bootstrap) committed at t={t}, height={height}");
    }

    /// Removes `data` at the present.
    ///
    /// Returns `Error::Absent` without mutating the list if `data` is not
    /// live at the present.
    pub fn remove(&mut self, data: &T) -> Result<()> {
        if !self.data_set.contains(data) {
            debug!("remove: absent datum rejected");
            return Err(Error::Absent);
        }

        let t = self.present;
        let head_snapshot = self.head_at(t).cloned();
        let top = head_snapshot.as_ref().map_or(0, |h| h.size());

        let mut cur: Option<NodeId> = None;
        for l in (0..top).rev() {
            loop {
                let next = match cur {
                    None => head_snapshot.as_ref().and_then(|h| h.get(l)),
                    Some(id) => self.arena[id.index()].forward_at_level(t, l),
                };
                match next {
                    Some(candidate) if self.arena[candidate.index()].lt_key(data) => {
                        cur = Some(candidate);
                    }
                    _ => break,
                }
            }
        }

        let target = match cur {
            None => head_snapshot.as_ref().and_then(|h| h.get(0)),
            Some(id) => self.arena[id.index()].forward_at_level(t, 0),
        };
        let target_id = match target {
            Some(id)
                if !self.arena[id.index()].lt_key(data) && !self.arena[id.index()].gt_key(data) =>
            {
                id
            }
            _ => return Err(Error::Absent),
        };

        let height = self.arena[target_id.index()].get_height();
        let preds: Vec<Option<NodeId>> = (0..height)
            .map(|l| self.arena[target_id.index()].get_back(l))
            .collect();
        let succs: Vec<Option<NodeId>> = (0..height)
            .map(|l| self.arena[target_id.index()].forward_at_level(t, l))
            .collect();

        let mut hi = height as isize - 1;
        while hi >= 0 {
            let l = hi as usize;
            let pred = preds[l];
            let mut lo = l;
            while lo > 0 && preds[lo - 1] == pred {
                lo -= 1;
            }
            for lvl in lo..=l {
                if let Some(succ) = succs[lvl] {
                    self.arena[succ.index()].set_back(lvl, pred);
                }
            }
            // The replacement TSA for predecessor `pred` is built from
            // `pred`'s own current forward history, never from the node
            // being removed — its history is frozen, not a source for
            // future writes.
            self.rewrite_predecessor(pred, lo, l, t, |lvl| succs[lvl]);
            if lo == 0 {
                break;
            }
            hi = lo as isize - 1;
        }

        self.data_set.remove(data);
        debug!("remove committed at t={t}");
        debug_assert!(
            self.check_invariants(self.present).is_ok(),
            "remove left an invariant violated at t={t}"
        );
        Ok(())
    }

    /// Finds the finite node with the greatest datum strictly less than
    /// `key`, as of timestamp `t`.
    pub fn locate(&self, t: Timestamp, key: &T) -> Result<Predecessor<'_, T>> {
        self.check_timestamp(t)?;
        let head = self.head_at(t);
        let top = head.map_or(0, |h| h.size());

        let mut cur: Option<NodeId> = None;
        for l in (0..top).rev() {
            loop {
                let next = match cur {
                    None => head.and_then(|h| h.get(l)),
                    Some(id) => self.arena[id.index()].forward_at_level(t, l),
                };
                match next {
                    Some(candidate) if self.arena[candidate.index()].lt_key(key) => {
                        cur = Some(candidate);
                    }
                    _ => break,
                }
            }
        }
        Ok(Predecessor { list: self, id: cur })
    }

    /// A lazy iterator over every datum live at timestamp `t`, ascending.
    pub fn iter_at(&self, t: Timestamp) -> Result<IterAt<'_, T>> {
        self.check_timestamp(t)?;
        Ok(IterAt {
            list: self,
            t,
            cur: None,
            started: false,
        })
    }

    /// Walks every level at timestamp `t` and checks the two structural
    /// invariants from spec §3 — *ordering* (each level is a strictly
    /// increasing sequence) and *subsumption* (everything reachable at
    /// level `l` is also reachable at level `l - 1`) — reporting the first
    /// violation found as `Error::InvariantViolation` instead of panicking.
    ///
    /// This is the one place `InvariantViolation` is actually constructed.
    /// It's not called from `insert`/`remove` themselves — those are
    /// guarded by cheaper, narrower `debug_assert!`s at each mutation site
    /// — but harnesses that want to *catch* a broken invariant rather than
    /// abort the process (the proptest suite, in particular) call this
    /// after every operation.
    pub fn check_invariants(&self, t: Timestamp) -> Result<()> {
        self.check_timestamp(t)?;
        let head = self.head_at(t);
        let top = head.map_or(0, |h| h.size());

        let mut levels: Vec<std::collections::HashSet<NodeId>> = Vec::with_capacity(top);
        for l in 0..top {
            let mut seen = std::collections::HashSet::new();
            let mut cur = head.and_then(|h| h.get(l));
            let mut last: Option<&T> = None;
            while let Some(id) = cur {
                let data = self.arena[id.index()].data();
                if let Some(prev) = last {
                    if prev >= data {
                        return Err(Error::InvariantViolation(format!(
                            "level {l} at t={t} is not strictly increasing"
                        )));
                    }
                }
                last = Some(data);
                seen.insert(id);
                cur = self.arena[id.index()].forward_at_level(t, l);
            }
            levels.push(seen);
        }

        for l in 1..levels.len() {
            if !levels[l].is_subset(&levels[l - 1]) {
                return Err(Error::InvariantViolation(format!(
                    "level {l} at t={t} is not subsumed by level {}",
                    l - 1
                )));
            }
        }
        Ok(())
    }

    /// Writes `target_at(l)` into predecessor `pred`'s forward pointer at
    /// every level in `lo..=hi`, as a single coalesced TSA at `t`. `pred ==
    /// None` means the predecessor is the virtual head.
    ///
    /// Shared by insertion (splicing the new node in), removal (splicing
    /// the removed node's successors in), and node-copying (redirecting a
    /// fattened node's predecessors to its replacement) — in every case the
    /// rule is the same: one TSA per distinct predecessor per update.
    fn rewrite_predecessor(
        &mut self,
        pred: Option<NodeId>,
        lo: usize,
        hi: usize,
        t: Timestamp,
        mut target_at: impl FnMut(usize) -> Option<NodeId>,
    ) {
        match pred {
            None => {
                let mut head_tsa = match self.head_history.last() {
                    Some(last) if last.time() == t => last.clone(),
                    Some(last) => TimeStampedArray::copy_of(t, last),
                    None => unreachable!("head history is never empty once a node exists"),
                };
                if head_tsa.size() <= hi {
                    head_tsa = TimeStampedArray::grown(t, hi + 1, &head_tsa);
                }
                for l in lo..=hi {
                    head_tsa.set(l, target_at(l));
                }
                self.push_head(head_tsa);
            }
            Some(pred_id) => {
                let base = self.arena[pred_id.index()].current_forward().cloned();
                let mut working = match base {
                    Some(cur) if cur.time() == t => cur,
                    Some(cur) => TimeStampedArray::copy_of(t, &cur),
                    None => TimeStampedArray::new(t, self.arena[pred_id.index()].get_height()),
                };
                for l in lo..=hi {
                    working.set(l, target_at(l));
                }
                self.commit_forward(pred_id, working);
            }
        }
    }

    /// Appends `tsa` to `id`'s forward history, node-copying `id` first if
    /// its history is already at capacity. Returns the id now holding the
    /// update — `id` itself, or a freshly allocated replacement.
    fn commit_forward(&mut self, id: NodeId, tsa: TimeStampedArray) -> NodeId {
        match self.arena[id.index()].append_forward(tsa.clone()) {
            AppendOutcome::Appended | AppendOutcome::Replaced => id,
            AppendOutcome::Overflow => self.node_copy(id, tsa),
        }
    }

    /// DSST node-copying: `id`'s history is full, so its role going
    /// forward is handed to a freshly allocated node carrying only `tsa`.
    /// `id` itself is left exactly as it was — every past query through it
    /// keeps working — and every predecessor and successor it had at the
    /// present is redirected to the replacement.
    fn node_copy(&mut self, id: NodeId, tsa: TimeStampedArray) -> NodeId {
        let height = self.arena[id.index()].get_height();
        let fat = self.arena[id.index()].fat();
        warn!("node {:?} reached fatness {fat}; copying", id);

        let data = self.arena[id.index()].data().clone();
        let mut replacement = Node::new(data, height, fat);
        for l in 0..height {
            replacement.set_back(l, self.arena[id.index()].get_back(l));
        }
        let replacement_id = self.push_node(replacement);
        self.arena[replacement_id.index()].append_forward(tsa.clone());

        for l in 0..height {
            if let Some(target) = tsa.get(l) {
                self.arena[target.index()].set_back(l, Some(replacement_id));
            }
        }

        let t = tsa.time();
        let old_backs: Vec<Option<NodeId>> = (0..height)
            .map(|l| self.arena[id.index()].get_back(l))
            .collect();
        let mut hi = height as isize - 1;
        while hi >= 0 {
            let l = hi as usize;
            let pred = old_backs[l];
            let mut lo = l;
            while lo > 0 && old_backs[lo - 1] == pred {
                lo -= 1;
            }
            self.rewrite_predecessor(pred, lo, l, t, |_lvl| Some(replacement_id));
            if lo == 0 {
                break;
            }
            hi = lo as isize - 1;
        }

        replacement_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> PersistentSkipList<i32> {
        PersistentSkipList::with_config(PslConfig {
            seed: Some(seed),
            ..Default::default()
        })
    }

    #[test]
    fn draw_height_is_at_least_one_and_roughly_geometric() {
        let mut list = seeded(1);
        let mut counts = [0usize; 8];
        let trials = 20_000;
        for _ in 0..trials {
            let h = list.draw_height();
            assert!(h >= 1);
            let bucket = h.min(counts.len()) - 1;
            counts[bucket] += 1;
        }
        // P(height >= k) = 2^-(k-1): bucket 0 (height==1) should be
        // roughly half of all draws.
        let half = trials / 2;
        assert!(
            counts[0] > half / 2 && counts[0] < half + half / 2,
            "height==1 bucket {} far from expected ~{half}",
            counts[0]
        );
    }

    #[test]
    fn bootstrap_then_insert_preserves_order() {
        let mut list = seeded(42);
        for v in [5, 1, 9, 3, 7] {
            list.insert(v).unwrap();
        }
        let got: Vec<_> = list.iter_at(list.present()).unwrap().copied().collect();
        assert_eq!(got, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn max_height_tracks_the_tallest_node_ever_inserted_and_never_shrinks() {
        let mut list = seeded(9);
        assert_eq!(list.max_height(), 0);

        for v in 0..200 {
            list.insert(v).unwrap();
        }
        let high_water = list.max_height();
        assert!(high_water >= 1);

        // Removing every node (even a tallest one) must not lower the mark.
        for v in 0..200 {
            list.remove(&v).unwrap();
        }
        assert_eq!(list.max_height(), high_water);
    }

    #[test]
    fn duplicate_insert_is_rejected_and_state_is_unchanged() {
        let mut list = seeded(1);
        list.insert(1).unwrap();
        assert_eq!(list.insert(1), Err(Error::Duplicate));
        let got: Vec<_> = list.iter_at(list.present()).unwrap().copied().collect();
        assert_eq!(got, vec![1]);
    }

    #[test]
    fn remove_absent_datum_is_rejected() {
        let mut list = seeded(1);
        list.insert(1).unwrap();
        assert_eq!(list.remove(&99), Err(Error::Absent));
    }

    #[test]
    fn removal_then_reinsertion_round_trips() {
        let mut list = seeded(2);
        for v in 0..20 {
            list.insert(v).unwrap();
        }
        list.remove(&10).unwrap();
        list.insert(10).unwrap();
        let got: Vec<_> = list.iter_at(list.present()).unwrap().copied().collect();
        assert_eq!(got, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn past_survives_future_mutation() {
        let mut list = seeded(3);
        for v in [2, 4, 6, 8] {
            list.insert(v).unwrap();
        }
        let t0 = list.present();
        list.tick().unwrap();
        list.remove(&4).unwrap();
        list.insert(5).unwrap();

        let past: Vec<_> = list.iter_at(t0).unwrap().copied().collect();
        assert_eq!(past, vec![2, 4, 6, 8]);

        let present: Vec<_> = list.iter_at(list.present()).unwrap().copied().collect();
        assert_eq!(present, vec![2, 5, 6, 8]);
    }

    #[test]
    fn locate_returns_none_below_everything() {
        let mut list = seeded(4);
        list.insert(10).unwrap();
        list.insert(20).unwrap();
        assert_eq!(list.locate(list.present(), &5).unwrap().data(), None);
        assert_eq!(list.locate(list.present(), &15).unwrap().data(), Some(&10));
        assert_eq!(list.locate(list.present(), &25).unwrap().data(), Some(&20));
    }

    #[test]
    fn check_invariants_holds_across_inserts_removes_and_ticks() {
        let mut list = seeded(7);
        for v in [5, 1, 9, 3, 7, 2, 8, 4, 6, 0] {
            list.insert(v).unwrap();
            assert!(list.check_invariants(list.present()).is_ok());
            list.tick().unwrap();
        }
        list.remove(&5).unwrap();
        assert!(list.check_invariants(list.present()).is_ok());
        // And every earlier timestamp is still structurally sound.
        for t in 0..=list.present() {
            assert!(list.check_invariants(t).is_ok());
        }
    }

    #[test]
    fn check_invariants_rejects_out_of_range_timestamp() {
        let list = seeded(8);
        assert_eq!(
            list.check_invariants(5).unwrap_err(),
            Error::OutOfRange { t: 5, present: 0 }
        );
    }

    #[test]
    fn query_past_the_present_is_out_of_range() {
        let list = seeded(5);
        assert_eq!(
            list.locate(1, &0).unwrap_err(),
            Error::OutOfRange { t: 1, present: 0 }
        );
    }

    #[test]
    fn node_copy_preserves_frozen_history_under_repeated_churn() {
        // Node 0 stays the immediate predecessor of every value inserted
        // below it, round after round, at a fresh timestamp each time —
        // enough writes to exceed its fatness and force at least one
        // node-copy. Every earlier snapshot must still see node 0 as the
        // predecessor it actually was at that moment.
        let mut list = seeded(6);
        list.insert(0).unwrap();
        list.tick().unwrap();

        let mut value = 1_000_000;
        let mut snapshots = Vec::new();
        for _ in 0..40 {
            value -= 1;
            list.insert(value).unwrap();
            snapshots.push((list.present(), value));
            list.tick().unwrap();
        }

        for (t, inserted_at_t) in &snapshots {
            let pred = list.locate(*t, inserted_at_t).unwrap();
            assert_eq!(pred.data(), Some(&0));
        }

        let present = list.present();
        let got: Vec<_> = list.iter_at(present).unwrap().copied().collect();
        assert_eq!(got.first(), Some(&0));
        assert_eq!(got.len(), 41);
    }
}

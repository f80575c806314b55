//! The quorum model: classifying vote sets by a configured majority family.
//!
//! The source keeps the quorum family as a phantom type parameter on `Votes`.
//! Per the design notes, we instead carry it as a runtime value on the
//! container — simpler in a language without the source's type-class
//! machinery, and it lets a topology pick Classic vs Fast at load time
//! instead of at compile time.

use std::collections::BTreeMap;

use gpaxos_ids::AcceptorId;
use serde::{Deserialize, Serialize};

////////////////////////////////////////////// QuorumFamily //////////////////////////////////////////

/// A family of quorums, parameterized by the fraction of the full acceptor
/// set a vote set must exceed to count as a quorum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuorumFamily {
    fraction: f64,
}

impl QuorumFamily {
    /// `MajorityQuorum(frac)`: `is_quorum(v) ⇔ |v| > acceptors_num · frac`.
    pub const fn majority(fraction: f64) -> Self {
        Self { fraction }
    }

    /// The classic, two-phase majority: more than half.
    pub const CLASSIC: QuorumFamily = QuorumFamily::majority(0.5);

    /// The fast-path majority: more than three quarters.
    pub const FAST: QuorumFamily = QuorumFamily::majority(0.75);

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    fn quorum_threshold(&self, acceptors_num: u64) -> f64 {
        acceptors_num as f64 * self.fraction
    }

    /// `is_sub_intersection_with_quorum(q, v) ⇔ |v| > |q| + acceptors_num·(frac−1)`.
    ///
    /// Derived from the pigeonhole bound `|q ∩ r| ≥ |q| + |r| − N` that holds
    /// for any two quorums `q, r` of this family: it asks whether a vote set
    /// of size `v_len` is guaranteed to intersect a quorum of size `q_len` in
    /// at least one acceptor.
    pub fn is_sub_intersection_with_quorum(
        &self,
        acceptors_num: u64,
        q_len: usize,
        v_len: usize,
    ) -> bool {
        v_len as f64 > q_len as f64 + acceptors_num as f64 * (self.fraction - 1.0)
    }
}

///////////////////////////////////////////////// Votes //////////////////////////////////////////////

/// A mapping from acceptor identity to a vote value `V`, tagged by the
/// quorum family against which it should be judged and bounded by the full
/// acceptor set.
#[derive(Clone, Debug)]
pub struct Votes<V> {
    acceptors_num: u64,
    family: QuorumFamily,
    votes: BTreeMap<AcceptorId, V>,
}

impl<V: Clone> Votes<V> {
    pub fn new(acceptors_num: u64, family: QuorumFamily) -> Self {
        Self {
            acceptors_num,
            family,
            votes: BTreeMap::new(),
        }
    }

    pub fn acceptors_num(&self) -> u64 {
        self.acceptors_num
    }

    pub fn family(&self) -> QuorumFamily {
        self.family
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Record (or overwrite) `who`'s vote.
    pub fn insert(&mut self, who: AcceptorId, vote: V) {
        self.votes.insert(who, vote);
    }

    pub fn get(&self, who: AcceptorId) -> Option<&V> {
        self.votes.get(&who)
    }

    pub fn contains(&self, who: AcceptorId) -> bool {
        self.votes.contains_key(&who)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AcceptorId, &V)> {
        self.votes.iter().map(|(k, v)| (*k, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.votes.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = AcceptorId> + '_ {
        self.votes.keys().copied()
    }

    fn is_quorum_of_size(&self, size: usize) -> bool {
        size as f64 > self.family.quorum_threshold(self.acceptors_num)
    }

    /// `is_quorum(v) ⇔ |v| > acceptors_num · frac`.
    pub fn is_quorum(&self) -> bool {
        self.is_quorum_of_size(self.votes.len())
    }

    /// `is_min_quorum(v) ⇔ is_quorum(v) ∧ ¬is_quorum(drop_one(v))`: a quorum
    /// that stops being one if any single vote is removed.
    pub fn is_min_quorum(&self) -> bool {
        if !self.is_quorum() {
            return false;
        }
        match self.votes.len().checked_sub(1) {
            Some(n) => !self.is_quorum_of_size(n),
            None => true,
        }
    }

    /// Whether a vote set of this size is guaranteed to intersect a quorum
    /// of size `self.len()` drawn from the same family.
    pub fn intersects_as_quorum(&self, other_len: usize) -> bool {
        self.family
            .is_sub_intersection_with_quorum(self.acceptors_num, self.votes.len(), other_len)
    }

    /// True if the votes received so far from `pred`-satisfying acceptors
    /// alone would already form a quorum. This is the counting form of "some
    /// minimum quorum's subset of votes all satisfy `pred`": any quorum
    /// built purely from `pred`-satisfying members contains, as a subset,
    /// some minimum quorum of exactly that kind.
    pub fn exists_quorum_where<F: Fn(&V) -> bool>(&self, pred: F) -> bool {
        let count = self.votes.values().filter(|v| pred(v)).count();
        self.is_quorum_of_size(count)
    }

    /// Enumerate every subset of the current votes (as fresh `Votes`
    /// instances sharing this family and acceptor count). Exponential in
    /// `len()`; intended for small, test-scale acceptor sets only.
    pub fn all_subsets(&self) -> Vec<Votes<V>> {
        let entries: Vec<(AcceptorId, V)> = self.votes.iter().map(|(k, v)| (*k, v.clone())).collect();
        let n = entries.len();
        assert!(n <= 20, "all_subsets is exponential; keep acceptor sets small");
        let mut out = Vec::with_capacity(1 << n);
        for mask in 0..(1u32 << n) {
            let mut v = Votes::new(self.acceptors_num, self.family);
            for (i, (id, val)) in entries.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    v.insert(*id, val.clone());
                }
            }
            out.push(v);
        }
        out
    }

    /// All subsets that are quorums.
    pub fn all_quorums_of(&self) -> Vec<Votes<V>> {
        self.all_subsets().into_iter().filter(|v| v.is_quorum()).collect()
    }

    /// All subsets that are minimum quorums.
    pub fn all_min_quorums_of(&self) -> Vec<Votes<V>> {
        self.all_subsets()
            .into_iter()
            .filter(|v| v.is_min_quorum())
            .collect()
    }
}

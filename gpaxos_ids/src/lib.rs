//! Stable identifiers shared by every role in the generalized-paxos workspace.
//!
//! Modeled on `rescrv-blue/id`'s `generate_id!` convention of wrapping a
//! primitive in a newtype with a readable `Debug`/`Display`, but simplified
//! to plain integers: the spec calls for "a positive integer identity,
//! stable for a run", not the 128-bit identifiers `one_two_eight` mints.

use std::fmt;

use serde::{Deserialize, Serialize};

///////////////////////////////////////////// AcceptorId ////////////////////////////////////////////

/// A positive integer identity, stable for the lifetime of a run.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AcceptorId(pub u64);

impl AcceptorId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AcceptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acceptor:{}", self.0)
    }
}

impl From<u64> for AcceptorId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

////////////////////////////////////////////// LearnerId /////////////////////////////////////////////

/// Identity of a learner. Distinct type from [AcceptorId] so a learner and an
/// acceptor that happen to share a numeric id can never be confused at a
/// type boundary.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LearnerId(pub u64);

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "learner:{}", self.0)
    }
}

impl From<u64> for LearnerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

///////////////////////////////////////////// ProposerId /////////////////////////////////////////////

/// Identity of a proposer. Topologies with a single proposer still carry one,
/// so tests that run several proposers concurrently (fast-path conflict
/// scenarios) need no special casing.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ProposerId(pub u64);

impl fmt::Display for ProposerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proposer:{}", self.0)
    }
}

impl From<u64> for ProposerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

////////////////////////////////////////////// BallotId ///////////////////////////////////////////////

/// A totally ordered integer. The initial value, `-1`, means "nothing heard
/// yet" and must compare below every ballot ever issued.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct BallotId(i64);

impl BallotId {
    /// "Nothing heard" — the initial value of every acceptor and leader.
    pub const NONE: BallotId = BallotId(-1);

    pub fn new(n: i64) -> Self {
        Self(n)
    }

    /// The next ballot strictly greater than `self`.
    pub fn next(self) -> Self {
        BallotId(self.0 + 1)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for BallotId {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ballot:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ballot_none_is_smallest() {
        assert!(BallotId::NONE < BallotId::new(0));
        assert!(BallotId::NONE < BallotId::new(i64::MAX));
    }

    #[test]
    fn ballot_next_is_monotone() {
        let b = BallotId::new(4);
        assert!(b < b.next());
    }

    #[test]
    fn acceptor_id_display() {
        assert_eq!(AcceptorId::new(3).to_string(), "acceptor:3");
    }
}

//! Logical role identity, the `(role, id)` address pairs messages are
//! addressed by (spec §6: "generic address = (role, id)").

use std::fmt;

use gpaxos_ids::{AcceptorId, LearnerId, ProposerId};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Address {
    Proposer(ProposerId),
    /// The leader is a topology-wide singleton.
    Leader,
    Acceptor(AcceptorId),
    Learner(LearnerId),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Proposer(p) => write!(f, "{p}"),
            Address::Leader => write!(f, "leader"),
            Address::Acceptor(a) => write!(f, "{a}"),
            Address::Learner(l) => write!(f, "{l}"),
        }
    }
}

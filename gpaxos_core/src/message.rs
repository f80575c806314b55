//! The wire messages exchanged between roles (spec §4.3).

use gpaxos_cstruct::{Command, Configuration};
use gpaxos_ids::{AcceptorId, BallotId};

#[derive(Clone, Debug)]
pub enum Message<C: Command> {
    /// Proposer → Leader (classic). The topology's proposal schedule also
    /// uses this shape to trigger a proposer, since a proposer is never the
    /// *recipient* of a genuine `Proposal` from anyone but the schedule.
    Proposal(C),
    /// Topology → Leader: start the next ballot now. Not a message between
    /// roles in the source protocol — the topology's ballot schedule is an
    /// external driver, same as the proposal schedule's trigger.
    StartBallot,
    /// Proposer → Acceptors (fast).
    FastProposal(C, BallotId),
    /// Leader → Acceptors.
    Phase1a(BallotId),
    /// Acceptor → Leader.
    Phase1b(AcceptorId, BallotId, Configuration<C>),
    /// Leader → Acceptors.
    Phase2a(BallotId, Configuration<C>),
    /// Acceptor → Learners (and, in the fast variant, the Leader).
    Phase2b(AcceptorId, BallotId, Configuration<C>),
}

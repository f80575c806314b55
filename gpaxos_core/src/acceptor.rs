//! The acceptor role (spec §4.5), extended with the fast-path handler from
//! §4.7.

use gpaxos_cstruct::{Command, Configuration};
use gpaxos_ids::{AcceptorId, BallotId};
use gpaxos_sim::{Action, Process, TimerId};

use crate::address::Address;
use crate::error::CoreError;
use crate::message::Message;
use crate::metrics::PROTOCOL_VIOLATIONS;
use crate::variant::Variant;

pub struct Acceptor<C: Command> {
    id: AcceptorId,
    leader: Address,
    learners: Vec<Address>,
    variant: Variant,
    ballot: BallotId,
    cstruct: Configuration<C>,
    /// Protocol violations observed locally (spec §7), surfaced to the
    /// monitor's per-run error log rather than only logged via `tracing`.
    violations: Vec<CoreError>,
}

impl<C: Command + 'static> Acceptor<C> {
    pub fn new(id: AcceptorId, leader: Address, learners: Vec<Address>, variant: Variant) -> Self {
        Self {
            id,
            leader,
            learners,
            variant,
            ballot: BallotId::default(),
            cstruct: Configuration::empty(),
            violations: Vec::new(),
        }
    }

    pub fn ballot(&self) -> BallotId {
        self.ballot
    }

    pub fn cstruct(&self) -> &Configuration<C> {
        &self.cstruct
    }

    pub fn violations(&self) -> &[CoreError] {
        &self.violations
    }

    fn broadcast_2b(&self) -> Vec<Action<Address, Message<C>>> {
        let mut out: Vec<_> = self
            .learners
            .iter()
            .map(|&to| Action::Send {
                to,
                msg: Message::Phase2b(self.id, self.ballot, self.cstruct.clone()),
            })
            .collect();
        if self.variant.is_fast() {
            out.push(Action::Send {
                to: self.leader,
                msg: Message::Phase2b(self.id, self.ballot, self.cstruct.clone()),
            });
        }
        out
    }

    fn on_phase1a(&mut self, ballot: BallotId) -> Vec<Action<Address, Message<C>>> {
        if ballot > self.ballot {
            self.ballot = ballot;
            vec![Action::Send {
                to: self.leader,
                msg: Message::Phase1b(self.id, self.ballot, self.cstruct.clone()),
            }]
        } else {
            Vec::new()
        }
    }

    fn on_phase2a(&mut self, ballot: BallotId, proposed: Configuration<C>) -> Vec<Action<Address, Message<C>>> {
        if ballot != self.ballot {
            return Vec::new();
        }
        if !proposed.extends(&self.cstruct) {
            PROTOCOL_VIOLATIONS.click();
            let detail = format!(
                "acceptor {} ballot {}: phase2a does not extend local cstruct, dropping",
                self.id, ballot
            );
            tracing::warn!(acceptor = %self.id, ballot = %ballot, "phase2a does not extend local cstruct, dropping");
            self.violations.push(CoreError::protocol_violation(detail));
            return Vec::new();
        }
        self.cstruct = proposed;
        self.broadcast_2b()
    }

    fn on_fast_proposal(&mut self, policy: C, ballot: BallotId) -> Vec<Action<Address, Message<C>>> {
        if ballot < self.ballot {
            return Vec::new();
        }
        self.ballot = self.ballot.max(ballot);
        let (_, next) = self.cstruct.accept_or_reject_command(policy);
        self.cstruct = next;
        self.broadcast_2b()
    }
}

impl<C: Command + 'static> Process<Address, Message<C>> for Acceptor<C> {
    fn address(&self) -> Address {
        Address::Acceptor(self.id)
    }

    fn on_init(&mut self) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_timeout(&mut self, _timer: TimerId) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_message(&mut self, _from: Address, msg: Message<C>) -> Vec<Action<Address, Message<C>>> {
        match msg {
            Message::Phase1a(b) => self.on_phase1a(b),
            Message::Phase2a(b, s) => self.on_phase2a(b, s),
            Message::FastProposal(c, b) => {
                if self.variant.is_fast() {
                    self.on_fast_proposal(c, b)
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpaxos_cstruct::Policy;
    use gpaxos_ids::LearnerId;

    fn learners(n: u64) -> Vec<Address> {
        (0..n).map(|i| Address::Learner(LearnerId(i))).collect()
    }

    #[test]
    fn phase1a_with_higher_ballot_replies() {
        let mut acc: Acceptor<Policy> =
            Acceptor::new(AcceptorId::new(0), Address::Leader, learners(1), Variant::Classic);
        let actions = acc.on_message(Address::Leader, Message::Phase1a(BallotId::new(0)));
        assert_eq!(actions.len(), 1);
        assert_eq!(acc.ballot(), BallotId::new(0));
    }

    #[test]
    fn phase1a_with_stale_ballot_is_ignored() {
        let mut acc: Acceptor<Policy> =
            Acceptor::new(AcceptorId::new(0), Address::Leader, learners(1), Variant::Classic);
        acc.on_message(Address::Leader, Message::Phase1a(BallotId::new(5)));
        let actions = acc.on_message(Address::Leader, Message::Phase1a(BallotId::new(2)));
        assert!(actions.is_empty());
        assert_eq!(acc.ballot(), BallotId::new(5));
    }

    #[test]
    fn phase2a_conflicting_extension_is_dropped() {
        let mut acc: Acceptor<Policy> =
            Acceptor::new(AcceptorId::new(0), Address::Leader, learners(1), Variant::Classic);
        acc.on_message(Address::Leader, Message::Phase1a(BallotId::new(0)));
        let already = Configuration::singleton(gpaxos_cstruct::Acceptance::Accepted(Policy::Bad("y".to_string())));
        acc.on_message(Address::Leader, Message::Phase2a(BallotId::new(0), already.clone()));
        assert!(acc.cstruct().contains_command(&Policy::Bad("y".to_string())));

        // A second ballot proposes a payload that does not extend what the
        // acceptor already holds: it must be dropped, not adopted.
        acc.on_message(Address::Leader, Message::Phase1a(BallotId::new(1)));
        let non_extending = Configuration::singleton(gpaxos_cstruct::Acceptance::Accepted(Policy::Bad("x".to_string())));
        let actions = acc.on_message(Address::Leader, Message::Phase2a(BallotId::new(1), non_extending));
        assert!(actions.is_empty());
        assert_eq!(acc.cstruct(), &already);
        assert_eq!(acc.violations().len(), 1);
    }

    #[test]
    fn fast_proposal_updates_cstruct_and_broadcasts_to_leader() {
        let mut acc: Acceptor<Policy> = Acceptor::new(
            AcceptorId::new(0),
            Address::Leader,
            learners(2),
            Variant::Fast { recovery_delay: 1_000 },
        );
        let actions = acc.on_message(
            Address::Leader,
            Message::FastProposal(Policy::Good("p1".to_string()), BallotId::new(0)),
        );
        // two learners + the leader
        assert_eq!(actions.len(), 3);
        assert!(acc.cstruct().contains_command(&Policy::Good("p1".to_string())));
    }
}

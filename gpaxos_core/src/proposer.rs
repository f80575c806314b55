//! The proposer role: forwards each triggered policy to the leader
//! (classic), or directly to every acceptor plus the leader (fast), per
//! spec §4.3/§4.7 — the fast variant's leader copy keeps the policy in the
//! leader's pending queue so a classic recovery ballot can reconcile it if
//! the fast path never converges.

use gpaxos_cstruct::Command;
use gpaxos_ids::{BallotId, ProposerId};
use gpaxos_sim::{Action, Process, TimerId};

use crate::address::Address;
use crate::message::Message;
use crate::metrics::PROPOSALS_TOTAL;
use crate::variant::Variant;

pub struct Proposer<C: Command> {
    id: ProposerId,
    acceptors: Vec<Address>,
    variant: Variant,
    /// The ballot a fast proposal is sent under. The spec's sample config
    /// treats proposer insistence as fire-and-forget (`topologyProposerInsistance
    /// = \_ -> mempty`); we don't track acknowledgement, just resend under
    /// whatever ballot the topology's reproposal schedule re-triggers with.
    fast_ballot: BallotId,
    ever_proposed: Vec<C>,
}

impl<C: Command + 'static> Proposer<C> {
    pub fn new(id: ProposerId, acceptors: Vec<Address>, variant: Variant) -> Self {
        Self {
            id,
            acceptors,
            variant,
            fast_ballot: BallotId::default(),
            ever_proposed: Vec::new(),
        }
    }

    pub fn ever_proposed(&self) -> &[C] {
        &self.ever_proposed
    }

    fn propose(&mut self, policy: C) -> Vec<Action<Address, Message<C>>> {
        PROPOSALS_TOTAL.click();
        self.ever_proposed.push(policy.clone());
        match self.variant {
            Variant::Classic => vec![Action::Send {
                to: Address::Leader,
                msg: Message::Proposal(policy),
            }],
            Variant::Fast { .. } => {
                // Broadcast the fast proposal to every acceptor for the
                // fast-path short-circuit, but also hand it to the leader
                // (via the same classic `Proposal` the leader's
                // `remember_proposal` expects) so that if the fast path
                // never converges on it, the leader's periodic classic
                // ballot has the policy in `pending` to reconcile (spec
                // §4.7 conflict recovery).
                let mut out: Vec<_> = self
                    .acceptors
                    .iter()
                    .map(|&to| Action::Send {
                        to,
                        msg: Message::FastProposal(policy.clone(), self.fast_ballot),
                    })
                    .collect();
                out.push(Action::Send {
                    to: Address::Leader,
                    msg: Message::Proposal(policy),
                });
                out
            }
        }
    }
}

impl<C: Command + 'static> Process<Address, Message<C>> for Proposer<C> {
    fn address(&self) -> Address {
        Address::Proposer(self.id)
    }

    fn on_init(&mut self) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_timeout(&mut self, _timer: TimerId) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_message(&mut self, _from: Address, msg: Message<C>) -> Vec<Action<Address, Message<C>>> {
        match msg {
            Message::Proposal(policy) => self.propose(policy),
            _ => Vec::new(),
        }
    }
}

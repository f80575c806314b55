//! The classic leader role (spec §4.4). Used unmodified by the Fast variant
//! too: fast-path conflicts are reconciled by this same ballot machinery,
//! running on whatever period the topology configures (bounded by
//! `recovery_delay` for fast topologies — see [crate::variant::Variant]).

use gpaxos_cstruct::{combination, Command, Configuration};
use gpaxos_ids::{AcceptorId, BallotId};
use gpaxos_quorum::{QuorumFamily, Votes};
use gpaxos_sim::{Action, Process, TimerId};

use crate::address::Address;
use crate::message::Message;
use crate::metrics::{BALLOTS_STARTED, QUORUMS_FORMED, RECOVERIES_INITIATED};
use crate::variant::Variant;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Idle,
    Collecting1b,
    Collecting2b,
}

pub struct Leader<C: Command> {
    acceptors: Vec<Address>,
    acceptors_num: u64,
    variant: Variant,
    ballot: BallotId,
    phase: Phase,
    /// Policies remembered but not yet bound to a ballot.
    pending: Vec<C>,
    /// Policies bound to the ballot currently in flight.
    in_flight: Vec<C>,
    votes_1b: Votes<Configuration<C>>,
    /// Count of ballots this leader started, in the Fast variant, while a
    /// proposal forwarded from the fast path was still outstanding — i.e.
    /// a classic-recovery round per spec §4.7. There is no separate
    /// recovery-trigger message (see [Variant]'s doc comment): every such
    /// periodic ballot *is* the recovery mechanism.
    recoveries_initiated: u64,
}

impl<C: Command + 'static> Leader<C> {
    pub fn new(acceptors: Vec<Address>, variant: Variant) -> Self {
        let acceptors_num = acceptors.len() as u64;
        Self {
            acceptors,
            acceptors_num,
            variant,
            ballot: BallotId::default(),
            phase: Phase::Idle,
            pending: Vec::new(),
            in_flight: Vec::new(),
            votes_1b: Votes::new(acceptors_num, QuorumFamily::CLASSIC),
            recoveries_initiated: 0,
        }
    }

    pub fn ballot(&self) -> BallotId {
        self.ballot
    }

    pub fn recoveries_initiated(&self) -> u64 {
        self.recoveries_initiated
    }

    /// `remember_proposal`: append to the pending queue. Idempotent in
    /// effect — duplicates are permitted here, the CStruct itself dedups on
    /// insertion.
    pub fn remember_proposal(&mut self, policy: C) {
        self.pending.push(policy);
    }

    /// Start the next ballot. A ballot that never collected a 1b quorum is
    /// simply superseded here: its policies stayed in `in_flight` from the
    /// prior round and get folded back into the next round's pending set
    /// before a fresh ballot is fixed.
    pub fn phase1a(&mut self) -> Vec<Action<Address, Message<C>>> {
        BALLOTS_STARTED.click();
        self.pending.splice(0..0, std::mem::take(&mut self.in_flight));
        if self.variant.is_fast() && !self.pending.is_empty() {
            RECOVERIES_INITIATED.click();
            self.recoveries_initiated += 1;
        }
        self.ballot = self.ballot.next();
        self.in_flight = std::mem::take(&mut self.pending);
        self.phase = Phase::Collecting1b;
        self.votes_1b = Votes::new(self.acceptors_num, QuorumFamily::CLASSIC);
        self.acceptors
            .iter()
            .map(|&to| Action::Send {
                to,
                msg: Message::Phase1a(self.ballot),
            })
            .collect()
    }

    fn on_phase1b(
        &mut self,
        acc: AcceptorId,
        ballot: BallotId,
        cstruct: Configuration<C>,
    ) -> Vec<Action<Address, Message<C>>> {
        if ballot != self.ballot || self.phase != Phase::Collecting1b {
            return Vec::new();
        }
        self.votes_1b.insert(acc, cstruct);
        if !self.votes_1b.is_quorum() {
            return Vec::new();
        }
        let combined = match combination(&self.votes_1b) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        QUORUMS_FORMED.click();
        // `combined` extends every individual 1b cstruct structurally: a
        // policy any acceptor in the quorum accepted either has quorum
        // agreement (and so is carried into `combined`) or it doesn't, in
        // which case no other 1b voter's cstruct could have extended past it
        // either without breaking non-contradiction.
        let mut extension = combined;
        for policy in self.in_flight.drain(..) {
            let (_, next) = extension.accept_or_reject_command(policy);
            extension = next;
        }
        self.phase = Phase::Collecting2b;
        self.acceptors
            .iter()
            .map(|&to| Action::Send {
                to,
                msg: Message::Phase2a(self.ballot, extension.clone()),
            })
            .collect()
    }
}

impl<C: Command + 'static> Process<Address, Message<C>> for Leader<C> {
    fn address(&self) -> Address {
        Address::Leader
    }

    fn on_init(&mut self) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_timeout(&mut self, _timer: TimerId) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_message(&mut self, _from: Address, msg: Message<C>) -> Vec<Action<Address, Message<C>>> {
        match msg {
            Message::Proposal(policy) => {
                self.remember_proposal(policy);
                Vec::new()
            }
            Message::StartBallot => self.phase1a(),
            Message::Phase1b(acc, ballot, cstruct) => self.on_phase1b(acc, ballot, cstruct),
            _ => Vec::new(),
        }
    }
}

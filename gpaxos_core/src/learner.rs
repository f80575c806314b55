//! The learner role (spec §4.6), extended to try the fast quorum family
//! before falling back to the classic one (spec §4.7: "Learners treat fast
//! 2b using FastMajorityQuorum").

use std::collections::BTreeMap;

use gpaxos_cstruct::{combination, Acceptance, Command, Configuration};
use gpaxos_ids::{AcceptorId, BallotId, LearnerId};
use gpaxos_quorum::{QuorumFamily, Votes};
use gpaxos_sim::{Action, Process, TimerId};

use crate::address::Address;
use crate::error::CoreError;
use crate::message::Message;
use crate::metrics::{FAST_PATH_SUCCESSES, QUORUMS_FORMED};
use crate::variant::Variant;

pub struct Learner<C: Command> {
    id: LearnerId,
    acceptors_num: u64,
    variant: Variant,
    votes: BTreeMap<AcceptorId, Configuration<C>>,
    learned: Configuration<C>,
    /// Contradictive-combination errors observed while trying to relearn
    /// (spec §7), surfaced to the monitor's per-run error log.
    violations: Vec<CoreError>,
}

impl<C: Command + 'static> Learner<C> {
    pub fn new(id: LearnerId, acceptors_num: u64, variant: Variant) -> Self {
        Self {
            id,
            acceptors_num,
            variant,
            votes: BTreeMap::new(),
            learned: Configuration::empty(),
            violations: Vec::new(),
        }
    }

    pub fn learned(&self) -> &Configuration<C> {
        &self.learned
    }

    pub fn violations(&self) -> &[CoreError] {
        &self.violations
    }

    /// Fast is tried first so the fast path can short-circuit without
    /// waiting for the classic quorum threshold, which is always smaller.
    fn families(&self) -> Vec<QuorumFamily> {
        if self.variant.is_fast() {
            vec![QuorumFamily::FAST, QuorumFamily::CLASSIC]
        } else {
            vec![QuorumFamily::CLASSIC]
        }
    }

    fn votes_for(&self, family: QuorumFamily) -> Votes<Configuration<C>> {
        let mut votes = Votes::new(self.acceptors_num, family);
        for (acc, cfg) in &self.votes {
            votes.insert(*acc, cfg.clone());
        }
        votes
    }

    /// `On Phase2b(acc, b, S): votes <- votes ∪ {acc -> S}`, then relearn.
    /// Returns the commands newly learned, if any, for the caller to surface
    /// as a learning callback.
    fn on_phase2b(
        &mut self,
        acc: AcceptorId,
        _ballot: BallotId,
        cstruct: Configuration<C>,
    ) -> Vec<Acceptance<C>> {
        self.votes.insert(acc, cstruct);
        for family in self.families() {
            let votes = self.votes_for(family);
            if !votes.is_quorum() {
                continue;
            }
            let combined = match combination(&votes) {
                Ok(c) => c,
                Err(e) => {
                    self.violations.push(CoreError::from(e));
                    continue;
                }
            };
            if combined.extends(&self.learned) && combined.len() > self.learned.len() {
                QUORUMS_FORMED.click();
                if family == QuorumFamily::FAST {
                    FAST_PATH_SUCCESSES.click();
                }
                let newly: Vec<Acceptance<C>> = combined
                    .iter()
                    .filter(|a| !self.learned.iter().any(|b| b == *a))
                    .cloned()
                    .collect();
                self.learned = combined;
                return newly;
            }
        }
        Vec::new()
    }
}

impl<C: Command + 'static> Process<Address, Message<C>> for Learner<C> {
    fn address(&self) -> Address {
        Address::Learner(self.id)
    }

    fn on_init(&mut self) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_timeout(&mut self, _timer: TimerId) -> Vec<Action<Address, Message<C>>> {
        Vec::new()
    }

    fn on_message(&mut self, _from: Address, msg: Message<C>) -> Vec<Action<Address, Message<C>>> {
        if let Message::Phase2b(acc, ballot, cstruct) = msg {
            let newly = self.on_phase2b(acc, ballot, cstruct);
            for acceptance in &newly {
                tracing::info!(learner = %self.id, command = ?acceptance.command(), "learned");
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpaxos_cstruct::Policy;

    #[test]
    fn classic_learner_learns_on_quorum() {
        let mut learner: Learner<Policy> = Learner::new(LearnerId(0), 3, Variant::Classic);
        let cfg = Configuration::singleton(Acceptance::Accepted(Policy::Good("p1".to_string())));
        assert!(learner
            .on_phase2b(AcceptorId::new(0), BallotId::new(0), cfg.clone())
            .is_empty());
        let newly = learner.on_phase2b(AcceptorId::new(1), BallotId::new(0), cfg);
        assert_eq!(newly.len(), 1);
        assert!(learner.learned().contains_command(&Policy::Good("p1".to_string())));
    }

    #[test]
    fn learned_never_shrinks() {
        let mut learner: Learner<Policy> = Learner::new(LearnerId(0), 3, Variant::Classic);
        let cfg = Configuration::singleton(Acceptance::Accepted(Policy::Good("p1".to_string())));
        learner.on_phase2b(AcceptorId::new(0), BallotId::new(0), cfg.clone());
        learner.on_phase2b(AcceptorId::new(1), BallotId::new(0), cfg.clone());
        let before = learner.learned().len();
        learner.on_phase2b(AcceptorId::new(2), BallotId::new(0), cfg);
        assert!(learner.learned().len() >= before);
    }

    #[test]
    fn fast_learner_prefers_fast_quorum() {
        let mut learner: Learner<Policy> =
            Learner::new(LearnerId(0), 4, Variant::Fast { recovery_delay: 1_000 });
        let cfg = Configuration::singleton(Acceptance::Accepted(Policy::Good("p1".to_string())));
        for i in 0..4 {
            learner.on_phase2b(AcceptorId::new(i), BallotId::new(0), cfg.clone());
        }
        assert!(learner.learned().contains_command(&Policy::Good("p1".to_string())));
    }
}

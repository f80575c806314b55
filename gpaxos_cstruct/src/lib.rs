//! The CStruct algebra: commands, acceptance/rejection, the conflict
//! relation, the partial order it induces, and the `combination` operation
//! that reconciles a quorum's worth of acceptor cstructs into one.

use std::collections::BTreeSet;

use gpaxos_quorum::Votes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/////////////////////////////////////////////// Command ///////////////////////////////////////////////

/// A domain-opaque command. `agrees` is the conflict relation's complement:
/// two commands conflict iff `!agrees(a, b)`. Implementations must be
/// reflexive: `agrees(p, p) == true` for every `p`.
pub trait Command: Clone + Eq + Ord + std::fmt::Debug {
    fn agrees(&self, other: &Self) -> bool;
}

//////////////////////////////////////////////// Policy ////////////////////////////////////////////////

/// The test-harness command class named directly in the spec.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Policy {
    /// Agrees with everything.
    Good(String),
    /// Conflicts with every other `Bad`, agrees with everything else.
    Bad(String),
    /// Conflicts with every other `Moody` sharing its group id.
    Moody(u64, String),
}

impl Policy {
    pub fn name(&self) -> &str {
        match self {
            Policy::Good(n) | Policy::Bad(n) | Policy::Moody(_, n) => n,
        }
    }
}

impl Command for Policy {
    fn agrees(&self, other: &Self) -> bool {
        // Reflexivity is guaranteed structurally: a value always equals
        // itself, and we special-case equal values below so the general
        // rules never have to re-derive it (important for `Moody`, whose
        // general rule would otherwise say two same-group values conflict
        // even when they're the same value).
        if self == other {
            return true;
        }
        match (self, other) {
            (Policy::Good(_), _) | (_, Policy::Good(_)) => true,
            (Policy::Moody(g1, _), Policy::Moody(g2, _)) => g1 != g2,
            // Bad vs Bad (distinct names), or Bad vs Moody: conflict. The
            // spec leaves the cross-variant case unspecified; we resolve it
            // by reading "Bad conflicts with all except itself" literally.
            _ => false,
        }
    }
}

////////////////////////////////////////////// Acceptance //////////////////////////////////////////////

/// The tagged outcome of running a command through the protocol.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Acceptance<C> {
    Accepted(C),
    Rejected(C),
}

impl<C: Command> Acceptance<C> {
    pub fn command(&self) -> &C {
        match self {
            Acceptance::Accepted(c) | Acceptance::Rejected(c) => c,
        }
    }

    /// Rejection never conflicts with anything; two `Accepted` values
    /// conflict iff their inner commands conflict.
    pub fn conflicts_with(&self, other: &Self) -> bool {
        match (self, other) {
            (Acceptance::Accepted(a), Acceptance::Accepted(b)) => !a.agrees(b),
            _ => false,
        }
    }
}

///////////////////////////////////////////////// Error /////////////////////////////////////////////////

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CStructError {
    #[error("configuration is contradictive: cannot add {attempted:?} to a non-contradictive set")]
    Contradictive { attempted: String },
}

////////////////////////////////////////////// Configuration ///////////////////////////////////////////

/// The CStruct instance used throughout this workspace: a non-contradictive
/// set of `Acceptance<C>`, partially ordered by `extends` (superset).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Configuration<C: Command> {
    members: BTreeSet<Acceptance<C>>,
}

impl<C: Command> Configuration<C> {
    pub fn empty() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    pub fn singleton(a: Acceptance<C>) -> Self {
        let mut members = BTreeSet::new();
        members.insert(a);
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Acceptance<C>> {
        self.members.iter()
    }

    /// No internal pair conflicts.
    pub fn is_non_contradictive(&self) -> bool {
        for a in self.members.iter() {
            for b in self.members.iter() {
                if a.conflicts_with(b) {
                    return false;
                }
            }
        }
        true
    }

    /// `S₁ ≤ S₂ ⇔ S₁ ⊆ S₂`: does `self` extend (is a superset of) `other`?
    pub fn extends(&self, other: &Self) -> bool {
        other.members.iter().all(|a| self.members.contains(a))
    }

    /// `contains(S, c) ⇔ S extends {Accepted(c)} ∨ S extends {Rejected(c)}`.
    pub fn contains_command(&self, c: &C) -> bool {
        self.members.contains(&Acceptance::Accepted(c.clone()))
            || self.members.contains(&Acceptance::Rejected(c.clone()))
    }

    /// `add_command(c, S)`: returns `S ∪ {c}` when `c` agrees with every
    /// `Accepted` member of `S` (rejections never constrain), else fails.
    pub fn add_command(&self, c: Acceptance<C>) -> Result<Self, CStructError> {
        let conflicts = self.members.iter().any(|m| m.conflicts_with(&c));
        if conflicts {
            return Err(CStructError::Contradictive {
                attempted: format!("{c:?}"),
            });
        }
        let mut members = self.members.clone();
        members.insert(c);
        Ok(Self { members })
    }

    /// Decide whether `cmd` is acceptable against `self`, tag it
    /// accordingly, and return the extended configuration. Never fails:
    /// a conflicting command is simply rejected, and rejection never
    /// conflicts with anything.
    pub fn accept_or_reject_command(&self, cmd: C) -> (Acceptance<C>, Self) {
        let agrees_with_all = self.members.iter().all(|m| match m {
            Acceptance::Accepted(existing) => existing.agrees(&cmd),
            Acceptance::Rejected(_) => true,
        });
        let tagged = if agrees_with_all {
            Acceptance::Accepted(cmd)
        } else {
            Acceptance::Rejected(cmd)
        };
        let extended = self
            .add_command(tagged.clone())
            .expect("accept_or_reject_command always produces a non-conflicting tag");
        (tagged, extended)
    }

    /// `glb(A, B) = A ∪ B` when non-contradictive, else fails.
    pub fn glb(&self, other: &Self) -> Result<Self, CStructError> {
        let mut members = self.members.clone();
        members.extend(other.members.iter().cloned());
        let candidate = Self { members };
        if candidate.is_non_contradictive() {
            Ok(candidate)
        } else {
            Err(CStructError::Contradictive {
                attempted: "glb".to_string(),
            })
        }
    }

    /// `lub(A, B) = A ∩ B`, always defined: a subset of a non-contradictive
    /// set is itself non-contradictive.
    pub fn lub(&self, other: &Self) -> Self {
        Self {
            members: self.members.intersection(&other.members).cloned().collect(),
        }
    }
}

///////////////////////////////////////////// combination //////////////////////////////////////////////

/// Reconcile a quorum's worth of acceptor cstructs into one: a policy is
/// included, tagged `Accepted`, if some minimum quorum of acceptors voted
/// `Accepted` on it; tagged `Rejected` if some minimum quorum voted
/// `Rejected`. Fails if the result would be contradictive (both sides
/// simultaneously have a quorum, for instance).
///
/// This is formulation 1 from the design: iterate over every policy
/// mentioned by any vote, and for each, count how many voters extend a
/// singleton target — a quorum made purely of `pred`-satisfying members
/// contains, as a subset, a minimum quorum of the same kind, so counting is
/// equivalent to enumerating minimum quorums here.
pub fn combination<C: Command>(
    votes: &Votes<Configuration<C>>,
) -> Result<Configuration<C>, CStructError> {
    let mut policies: BTreeSet<C> = BTreeSet::new();
    for cfg in votes.values() {
        for acc in cfg.iter() {
            policies.insert(acc.command().clone());
        }
    }

    let mut result = Configuration::empty();
    for p in policies {
        let accepted_target = Configuration::singleton(Acceptance::Accepted(p.clone()));
        let rejected_target = Configuration::singleton(Acceptance::Rejected(p.clone()));
        let accepted_quorum = votes.exists_quorum_where(|cfg| cfg.extends(&accepted_target));
        let rejected_quorum = votes.exists_quorum_where(|cfg| cfg.extends(&rejected_target));
        if accepted_quorum {
            result = result.add_command(Acceptance::Accepted(p))?;
        } else if rejected_quorum {
            result = result.add_command(Acceptance::Rejected(p))?;
        }
    }
    Ok(result)
}

/// Formulation 2, used only to cross-check formulation 1 in tests: enumerate
/// every minimum quorum, take the `lub` (intersection) of its members'
/// cstructs, then `glb` (union-with-conflict-check) across the resulting
/// sequence.
///
/// The spec leaves open whether the two formulations agree on *all* inputs,
/// including ties where a policy could plausibly be both `Accepted` and
/// `Rejected` by different minimum quorums; we assert agreement by test
/// rather than by proof, per the open question.
pub fn combination_via_quorums<C: Command>(
    votes: &Votes<Configuration<C>>,
) -> Result<Configuration<C>, CStructError> {
    let min_quorums = votes.all_min_quorums_of();
    let mut lubs: Vec<Configuration<C>> = Vec::with_capacity(min_quorums.len());
    for q in &min_quorums {
        let mut iter = q.values().cloned();
        let first = match iter.next() {
            Some(cfg) => cfg,
            None => continue,
        };
        let combined = iter.fold(first, |acc, cfg| acc.lub(&cfg));
        lubs.push(combined);
    }
    let mut result = Configuration::empty();
    for l in lubs {
        result = result.glb(&l)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpaxos_ids::AcceptorId;
    use gpaxos_quorum::QuorumFamily;

    #[test]
    fn policy_reflexive_agrees() {
        let moody = Policy::Moody(1, "x".to_string());
        assert!(moody.agrees(&moody));
        let bad = Policy::Bad("y".to_string());
        assert!(bad.agrees(&bad));
        let good = Policy::Good("z".to_string());
        assert!(good.agrees(&good));
    }

    #[test]
    fn good_agrees_with_everything() {
        let good = Policy::Good("g".to_string());
        let bad = Policy::Bad("b".to_string());
        assert!(good.agrees(&bad));
        assert!(bad.agrees(&good));
    }

    #[test]
    fn bad_conflicts_with_other_bad() {
        let a = Policy::Bad("a".to_string());
        let b = Policy::Bad("b".to_string());
        assert!(!a.agrees(&b));
    }

    #[test]
    fn moody_conflicts_only_within_group() {
        let a = Policy::Moody(1, "a".to_string());
        let b = Policy::Moody(1, "b".to_string());
        let c = Policy::Moody(2, "c".to_string());
        assert!(!a.agrees(&b));
        assert!(a.agrees(&c));
    }

    #[test]
    fn add_command_rejects_conflict() {
        let cfg = Configuration::empty()
            .add_command(Acceptance::Accepted(Policy::Bad("a".to_string())))
            .unwrap();
        assert!(cfg
            .add_command(Acceptance::Accepted(Policy::Bad("b".to_string())))
            .is_err());
    }

    #[test]
    fn accept_or_reject_never_fails() {
        let cfg = Configuration::empty()
            .add_command(Acceptance::Accepted(Policy::Bad("a".to_string())))
            .unwrap();
        let (tag, extended) = cfg.accept_or_reject_command(Policy::Bad("b".to_string()));
        assert_eq!(tag, Acceptance::Rejected(Policy::Bad("b".to_string())));
        assert!(extended.is_non_contradictive());
    }

    #[test]
    fn extends_is_superset() {
        let p = Acceptance::Accepted(Policy::Good("a".to_string()));
        let small = Configuration::singleton(p.clone());
        let big = small.add_command(Acceptance::Accepted(Policy::Good("b".to_string()))).unwrap();
        assert!(big.extends(&small));
        assert!(!small.extends(&big));
    }

    #[test]
    fn lub_idempotent_and_commutative() {
        let a = Configuration::empty()
            .add_command(Acceptance::Accepted(Policy::Good("a".to_string())))
            .unwrap();
        let b = Configuration::empty()
            .add_command(Acceptance::Accepted(Policy::Good("b".to_string())))
            .unwrap();
        assert_eq!(a.lub(&a), a);
        assert_eq!(a.lub(&b), b.lub(&a));
    }

    #[test]
    fn glb_commutative_and_associative() {
        let a = Configuration::singleton(Acceptance::Accepted(Policy::Good("a".to_string())));
        let b = Configuration::singleton(Acceptance::Accepted(Policy::Good("b".to_string())));
        let c = Configuration::singleton(Acceptance::Accepted(Policy::Good("c".to_string())));
        assert_eq!(a.glb(&b).unwrap(), b.glb(&a).unwrap());
        let left = a.glb(&b).unwrap().glb(&c).unwrap();
        let right = a.glb(&b.glb(&c).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    fn votes_with(
        entries: Vec<(u64, Configuration<Policy>)>,
        acceptors_num: u64,
        family: QuorumFamily,
    ) -> Votes<Configuration<Policy>> {
        let mut v = Votes::new(acceptors_num, family);
        for (id, cfg) in entries {
            v.insert(AcceptorId::new(id), cfg);
        }
        v
    }

    #[test]
    fn combination_learns_with_quorum() {
        let accepted = Configuration::singleton(Acceptance::Accepted(Policy::Good("p1".to_string())));
        let votes = votes_with(
            vec![(0, accepted.clone()), (1, accepted.clone())],
            3,
            QuorumFamily::CLASSIC,
        );
        let combined = combination(&votes).unwrap();
        assert!(combined.contains_command(&Policy::Good("p1".to_string())));
    }

    #[test]
    fn combination_formulations_agree_on_simple_input() {
        let p1 = Configuration::singleton(Acceptance::Accepted(Policy::Good("p1".to_string())));
        let p2 = Configuration::empty();
        let votes = votes_with(vec![(0, p1.clone()), (1, p1.clone()), (2, p2)], 3, QuorumFamily::CLASSIC);
        let c1 = combination(&votes).unwrap();
        let c2 = combination_via_quorums(&votes).unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn all_conflicting_settles_one() {
        let bads: Vec<Configuration<Policy>> = vec!["p1", "p2", "p3"]
            .into_iter()
            .map(|n| Configuration::singleton(Acceptance::Accepted(Policy::Bad(n.to_string()))))
            .collect();
        // two acceptors saw p1 accepted, one saw p2: a classic quorum of 2-of-3
        // settles on p1 alone.
        let votes = votes_with(
            vec![(0, bads[0].clone()), (1, bads[0].clone()), (2, bads[1].clone())],
            3,
            QuorumFamily::CLASSIC,
        );
        let combined = combination(&votes).unwrap();
        assert_eq!(combined.len(), 1);
        assert!(combined.contains_command(&Policy::Bad("p1".to_string())));
    }
}

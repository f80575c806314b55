//! Wires one instance of each role into a running [Simulator], per spec
//! §4.8: "the launcher instantiates one instance of each role, starts
//! serving its message handlers, starts its schedulers, and returns a
//! *monitor handle*."

use gpaxos_cstruct::Policy;
use gpaxos_ids::{AcceptorId, LearnerId, ProposerId};
use gpaxos_scheduler::SplitSeed;
use gpaxos_sim::{DelayProfile, Simulator};

use gpaxos_core::{Acceptor, Address, Leader, Learner, Proposer, Variant};

use crate::config::{DelaySpec, TopologyConfig, VariantSpec};
use crate::monitor::Monitor;

/// How many proposers to instantiate. The spec's YAML grammar only ever
/// names a single proposer ("proposers and leader are singletons"); the
/// fast-path conflict-recovery scenario needs more than one, so that count
/// is a launch-time parameter rather than a config key.
pub fn launch(config: &TopologyConfig, seed: u64, proposer_count: u64) -> Monitor {
    let variant = match config.variant {
        VariantSpec::Classic => Variant::Classic,
        VariantSpec::Fast => Variant::Fast {
            recovery_delay: config
                .recovery_delay
                .expect("validated: fast variant carries recovery_delay"),
        },
    };

    let acceptor_addrs: Vec<Address> = (0..config.members.acceptors)
        .map(|i| Address::Acceptor(AcceptorId::new(i)))
        .collect();
    let learner_addrs: Vec<Address> = (0..config.members.learners)
        .map(|i| Address::Learner(LearnerId(i)))
        .collect();

    let mut simulator: Simulator<Address, gpaxos_core::Message<Policy>> =
        Simulator::new(SplitSeed::root(seed));

    if let Some(delays) = &config.delays {
        simulator.inject_delays(compile_delay_profile(delays));
    }

    for &addr in &acceptor_addrs {
        let id = match addr {
            Address::Acceptor(id) => id,
            _ => unreachable!(),
        };
        simulator.add_process(Acceptor::<Policy>::new(
            id,
            Address::Leader,
            learner_addrs.clone(),
            variant,
        ));
    }
    for &addr in &learner_addrs {
        let id = match addr {
            Address::Learner(id) => id,
            _ => unreachable!(),
        };
        simulator.add_process(Learner::<Policy>::new(id, config.members.acceptors, variant));
    }

    simulator.add_process(Leader::<Policy>::new(acceptor_addrs.clone(), variant));

    for i in 0..proposer_count {
        simulator.add_process(Proposer::<Policy>::new(
            ProposerId::from(i),
            acceptor_addrs.clone(),
            variant,
        ));
    }

    let mut ballot_schedule = config.ballots.compile();
    let ballot_events = ballot_schedule.run(0, config.lifetime_micros(), SplitSeed::root(seed).split(0));
    for (when, ()) in ballot_events {
        simulator.schedule_external_at(when, Address::Leader, gpaxos_core::Message::StartBallot);
    }

    // Branches of a `parallel` proposal schedule are round-robined across
    // the launched proposers, so a config that pairs two branches with two
    // proposers (the fast-path conflict scenario) actually originates each
    // branch's policies from a distinct proposer rather than funneling
    // everything through proposer 0.
    let mut proposal_schedule = crate::config::compile_policy_schedule(&config.proposals);
    let proposal_events = proposal_schedule.run(0, config.lifetime_micros(), SplitSeed::root(seed).split(1));
    for (i, (when, policy)) in proposal_events.iter().enumerate() {
        let target = if proposer_count > 0 {
            Address::Proposer(ProposerId::from(i as u64 % proposer_count))
        } else {
            Address::Leader
        };
        simulator.schedule_external_at(*when, target, gpaxos_core::Message::Proposal(policy.clone()));
    }

    if let Some(reproposals) = &config.reproposals {
        let mut schedule = crate::config::compile_policy_schedule(reproposals);
        let events = schedule.run(0, config.lifetime_micros(), SplitSeed::root(seed).split(2));
        for (i, (when, policy)) in events.iter().enumerate() {
            let target = if proposer_count > 0 {
                Address::Proposer(ProposerId::from(i as u64 % proposer_count))
            } else {
                Address::Leader
            };
            simulator.schedule_external_at(*when, target, gpaxos_core::Message::Proposal(policy.clone()));
        }
    }

    Monitor::new(
        simulator,
        config.lifetime_micros(),
        config.members.acceptors,
        config.members.learners,
        variant,
    )
}

fn compile_delay_profile(spec: &DelaySpec) -> DelayProfile<Address> {
    match spec {
        DelaySpec::Constant { constant } => DelayProfile::Constant(*constant),
        DelaySpec::UniformRange { range } => DelayProfile::UniformRange(range.0, range.1),
        DelaySpec::Blackout { blackout } => {
            let mut overrides = std::collections::BTreeMap::new();
            for id in blackout {
                overrides.insert(Address::Acceptor(AcceptorId::new(*id)), DelayProfile::Blackout);
            }
            DelayProfile::PerAddress {
                overrides,
                default: Box::new(DelayProfile::Constant(1)),
            }
        }
        DelaySpec::TemporallyScoped {
            window,
            during,
            otherwise,
        } => DelayProfile::TemporalScope {
            window: *window,
            during: Box::new(compile_delay_profile(during)),
            otherwise: Box::new(compile_delay_profile(otherwise)),
        },
    }
}

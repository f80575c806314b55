//! The YAML topology spec (spec §6). One YAML document describes a full
//! run: variant, member counts, the ballot/proposal/reproposal schedules, an
//! optional delay profile, and the run's lifetime.

use std::cell::RefCell;
use std::rc::Rc;

use gpaxos_cstruct::Policy;
use gpaxos_scheduler::{Schedule, Time};
use guacamole::Guacamole;
use serde::{Deserialize, Serialize};

use crate::error::TopologyError;

///////////////////////////////////////////////// TopologyConfig /////////////////////////////////////

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TopologyConfig {
    #[serde(rename = "type")]
    pub variant: VariantSpec,
    pub members: Members,
    pub ballots: ScheduleSpec<()>,
    pub proposals: ScheduleSpec<PolicyDescriptor>,
    #[serde(default)]
    pub reproposals: Option<ScheduleSpec<PolicyDescriptor>>,
    #[serde(default)]
    pub delays: Option<DelaySpec>,
    pub lifetime: f64,
    /// Fast-variant setting: how long a fast-path failure may go
    /// unreconciled before the leader's classic ballot round must have
    /// picked it up (spec §4.7's `topologyRecoveryDelay`, §4.8's
    /// "variant-specific settings"). Required when `type: fast`.
    #[serde(default)]
    pub recovery_delay: Option<Time>,
}

impl TopologyConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, TopologyError> {
        let config: TopologyConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.members.acceptors == 0 {
            return Err(TopologyError::InvalidConfig(
                "members.acceptors must be at least 1".to_string(),
            ));
        }
        if self.members.learners == 0 {
            return Err(TopologyError::InvalidConfig(
                "members.learners must be at least 1".to_string(),
            ));
        }
        if matches!(self.variant, VariantSpec::Fast) && self.members.acceptors < 4 {
            return Err(TopologyError::InvalidConfig(
                "fast variant needs at least 4 acceptors for a non-trivial 3/4 quorum".to_string(),
            ));
        }
        if self.lifetime <= 0.0 {
            return Err(TopologyError::InvalidConfig(
                "lifetime must be positive".to_string(),
            ));
        }
        if matches!(self.variant, VariantSpec::Fast) && self.recovery_delay.is_none() {
            return Err(TopologyError::InvalidConfig(
                "fast variant requires recovery_delay".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lifetime_micros(&self) -> Time {
        (self.lifetime * gpaxos_scheduler::SECONDS as f64) as Time
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum VariantSpec {
    Classic,
    Fast,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Members {
    pub acceptors: u64,
    pub learners: u64,
}

////////////////////////////////////////////////// ScheduleSpec //////////////////////////////////////

/// The recursive grammar named in spec §6: `once | period | delay | times |
/// repeat | schedule`, plus a bare list for parallel composition. Each
/// struct-shaped variant is mutually exclusive on its field set, so
/// `#[serde(untagged)]` picks the first one whose fields all deserialize.
/// `deny_unknown_fields` is only valid as a container attribute, not a
/// variant attribute, so each struct-shaped variant wraps its own named
/// struct carrying the attribute rather than inlined variant fields.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ScheduleSpec<L> {
    Parallel(Vec<ScheduleSpec<L>>),
    // `Repeat` must be tried before `Period`: both carry a `period` field,
    // and without `deny_unknown_fields` on `Period` an untagged match in
    // the other order would silently deserialize a `{repeat, period,
    // schedule}` map as an unbounded `Period` and drop the repeat count.
    Repeat(RepeatSchedule<L>),
    Period(PeriodSchedule<L>),
    Delay(DelaySchedule<L>),
    Times(TimesSchedule<L>),
    Once(OnceSchedule<L>),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepeatSchedule<L> {
    pub repeat: u64,
    pub period: Time,
    pub schedule: Box<ScheduleSpec<L>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PeriodSchedule<L> {
    pub period: Time,
    pub schedule: Box<ScheduleSpec<L>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DelaySchedule<L> {
    pub delay: Time,
    pub schedule: Box<ScheduleSpec<L>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimesSchedule<L> {
    pub times: u64,
    pub schedule: Box<ScheduleSpec<L>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OnceSchedule<L> {
    pub once: L,
}

impl<L: Clone + 'static> ScheduleSpec<L> {
    pub fn compile(&self) -> Schedule<L> {
        match self {
            ScheduleSpec::Once(OnceSchedule { once }) => {
                let v = once.clone();
                Schedule::generate(move |_| v.clone())
            }
            ScheduleSpec::Parallel(branches) => {
                let mut iter = branches.iter().map(ScheduleSpec::compile);
                let first = iter
                    .next()
                    .unwrap_or_else(|| panic!("a parallel schedule needs at least one branch"));
                iter.fold(first, Schedule::par)
            }
            ScheduleSpec::Period(PeriodSchedule { period, schedule }) => {
                Schedule::periodic(*period, schedule.compile())
            }
            ScheduleSpec::Delay(DelaySchedule { delay, schedule }) => {
                Schedule::delayed(*delay, schedule.compile())
            }
            ScheduleSpec::Times(TimesSchedule { times, schedule }) => {
                Schedule::times(*times, schedule.compile())
            }
            ScheduleSpec::Repeat(RepeatSchedule {
                repeat,
                period,
                schedule,
            }) => Schedule::repeating(*repeat, *period, schedule.compile()),
        }
    }
}

///////////////////////////////////////////////// PolicyDescriptor ///////////////////////////////////

/// A proposal-schedule leaf: `good`, `bad`, `{moody: n}`, or a weighted list
/// of descriptors to choose between.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PolicyDescriptor {
    Weighted(Vec<WeightedPolicy>),
    Moody { moody: u64 },
    Kind(PolicyKind),
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Good,
    Bad,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WeightedPolicy {
    pub weight: f64,
    pub policy: Box<PolicyDescriptor>,
}

impl PolicyDescriptor {
    /// Resolve this descriptor to a concrete, uniquely-named [Policy],
    /// drawing from `guac` wherever a choice (weighted pick) or a unique
    /// name is required.
    pub fn sample(&self, guac: &mut Guacamole, namer: &Rc<RefCell<u64>>) -> Policy {
        match self {
            PolicyDescriptor::Kind(PolicyKind::Good) => Policy::Good(next_name(namer)),
            PolicyDescriptor::Kind(PolicyKind::Bad) => Policy::Bad(next_name(namer)),
            PolicyDescriptor::Moody { moody } => Policy::Moody(*moody, next_name(namer)),
            PolicyDescriptor::Weighted(options) => {
                let total: f64 = options.iter().map(|o| o.weight).sum();
                let mut buf = [0u8; 8];
                guac.generate(&mut buf);
                let roll = (u64::from_le_bytes(buf) as f64 / u64::MAX as f64) * total;
                let mut acc = 0.0;
                for option in options {
                    acc += option.weight;
                    if roll < acc {
                        return option.policy.sample(guac, namer);
                    }
                }
                options
                    .last()
                    .expect("weighted policy list is non-empty")
                    .policy
                    .sample(guac, namer)
            }
        }
    }
}

fn next_name(namer: &Rc<RefCell<u64>>) -> String {
    let mut n = namer.borrow_mut();
    *n += 1;
    format!("p{n}")
}

/// Compile a proposal/reproposal schedule into one that emits sampled
/// [Policy] values rather than bare descriptors.
pub fn compile_policy_schedule(spec: &ScheduleSpec<PolicyDescriptor>) -> Schedule<Policy> {
    let namer = Rc::new(RefCell::new(0u64));
    spec.compile().bind(move |descriptor| {
        let namer = namer.clone();
        Schedule::generate(move |guac| descriptor.sample(guac, &namer))
    })
}

////////////////////////////////////////////////// DelaySpec /////////////////////////////////////////

/// A YAML-serializable mirror of [gpaxos_sim::DelayProfile], specialized to
/// acceptor addresses since that's the only address kind a topology's delay
/// injection targets.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DelaySpec {
    Constant {
        constant: Time,
    },
    UniformRange {
        #[serde(rename = "uniform_range")]
        range: (Time, Time),
    },
    Blackout {
        blackout: Vec<u64>,
    },
    TemporallyScoped {
        window: (Time, Time),
        during: Box<DelaySpec>,
        otherwise: Box<DelaySpec>,
    },
}

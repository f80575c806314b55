//! A deterministic, time-simulated network.
//!
//! Grounded on `rescrv-blue/sim`'s `Process`/`Environment`/`Simulator` shape
//! (a binary-heap event queue driving `watch_dog`/`deliver` handlers), but
//! generalized: messages are typed (`M`) instead of raw bytes — wire
//! serialization is out of this workspace's scope — and a pluggable
//! [DelayProfile] per address replaces the teacher's fixed one-microsecond
//! link delay, per spec §6's transport description.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt::Debug;

use gpaxos_scheduler::{SplitSeed, Time};

///////////////////////////////////////////////// TimerId //////////////////////////////////////////////

pub type TimerId = u64;

////////////////////////////////////////////////// Action ///////////////////////////////////////////////

/// The effects a [Process] may request in response to an event.
pub enum Action<Addr, M> {
    Send { to: Addr, msg: M },
    SetTimer { after: Time },
}

////////////////////////////////////////////////// Process ///////////////////////////////////////////////

/// Blanket-implemented downcasting helper. Letting [Process] require this
/// instead of `std::any::Any` directly keeps the trait-object-safe
/// `as_any` out of every role impl's boilerplate.
pub trait AsAny: std::any::Any {
    fn as_any(&self) -> &dyn std::any::Any;
}

impl<T: std::any::Any> AsAny for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// A role running inside the simulator. Handlers are atomic: the simulator
/// never interleaves two calls into the same process (per spec §5,
/// "the state transition function is therefore an atomic step").
///
/// Bounded by [AsAny] so a monitor can downcast a running process back to
/// its concrete role type for state-snapshot purposes (see
/// [Simulator::process_as]) without the simulator itself needing to know
/// role-specific types.
pub trait Process<Addr, M>: AsAny {
    fn address(&self) -> Addr;
    fn on_init(&mut self) -> Vec<Action<Addr, M>>;
    fn on_timeout(&mut self, timer: TimerId) -> Vec<Action<Addr, M>>;
    fn on_message(&mut self, from: Addr, msg: M) -> Vec<Action<Addr, M>>;
}

//////////////////////////////////////////////// DelayProfile ////////////////////////////////////////////

/// A pluggable description of how long a send from one address to another
/// takes to arrive, or whether it arrives at all.
pub enum DelayProfile<Addr> {
    /// Every send takes exactly this long.
    Constant(Time),
    /// Every send takes a uniformly random time in `[lo, hi)`.
    UniformRange(Time, Time),
    /// No send ever arrives.
    Blackout,
    /// Use `during` while the simulated clock is in `[window.0, window.1)`,
    /// `otherwise` outside it.
    TemporalScope {
        window: (Time, Time),
        during: Box<DelayProfile<Addr>>,
        otherwise: Box<DelayProfile<Addr>>,
    },
    /// Override the delay for specific destination addresses; anything not
    /// listed falls back to `default`.
    PerAddress {
        overrides: BTreeMap<Addr, DelayProfile<Addr>>,
        default: Box<DelayProfile<Addr>>,
    },
}

impl<Addr: Ord + Clone> DelayProfile<Addr> {
    /// Returns `None` if the send should be dropped, or `Some(delay)`
    /// otherwise.
    pub fn delay_for(&self, to: &Addr, now: Time, guac: &mut guacamole::Guacamole) -> Option<Time> {
        match self {
            DelayProfile::Constant(d) => Some(*d),
            DelayProfile::UniformRange(lo, hi) => {
                if lo >= hi {
                    return Some(*lo);
                }
                let span = hi - lo;
                let mut buf = [0u8; 8];
                guac.generate(&mut buf);
                let x = u64::from_le_bytes(buf);
                Some(lo + x % span)
            }
            DelayProfile::Blackout => None,
            DelayProfile::TemporalScope {
                window,
                during,
                otherwise,
            } => {
                if now >= window.0 && now < window.1 {
                    during.delay_for(to, now, guac)
                } else {
                    otherwise.delay_for(to, now, guac)
                }
            }
            DelayProfile::PerAddress { overrides, default } => match overrides.get(to) {
                Some(p) => p.delay_for(to, now, guac),
                None => default.delay_for(to, now, guac),
            },
        }
    }
}

impl<Addr> Default for DelayProfile<Addr> {
    fn default() -> Self {
        DelayProfile::Constant(1)
    }
}

///////////////////////////////////////////////////// Event //////////////////////////////////////////////

enum Event<Addr, M> {
    Timeout { who: Addr, timer: TimerId },
    Deliver { from: Addr, to: Addr, msg: M },
}

struct EventState<Addr, M> {
    when: Time,
    seq: u64,
    what: Event<Addr, M>,
}

impl<Addr, M> PartialEq for EventState<Addr, M> {
    fn eq(&self, other: &Self) -> bool {
        self.when == other.when && self.seq == other.seq
    }
}
impl<Addr, M> Eq for EventState<Addr, M> {}
impl<Addr, M> PartialOrd for EventState<Addr, M> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<Addr, M> Ord for EventState<Addr, M> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.when, self.seq).cmp(&(other.when, other.seq))
    }
}

//////////////////////////////////////////////////// Simulator ////////////////////////////////////////////

/// The cooperative, single-threaded driver described in spec §5: a virtual
/// clock advanced by popping the earliest queued event.
pub struct Simulator<Addr, M> {
    clock: Time,
    next_seq: u64,
    next_timer: TimerId,
    events: BinaryHeap<Reverse<EventState<Addr, M>>>,
    processes: BTreeMap<Addr, Box<dyn Process<Addr, M>>>,
    delay_profile: DelayProfile<Addr>,
    seed: SplitSeed,
}

impl<Addr, M> Simulator<Addr, M>
where
    Addr: Ord + Clone + Debug,
{
    pub fn new(seed: SplitSeed) -> Self {
        Self {
            clock: 0,
            next_seq: 0,
            next_timer: 0,
            events: BinaryHeap::new(),
            processes: BTreeMap::new(),
            delay_profile: DelayProfile::default(),
            seed,
        }
    }

    pub fn clock(&self) -> Time {
        self.clock
    }

    /// Replace the active delay profile. The Monitor's `inject_delays` API
    /// (spec §6) is implemented in terms of this.
    pub fn inject_delays(&mut self, profile: DelayProfile<Addr>) {
        self.delay_profile = profile;
    }

    pub fn add_process<P: Process<Addr, M> + 'static>(&mut self, mut proc: P) {
        let addr = proc.address();
        let actions = proc.on_init();
        self.processes.insert(addr.clone(), Box::new(proc));
        self.integrate(addr, actions);
    }

    fn push(&mut self, when: Time, what: Event<Addr, M>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(EventState { when, seq, what }));
    }

    fn next_timer_id(&mut self) -> TimerId {
        let id = self.next_timer;
        self.next_timer += 1;
        id
    }

    fn integrate(&mut self, from: Addr, actions: Vec<Action<Addr, M>>) {
        for action in actions {
            match action {
                Action::SetTimer { after } => {
                    let timer = self.next_timer_id();
                    self.push(self.clock + after, Event::Timeout { who: from.clone(), timer });
                }
                Action::Send { to, msg } => {
                    let mut guac = self.seed.split(self.next_seq).guacamole();
                    match self.delay_profile.delay_for(&to, self.clock, &mut guac) {
                        Some(delay) => {
                            self.push(self.clock + delay, Event::Deliver { from: from.clone(), to, msg })
                        }
                        None => {
                            tracing::trace!(?to, "send dropped by delay profile");
                        }
                    }
                }
            }
        }
    }

    /// Drain every event whose time is below `horizon`.
    pub fn run_until(&mut self, horizon: Time) {
        while let Some(Reverse(ev)) = self.events.peek() {
            if ev.when >= horizon {
                break;
            }
            let Reverse(ev) = self.events.pop().expect("just peeked");
            self.clock = ev.when;
            match ev.what {
                Event::Timeout { who, timer } => {
                    let actions = match self.processes.get_mut(&who) {
                        Some(p) => p.on_timeout(timer),
                        None => continue,
                    };
                    self.integrate(who, actions);
                }
                Event::Deliver { from, to, msg } => {
                    let actions = match self.processes.get_mut(&to) {
                        Some(p) => p.on_message(from, msg),
                        None => continue,
                    };
                    self.integrate(to, actions);
                }
            }
        }
        self.clock = self.clock.max(horizon);
    }

    /// Drain every queued event regardless of time. Intended for schedules
    /// that are already horizon-bounded before simulation starts.
    pub fn run_to_completion(&mut self) {
        self.run_until(Time::MAX);
    }

    pub fn process(&self, addr: &Addr) -> Option<&dyn Process<Addr, M>> {
        self.processes.get(addr).map(|b| b.as_ref())
    }

    pub fn process_mut(&mut self, addr: &Addr) -> Option<&mut (dyn Process<Addr, M> + 'static)> {
        self.processes.get_mut(addr).map(|b| b.as_mut())
    }

    /// Downcast the process registered at `addr` to its concrete role type.
    /// Used by the topology monitor to read role-specific state (e.g. a
    /// learner's `learned` cstruct) that the address-keyed, type-erased
    /// process map otherwise hides.
    pub fn process_as<P: 'static>(&self, addr: &Addr) -> Option<&P> {
        let process: &dyn Process<Addr, M> = self.processes.get(addr)?.as_ref();
        process.as_any().downcast_ref::<P>()
    }

    /// Inject a message as though it arrived externally (used to drive
    /// proposer schedules into the simulation).
    pub fn deliver_external(&mut self, to: Addr, msg: M) {
        self.push(self.clock, Event::Deliver { from: to.clone(), to, msg });
    }

    /// Schedule an externally-triggered delivery at an absolute simulated
    /// time, rather than "now". Used to materialize a topology's
    /// ballot/proposal schedule as a batch of future deliveries before the
    /// simulation starts running.
    pub fn schedule_external_at(&mut self, at: Time, to: Addr, msg: M) {
        self.push(at, Event::Deliver { from: to.clone(), to, msg });
    }
}

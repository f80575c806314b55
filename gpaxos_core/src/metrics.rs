//! Biometrics counters for the role state machines, in the teacher's
//! dotted-label, static-sensor convention.

use biometrics::Counter;

pub static PROPOSALS_TOTAL: Counter = Counter::new("gpaxos.core.proposals.total");
pub static BALLOTS_STARTED: Counter = Counter::new("gpaxos.core.ballots.started");
pub static QUORUMS_FORMED: Counter = Counter::new("gpaxos.core.quorums.formed");
pub static PROTOCOL_VIOLATIONS: Counter = Counter::new("gpaxos.core.protocol_violations");
pub static FAST_PATH_SUCCESSES: Counter = Counter::new("gpaxos.core.fast_path.successes");
pub static RECOVERIES_INITIATED: Counter = Counter::new("gpaxos.core.fast_path.recoveries_initiated");

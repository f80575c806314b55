//! Reads a YAML topology spec, launches one run of the protocol over the
//! deterministic simulator, and exposes a monitor handle for tests and the
//! CLI (spec §6).

mod config;
mod error;
mod launcher;
mod monitor;

pub use config::{
    DelaySpec, Members, PolicyDescriptor, PolicyKind, ScheduleSpec, TopologyConfig, VariantSpec,
    WeightedPolicy,
};
pub use error::{CoreError, TopologyError};
pub use launcher::launch;
pub use monitor::{AcceptorView, AllStates, LearnerView, Monitor};

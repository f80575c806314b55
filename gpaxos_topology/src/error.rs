//! Topology-level errors: configuration problems are fatal before launch;
//! everything else a run can accumulate is re-exported from
//! [gpaxos_core::CoreError].

use thiserror::Error;

pub use gpaxos_core::CoreError;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse topology YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),
}

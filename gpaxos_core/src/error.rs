//! The error taxonomy: one enum per the classes a run can accumulate or
//! abort on. Protocol violations and contradictive combinations are
//! recoverable — a run logs them and continues; configuration errors are
//! fatal before launch.

use thiserror::Error;

use gpaxos_cstruct::CStructError;

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CoreError {
    #[error("protocol violation: {detail}")]
    ProtocolViolation { detail: String },

    #[error("contradictive combination: {0}")]
    ContradictiveCombination(#[from] CStructError),

    #[error("configuration error: {detail}")]
    Configuration { detail: String },
}

impl CoreError {
    pub fn protocol_violation(detail: impl Into<String>) -> Self {
        CoreError::ProtocolViolation {
            detail: detail.into(),
        }
    }

    pub fn configuration(detail: impl Into<String>) -> Self {
        CoreError::Configuration {
            detail: detail.into(),
        }
    }
}

//! Addresses, wire messages, and the Proposer/Leader/Acceptor/Learner state
//! machines, for both the Classic and Fast variants of the protocol.

mod acceptor;
mod address;
mod error;
mod leader;
mod learner;
mod message;
mod metrics;
mod proposer;
mod variant;

pub use acceptor::Acceptor;
pub use address::Address;
pub use error::CoreError;
pub use leader::Leader;
pub use learner::Learner;
pub use message::Message;
pub use proposer::Proposer;
pub use variant::Variant;

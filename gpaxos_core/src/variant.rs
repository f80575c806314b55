//! Polymorphism over Classic vs Fast is tagged dispatch on this enum (spec
//! §9's "avoid deep inheritance; use tagged dispatch on a `Variant` enum"),
//! rather than a trait object per role.

use gpaxos_scheduler::Time;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Variant {
    Classic,
    /// `recovery_delay` bounds how long a fast-path failure can go
    /// unreconciled before the leader's own periodic ballot picks it up;
    /// there is no separate recovery-trigger message (see DESIGN.md).
    Fast { recovery_delay: Time },
}

impl Variant {
    pub fn is_fast(self) -> bool {
        matches!(self, Variant::Fast { .. })
    }

    pub fn recovery_delay(self) -> Option<Time> {
        match self {
            Variant::Fast { recovery_delay } => Some(recovery_delay),
            Variant::Classic => None,
        }
    }
}

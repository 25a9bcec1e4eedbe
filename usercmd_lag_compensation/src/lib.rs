//! # Usercmd Lag Compensation
//!
//! Decides which players should be rewound when resolving the hits of a command, and keeps the
//! position history needed to rewind them.

extern crate alloc;

pub mod gate;
pub mod history;
pub mod plugin;
pub mod policy;

pub mod prelude {
    pub use crate::gate::{LagCompensationGate, ViewCone};
    pub use crate::history::LagCompensationHistory;
    pub use crate::plugin::{LagCompensation, LagCompensationPlugin};
    pub use crate::policy::{ExclusionPolicy, NoExclusion, SameTeamExclusion};
}

//! Contains a set of shared types: ticks, configuration, diagnostics and the player roster.

extern crate alloc;

pub mod config;
pub mod diagnostics;
pub mod plugin;
pub mod roster;
pub mod tick;
pub mod visibility;

pub mod prelude {
    pub use crate::config::{CommandLimits, ConfigError, SimulationConfig};
    pub use crate::diagnostics::{Anomaly, AnomalyCounts, AnomalyEvent, AnomalySink, CommandField};
    pub use crate::plugin::{CorePlugin, ServerTick, SimulationSet};
    pub use crate::roster::{
        LifeState, MoveState, Observing, PlayerRoster, PlayerSlot, RosterEntry, Team,
    };
    pub use crate::tick::{Tick, TickDuration};
    pub use crate::visibility::TransmitBits;
}

//! # Usercmd Observer
//!
//! Spectator support: the [`ObserverState`](state::ObserverState) machine that picks what a
//! spectating player looks at, and the [`ReplayWindow`](replay::ReplayWindow) that delays it.

extern crate alloc;

pub mod mode;
pub mod plugin;
pub mod policy;
pub mod replay;
pub mod state;

pub mod prelude {
    pub use crate::mode::ObserverMode;
    pub use crate::plugin::{
        ObserverAction, ObserverChanged, ObserverPlugin, ObserverRequest, ObserverRules, ObserverSet,
    };
    pub use crate::policy::{CameraRestriction, DefaultObserverPolicy, ObserverPolicy};
    pub use crate::replay::ReplayWindow;
    pub use crate::state::{ObserverContext, ObserverState};
}

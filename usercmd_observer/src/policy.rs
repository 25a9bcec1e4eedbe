//! Per game mode rules for spectating
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

use crate::mode::ObserverMode;

/// Which players a spectator that belongs to a playing team may watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum CameraRestriction {
    #[default]
    AllowAll,
    /// Only teammates
    AllowTeam,
    /// Nobody: only the modes that need no target are available
    AllowNone,
}

/// Capability object consulted by the [`ObserverState`](crate::state::ObserverState) machine
pub trait ObserverPolicy: Send + Sync + 'static {
    fn camera_restriction(&self) -> CameraRestriction {
        CameraRestriction::AllowAll
    }

    /// Mode imposed when the chosen mode has no valid target
    fn fallback_mode(&self) -> ObserverMode {
        match self.camera_restriction() {
            CameraRestriction::AllowNone => ObserverMode::FixedCamera,
            _ => ObserverMode::Roam,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultObserverPolicy {
    pub restriction: CameraRestriction,
}

impl ObserverPolicy for DefaultObserverPolicy {
    fn camera_restriction(&self) -> CameraRestriction {
        self.restriction
    }
}

use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

/// Viewpoint of a spectating player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum ObserverMode {
    /// Not spectating
    #[default]
    None,
    /// Stationary camera placed in the level
    FixedCamera,
    /// Through the eyes of the target
    FirstPerson,
    /// Third person camera following the target
    Chase,
    /// Fixed camera looking at the target
    PointOfInterest,
    /// Free flying camera
    Roam,
}

impl ObserverMode {
    /// Validate a raw mode sent by a client
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::None),
            1 => Some(Self::FixedCamera),
            2 => Some(Self::FirstPerson),
            3 => Some(Self::Chase),
            4 => Some(Self::PointOfInterest),
            5 => Some(Self::Roam),
            _ => None,
        }
    }

    pub fn index(&self) -> i32 {
        match self {
            Self::None => 0,
            Self::FixedCamera => 1,
            Self::FirstPerson => 2,
            Self::Chase => 3,
            Self::PointOfInterest => 4,
            Self::Roam => 5,
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, Self::Chase | Self::FirstPerson | Self::PointOfInterest)
    }

    /// Mode selected when the player cycles through the camera modes
    pub fn next_in_cycle(&self) -> Self {
        match self {
            Self::FirstPerson => Self::Chase,
            Self::Chase => Self::Roam,
            Self::Roam => Self::FirstPerson,
            Self::None | Self::FixedCamera | Self::PointOfInterest => Self::Chase,
        }
    }
}

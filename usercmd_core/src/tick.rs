//! Module to handle the [`Tick`], the fixed unit of simulated time
use core::ops::{Add, AddAssign, Sub};
use core::time::Duration;

use bevy_derive::{Deref, DerefMut};
use bevy_ecs::resource::Resource;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

/// Signed tick counter, in units of the server's fixed simulation step.
///
/// Unlike a wire sequence number it never wraps: a player's tick base only grows
/// during a connected session.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect,
)]
pub struct Tick(pub i32);

impl Add<u32> for Tick {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0.saturating_add_unsigned(rhs))
    }
}

impl AddAssign<u32> for Tick {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl Sub<u32> for Tick {
    type Output = Self;

    fn sub(self, rhs: u32) -> Self::Output {
        Self(self.0.saturating_sub_unsigned(rhs))
    }
}

/// Number of ticks between `rhs` and `self`
impl Sub for Tick {
    type Output = i32;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

/// Resource that contains the global TickDuration
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Reflect, Deref, DerefMut)]
pub struct TickDuration(pub Duration);

impl Default for TickDuration {
    fn default() -> Self {
        Self(Duration::from_secs_f64(1.0 / 64.0))
    }
}

impl TickDuration {
    /// Convert a duration to a number of ticks, rounding to the nearest tick
    pub fn ticks_in(&self, duration: Duration) -> u32 {
        if self.0.is_zero() {
            return 0;
        }
        (duration.as_secs_f64() / self.0.as_secs_f64() + 0.5) as u32
    }

    pub fn duration_of(&self, ticks: u32) -> Duration {
        self.0 * ticks
    }
}
